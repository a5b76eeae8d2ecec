//! # Scratch buffer
//!
//! The workspace keeps exactly one canvas-sized [`Surface`] for staging "before" pixels, previews,
//! and other temporary data. It is lent out to at most one holder at a time - usually the active
//! tool, for its entire activation. Anyone else wanting it must suspend the tool first.
//!
//! Lending moves the surface out of the arbiter and into a [`ScratchLease`], which must be handed
//! back with [`ScratchArbiter::give_back`]. Misuse (double borrow, returning what was never lent,
//! resizing while lent) is a logic error in the caller and is reported as a [`ScratchError`], never
//! queued or waited on.

use crate::surface::{Pixel, Surface, SurfaceError};
use crate::util::Size;

/// Identity of one allocation of the scratch buffer. A new ID is minted whenever it is reallocated.
pub type ScratchID = crate::PaintID<ScratchLease>;

/// Conspicuous fill for fresh scratch buffers in debug builds, so reading never-captured pixels
/// stands out.
const DEBUG_FILL: Pixel = Pixel::rgba(192, 128, 64, 128);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScratchError {
    #[error("scratch buffer already borrowed for '{held}' (while trying to borrow for '{requested}')")]
    AlreadyBorrowed { held: String, requested: String },
    #[error("scratch buffer was not borrowed")]
    NotBorrowed,
    #[error("returned scratch buffer doesn't match the one lent out")]
    Mismatched,
    #[error("scratch buffer is currently borrowed for '{0}' and cannot be disposed")]
    DisposeWhileBorrowed(String),
    #[error("no scratch buffer exists (no document attached)")]
    Missing,
    #[error(transparent)]
    Allocation(#[from] SurfaceError),
}

/// The lent-out scratch buffer. Hand it back with [`ScratchArbiter::give_back`].
#[must_use = "a lease must be given back to the arbiter"]
pub struct ScratchLease {
    id: ScratchID,
    reason: String,
    surface: Surface,
    returned: bool,
}
impl ScratchLease {
    #[must_use]
    pub fn id(&self) -> ScratchID {
        self.id
    }
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
    #[must_use]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }
    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }
}
impl Drop for ScratchLease {
    fn drop(&mut self) {
        if !self.returned {
            // The buffer is lost with us, and the arbiter will refuse all further borrows.
            log::error!(
                "{} borrowed for '{}' was dropped without being returned",
                self.id,
                self.reason
            );
        }
    }
}

enum Slot {
    /// No document, no buffer.
    Empty,
    Idle(ScratchID, Surface),
    Lent {
        id: ScratchID,
        size: Size,
        reason: String,
    },
}

pub struct ScratchArbiter {
    slot: Slot,
}
impl Default for ScratchArbiter {
    fn default() -> Self {
        Self { slot: Slot::Empty }
    }
}
impl ScratchArbiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Size of the buffer, lent or not. None if there is no buffer.
    #[must_use]
    pub fn size(&self) -> Option<Size> {
        match &self.slot {
            Slot::Empty => None,
            Slot::Idle(_, surface) => Some(surface.size()),
            Slot::Lent { size, .. } => Some(*size),
        }
    }
    #[must_use]
    pub fn is_borrowed(&self) -> bool {
        matches!(self.slot, Slot::Lent { .. })
    }
    /// What the buffer is currently borrowed for, if anything.
    #[must_use]
    pub fn borrow_reason(&self) -> Option<&str> {
        match &self.slot {
            Slot::Lent { reason, .. } => Some(reason),
            _ => None,
        }
    }
    /// Make sure a buffer of exactly `size` exists, (re)allocating if needed.
    pub fn ensure_size(&mut self, size: Size) -> Result<(), ScratchError> {
        match &self.slot {
            Slot::Lent { reason, .. } => {
                return Err(ScratchError::DisposeWhileBorrowed(reason.clone()));
            }
            Slot::Idle(_, surface) if surface.size() == size => return Ok(()),
            _ => (),
        }
        // Drop the old one *before* allocating the new, don't need both at once.
        self.slot = Slot::Empty;
        let fill = if cfg!(debug_assertions) {
            DEBUG_FILL
        } else {
            Pixel::TRANSPARENT
        };
        let surface = Surface::filled(size, fill)?;
        let id = ScratchID::default();
        log::debug!("Allocated {id} at {}x{}", size.width, size.height);
        self.slot = Slot::Idle(id, surface);
        Ok(())
    }
    /// Dispose of the buffer, if any.
    pub fn discard(&mut self) -> Result<(), ScratchError> {
        if let Slot::Lent { reason, .. } = &self.slot {
            return Err(ScratchError::DisposeWhileBorrowed(reason.clone()));
        }
        self.slot = Slot::Empty;
        Ok(())
    }
    /// Lend out the buffer. `reason` is kept for diagnostics while the lease is outstanding.
    pub fn borrow(&mut self, reason: impl Into<String>) -> Result<ScratchLease, ScratchError> {
        let reason = reason.into();
        match std::mem::replace(&mut self.slot, Slot::Empty) {
            Slot::Empty => Err(ScratchError::Missing),
            Slot::Lent {
                id,
                size,
                reason: held,
            } => {
                let err = ScratchError::AlreadyBorrowed {
                    held: held.clone(),
                    requested: reason,
                };
                self.slot = Slot::Lent {
                    id,
                    size,
                    reason: held,
                };
                Err(err)
            }
            Slot::Idle(id, surface) => {
                log::trace!("Borrowing {id}: {reason}");
                self.slot = Slot::Lent {
                    id,
                    size: surface.size(),
                    reason: reason.clone(),
                };
                Ok(ScratchLease {
                    id,
                    reason,
                    surface,
                    returned: false,
                })
            }
        }
    }
    /// Take back a lease. It must be the one most recently lent by this arbiter.
    pub fn give_back(&mut self, mut lease: ScratchLease) -> Result<(), ScratchError> {
        let Slot::Lent { id, .. } = &self.slot else {
            return Err(ScratchError::NotBorrowed);
        };
        if *id != lease.id {
            return Err(ScratchError::Mismatched);
        }
        log::trace!("Returning {}: {}", lease.id, lease.reason);
        lease.returned = true;
        let surface = std::mem::replace(&mut lease.surface, Surface::empty());
        self.slot = Slot::Idle(lease.id, surface);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{ScratchArbiter, ScratchError};
    use crate::util::Size;

    fn arbiter() -> ScratchArbiter {
        let mut arbiter = ScratchArbiter::new();
        arbiter.ensure_size(Size::new(16, 16)).unwrap();
        arbiter
    }
    #[test]
    fn exclusive_borrow() {
        let mut arbiter = arbiter();
        let lease = arbiter.borrow("first").unwrap();
        assert!(arbiter.is_borrowed());
        assert_eq!(arbiter.borrow_reason(), Some("first"));
        assert_eq!(
            arbiter.borrow("second").err(),
            Some(ScratchError::AlreadyBorrowed {
                held: "first".into(),
                requested: "second".into()
            })
        );
        // Failed borrow leaves the first lease intact.
        assert_eq!(arbiter.borrow_reason(), Some("first"));
        arbiter.give_back(lease).unwrap();
        assert!(!arbiter.is_borrowed());
        let lease = arbiter.borrow("third").unwrap();
        assert_eq!(lease.surface().size(), Size::new(16, 16));
        arbiter.give_back(lease).unwrap();
    }
    #[test]
    fn return_without_borrow() {
        let mut other = arbiter();
        let foreign = other.borrow("elsewhere").unwrap();
        let mut arbiter = arbiter();
        assert_eq!(arbiter.give_back(foreign), Err(ScratchError::NotBorrowed));
    }
    #[test]
    fn return_mismatched() {
        let mut other = arbiter();
        let foreign = other.borrow("elsewhere").unwrap();
        let mut arbiter = arbiter();
        let lease = arbiter.borrow("here").unwrap();
        assert_eq!(arbiter.give_back(foreign), Err(ScratchError::Mismatched));
        arbiter.give_back(lease).unwrap();
    }
    #[test]
    fn no_resize_while_borrowed() {
        let mut arbiter = arbiter();
        let lease = arbiter.borrow("tool").unwrap();
        assert!(matches!(
            arbiter.ensure_size(Size::new(32, 32)),
            Err(ScratchError::DisposeWhileBorrowed(_))
        ));
        assert!(matches!(
            arbiter.discard(),
            Err(ScratchError::DisposeWhileBorrowed(_))
        ));
        arbiter.give_back(lease).unwrap();
        arbiter.ensure_size(Size::new(32, 32)).unwrap();
        assert_eq!(arbiter.size(), Some(Size::new(32, 32)));
        arbiter.discard().unwrap();
        assert_eq!(arbiter.size(), None);
        assert_eq!(arbiter.borrow("none").err(), Some(ScratchError::Missing));
    }
    #[test]
    fn reallocation_changes_identity() {
        let mut arbiter = arbiter();
        let first = arbiter.borrow("a").unwrap();
        let first_id = first.id();
        arbiter.give_back(first).unwrap();
        // Same size, kept.
        arbiter.ensure_size(Size::new(16, 16)).unwrap();
        let same = arbiter.borrow("b").unwrap();
        assert_eq!(same.id(), first_id);
        arbiter.give_back(same).unwrap();
        arbiter.ensure_size(Size::new(8, 8)).unwrap();
        let new = arbiter.borrow("c").unwrap();
        assert_ne!(new.id(), first_id);
        arbiter.give_back(new).unwrap();
    }
}

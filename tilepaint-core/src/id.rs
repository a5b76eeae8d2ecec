//! # IDs
//! Documents, layers, scratch buffers, and event subscriptions are all identified by a
//! [`PaintID<T>`], which is unique within this run of the program and namespaced by the marker
//! type `T`.
//!
//! Get a fresh one with `PaintID::default()`. IDs carry no ordering guarantees.

// Next free value per namespace.
static NEXT_IDS: parking_lot::RwLock<
    std::collections::BTreeMap<std::any::TypeId, std::sync::atomic::AtomicU64>,
> = parking_lot::const_rwlock(std::collections::BTreeMap::new());

/// Process-unique ID. Two IDs of different `T` may share a numeric value, but never compare.
pub struct PaintID<T: std::any::Any> {
    id: std::num::NonZeroU64,
    _namespace: std::marker::PhantomData<fn() -> T>,
}
impl<T: std::any::Any> Clone for PaintID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: std::any::Any> Copy for PaintID<T> {}
impl<T: std::any::Any> PartialEq for PaintID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: std::any::Any> Eq for PaintID<T> {}
impl<T: std::any::Any> std::hash::Hash for PaintID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
impl<T: std::any::Any> PaintID<T> {
    /// Raw numeric value. Only meaningful for display and logging.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id.get()
    }
    fn allocate() -> Self {
        let ty = std::any::TypeId::of::<T>();
        let value = {
            let read = NEXT_IDS.upgradable_read();
            if let Some(next) = read.get(&ty) {
                next.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            } else {
                // First ID of this namespace. Rare, take the write lock.
                let mut write = parking_lot::RwLockUpgradableReadGuard::upgrade(read);
                write
                    .entry(ty)
                    .or_insert_with(|| 1.into())
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            }
        };
        let Some(id) = std::num::NonZeroU64::new(value) else {
            // Wrapped around after 2^64 allocations. Nothing sensible to do.
            log::error!("{} ID space exhausted", std::any::type_name::<T>());
            panic!("{} ID space exhausted", std::any::type_name::<T>());
        };
        Self {
            id,
            _namespace: std::marker::PhantomData,
        }
    }
}
impl<T: std::any::Any> Default for PaintID<T> {
    fn default() -> Self {
        Self::allocate()
    }
}
impl<T: std::any::Any> std::fmt::Display for PaintID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // rsplit always yields at least one item.
        let short = std::any::type_name::<T>().rsplit("::").next().unwrap_or("?");
        write!(f, "{short}#{}", self.id)
    }
}
impl<T: std::any::Any> std::fmt::Debug for PaintID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod test {
    use super::PaintID;

    #[test]
    fn unique() {
        struct Namespace;
        let ids: Vec<_> = (0..512).map(|_| PaintID::<Namespace>::default()).collect();
        let mut raw: Vec<_> = ids.iter().map(PaintID::id).collect();
        raw.sort_unstable();
        raw.dedup();
        assert_eq!(raw.len(), ids.len(), "had duplicate ids");
    }
    #[test]
    fn display_uses_short_name() {
        struct Widget;
        let id = PaintID::<Widget>::default();
        assert!(format!("{id}").starts_with("Widget#"));
    }
}

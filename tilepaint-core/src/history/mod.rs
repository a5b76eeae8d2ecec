//! # History
//!
//! Linear undo/redo stacks of [`Memento`]s. Pushing a new memento discards everything that was
//! undone.
//!
//! Stepping is split into [`HistoryStack::begin`] and [`HistoryStack::finish`] so that the caller
//! can observe [`HistoryStack::is_executing`] while the memento is being applied, and avoid
//! recording the side effects of an undo as new history.

mod memento;

pub use memento::{Memento, MementoKind};

use crate::state::LayerID;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("memento recorded for a state that does not match the current state")]
    MismatchedState,
    #[error("layer {0} referenced by the memento is not found")]
    UnknownLayer(LayerID),
    #[error("history step finished without being started")]
    NotExecuting,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::Display)]
pub enum Direction {
    Undo,
    Redo,
}

#[derive(Default, Debug)]
pub struct HistoryStack {
    undo: Vec<Memento>,
    redo: Vec<Memento>,
    executing: Option<Direction>,
    /// Bumped on every push.
    generation: u64,
    /// Oldest entries are discarded beyond this many.
    limit: Option<usize>,
}
impl HistoryStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }
    pub fn push(&mut self, memento: Memento) {
        log::trace!("History push: {:?}", memento.name());
        self.redo.clear();
        self.undo.push(memento);
        self.generation = self.generation.wrapping_add(1);
        if let Some(limit) = self.limit {
            let excess = self.undo.len().saturating_sub(limit);
            self.undo.drain(..excess);
        }
    }
    /// Changes whenever a new memento is pushed. Undo and redo don't count.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
    /// Names of undoable mementos, most recent first.
    pub fn undo_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.undo.iter().rev().map(Memento::name)
    }
    /// Names of redoable mementos, next redo first.
    pub fn redo_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.redo.iter().rev().map(Memento::name)
    }
    /// True between [`Self::begin`] and [`Self::finish`].
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.executing.is_some()
    }
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
    /// Take the next memento to apply in `direction`, or None if there's nothing to do.
    pub fn begin(&mut self, direction: Direction) -> Option<Memento> {
        let memento = match direction {
            Direction::Undo => self.undo.pop(),
            Direction::Redo => self.redo.pop(),
        }?;
        self.executing = Some(direction);
        Some(memento)
    }
    /// Store the inverse produced by applying the memento from [`Self::begin`].
    ///
    /// A failed application loses the memento, as the state it refers to no longer exists.
    pub fn finish(&mut self, applied: Result<Memento, HistoryError>) -> Result<(), HistoryError> {
        let direction = self.executing.take().ok_or(HistoryError::NotExecuting)?;
        let inverse = applied.inspect_err(|err| {
            log::error!("{direction} failed, discarding history entry: {err}");
        })?;
        match direction {
            Direction::Undo => self.redo.push(inverse),
            Direction::Redo => self.undo.push(inverse),
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{Direction, HistoryError, HistoryStack, Memento, MementoKind};
    use crate::state::{Document, LayerProperties};
    use crate::surface::{Pixel, Surface};
    use crate::util::{Rect, Size};

    fn renamed(document: &Document, name: &str) -> Memento {
        let layer = document.layer_at(0).unwrap().id();
        Memento::new(
            name,
            MementoKind::LayerProperties {
                layer,
                properties: LayerProperties::named(name),
            },
        )
    }
    #[test]
    fn push_clears_redo() {
        let mut document = Document::with_layers(Size::new(4, 4), 1).unwrap();
        let mut history = HistoryStack::new();
        history.push(renamed(&document, "a"));
        history.push(renamed(&document, "b"));

        let memento = history.begin(Direction::Undo).unwrap();
        assert!(history.is_executing());
        history.finish(memento.apply(&mut document)).unwrap();
        assert!(!history.is_executing());
        assert_eq!(history.undo_names().collect::<Vec<_>>(), ["a"]);
        assert!(history.can_redo());

        history.push(renamed(&document, "c"));
        assert!(!history.can_redo());
        assert_eq!(history.undo_names().collect::<Vec<_>>(), ["c", "a"]);
    }
    #[test]
    fn limit_drops_oldest() {
        let document = Document::with_layers(Size::new(4, 4), 1).unwrap();
        let mut history = HistoryStack::with_limit(Some(2));
        for name in ["a", "b", "c"] {
            history.push(renamed(&document, name));
        }
        assert_eq!(history.undo_names().collect::<Vec<_>>(), ["c", "b"]);
    }
    #[test]
    fn bitmap_round_trip() {
        let mut document = Document::with_layers(Size::new(8, 8), 1).unwrap();
        let layer = document.layer_at(0).unwrap().id();
        let rect = Rect::new(2, 2, 3, 3);
        let before = document.layer(layer).unwrap().surface().read_patch(rect).unwrap();
        document
            .layer_mut(layer)
            .unwrap()
            .surface_mut()
            .fill_rect(rect, Pixel::BLACK);
        let after = document.layer(layer).unwrap().surface().clone();

        let mut history = HistoryStack::new();
        history.push(Memento::new(
            "Paint",
            MementoKind::Bitmap {
                layer,
                rect,
                patch: before,
            },
        ));
        for (direction, expected) in [
            (Direction::Undo, Pixel::TRANSPARENT),
            (Direction::Redo, Pixel::BLACK),
        ] {
            let memento = history.begin(direction).unwrap();
            history.finish(memento.apply(&mut document)).unwrap();
            assert_eq!(document.layer(layer).unwrap().surface().get(3, 3), Some(expected));
        }
        assert_eq!(document.layer(layer).unwrap().surface(), &after);
    }
    #[test]
    fn compound_reverses() {
        let mut document = Document::with_layers(Size::new(4, 4), 1).unwrap();
        let layer = document.layer_at(0).unwrap().id();
        // Recorded as: rename "Layer 1" -> "x", then "x" -> "y".
        let compound = Memento::new(
            "Renames",
            MementoKind::Compound(Box::new([
                Memento::new(
                    "first",
                    MementoKind::LayerProperties {
                        layer,
                        properties: LayerProperties::named("Layer 1"),
                    },
                ),
                Memento::new(
                    "second",
                    MementoKind::LayerProperties {
                        layer,
                        properties: LayerProperties::named("x"),
                    },
                ),
            ])),
        );
        document.set_layer_name(layer, "y");
        let inverse = compound.apply(&mut document).unwrap();
        assert_eq!(document.layer(layer).unwrap().name(), "Layer 1");
        inverse.apply(&mut document).unwrap();
        assert_eq!(document.layer(layer).unwrap().name(), "y");
    }
    #[test]
    fn mismatched_patch() {
        let mut document = Document::with_layers(Size::new(4, 4), 1).unwrap();
        let layer = document.layer_at(0).unwrap().id();
        let memento = Memento::new(
            "Paint",
            MementoKind::Bitmap {
                layer,
                rect: Rect::new(0, 0, 2, 2),
                patch: Surface::new(Size::new(1, 1)).unwrap(),
            },
        );
        assert_eq!(
            memento.apply(&mut document).err(),
            Some(HistoryError::MismatchedState)
        );
        let mut history = HistoryStack::new();
        assert_eq!(
            history.finish(Err(HistoryError::MismatchedState)),
            Err(HistoryError::NotExecuting)
        );
    }
}

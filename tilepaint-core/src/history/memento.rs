use crate::state::{Document, LayerID, LayerProperties};
use crate::surface::Surface;
use crate::util::Rect;

use super::HistoryError;

#[derive(Debug)]
pub enum MementoKind {
    /// The pixels of `rect` on `layer`, as they were before the change.
    Bitmap {
        layer: LayerID,
        rect: Rect,
        patch: Surface,
    },
    /// Properties of `layer` as they were before the change.
    LayerProperties {
        layer: LayerID,
        properties: LayerProperties,
    },
    /// Many mementos applied as one, as far as the user can tell.
    /// Recorded in the order the changes happened.
    Compound(Box<[Memento]>),
}

/// A unit of undo. Holds the state needed to revert a change, and applying it
/// yields the memento that reverts the revert.
#[derive(Debug)]
pub struct Memento {
    name: String,
    kind: MementoKind,
}
impl Memento {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: MementoKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
    /// User-facing name, for "Undo <name>".
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn kind(&self) -> &MementoKind {
        &self.kind
    }
    /// Put the stored state back into `document`, returning the inverse.
    ///
    /// On error, `document` may have been partially modified if this was a compound memento.
    pub fn apply(self, document: &mut Document) -> Result<Self, HistoryError> {
        let Self { name, kind } = self;
        let kind = match kind {
            MementoKind::Bitmap {
                layer,
                rect,
                mut patch,
            } => {
                let target = document
                    .layer_mut(layer)
                    .ok_or(HistoryError::UnknownLayer(layer))?;
                if !target.surface_mut().swap_patch(rect, &mut patch) {
                    return Err(HistoryError::MismatchedState);
                }
                target.invalidate(rect);
                // Patch now holds what was there before we swapped.
                MementoKind::Bitmap { layer, rect, patch }
            }
            MementoKind::LayerProperties { layer, properties } => {
                let current = document
                    .layer(layer)
                    .ok_or(HistoryError::UnknownLayer(layer))?
                    .properties()
                    .clone();
                document.set_layer_properties(layer, properties);
                MementoKind::LayerProperties {
                    layer,
                    properties: current,
                }
            }
            MementoKind::Compound(children) => {
                // Reverse order, and the inverses collected in that order are themselves
                // in the order needed to reapply them reversed.
                let inverses = children
                    .into_vec()
                    .into_iter()
                    .rev()
                    .map(|child| child.apply(document))
                    .collect::<Result<Box<[_]>, _>>()?;
                MementoKind::Compound(inverses)
            }
        };
        Ok(Self { name, kind })
    }
}

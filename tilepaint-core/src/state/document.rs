//! # Document
//!
//! An ordered stack of equally-sized layers, index 0 at the bottom.
//!
//! Structural changes (insert, remove) and layer property changes are announced to every subscriber
//! over a channel. Pixel edits are not announced; those are tracked with [`Layer::invalidate`].

use super::layer::{self, Layer, LayerProperties, LayerProperty};
use crate::surface::SurfaceError;
use crate::util::{Rect, Size};

pub type ID = crate::PaintID<Document>;
pub type SubscriptionID = crate::PaintID<Subscription>;

/// Metadata key stamped with the editor's name and version whenever a document is attached.
pub const SOFTWARE_KEY: &str = "Software";

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum DocumentEvent {
    LayerInserted {
        index: usize,
        layer: layer::ID,
    },
    /// Sent before removal. `len` is the count of layers *including* the one being removed.
    LayerRemoving {
        index: usize,
        len: usize,
        layer: layer::ID,
    },
    LayerRemoved {
        index: usize,
        layer: layer::ID,
    },
    /// Sent before a property changes, with the properties as they were.
    PropertyChanging {
        layer: layer::ID,
        property: LayerProperty,
        old: LayerProperties,
    },
    PropertyChanged {
        layer: layer::ID,
        property: LayerProperty,
    },
}

/// A live connection to a document's events. Dropping it is equivalent to unsubscribing,
/// though the document only notices on the next event.
pub struct Subscription {
    id: SubscriptionID,
    receiver: crossbeam::channel::Receiver<DocumentEvent>,
}
impl Subscription {
    #[must_use]
    pub fn id(&self) -> SubscriptionID {
        self.id
    }
    /// All events sent since last drained, in order.
    pub fn drain(&self) -> impl Iterator<Item = DocumentEvent> + '_ {
        self.receiver.try_iter()
    }
}

pub struct Document {
    id: ID,
    size: Size,
    layers: Vec<Layer>,
    pub metadata: hashbrown::HashMap<String, String>,
    /// Modified since last save.
    pub dirty: bool,
    subscribers: hashbrown::HashMap<SubscriptionID, crossbeam::channel::Sender<DocumentEvent>>,
}
impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("layers", &self.layers.len())
            .finish_non_exhaustive()
    }
}
impl Document {
    /// An empty document with no layers.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            id: ID::default(),
            size,
            layers: Vec::new(),
            metadata: hashbrown::HashMap::new(),
            dirty: false,
            subscribers: hashbrown::HashMap::new(),
        }
    }
    /// A document with `count` transparent layers named "Layer 1", "Layer 2", ...
    pub fn with_layers(size: Size, count: usize) -> Result<Self, SurfaceError> {
        let mut document = Self::new(size);
        for idx in 0..count {
            document.push_layer(Layer::new(format!("Layer {}", idx + 1), size)?);
        }
        Ok(document)
    }
    #[must_use]
    pub fn id(&self) -> ID {
        self.id
    }
    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size)
    }
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
    #[must_use]
    pub fn index_of(&self, id: layer::ID) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id() == id)
    }
    #[must_use]
    pub fn contains(&self, id: layer::ID) -> bool {
        self.index_of(id).is_some()
    }
    #[must_use]
    pub fn layer(&self, id: layer::ID) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id() == id)
    }
    /// Pixel access to a layer. Property changes must go through the `set_layer_*` methods instead.
    pub fn layer_mut(&mut self, id: layer::ID) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.id() == id)
    }
    #[must_use]
    pub fn layer_at(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }
    pub fn layers_mut(&mut self) -> impl Iterator<Item = &mut Layer> {
        self.layers.iter_mut()
    }

    /// Receive all future events of this document.
    pub fn subscribe(&mut self) -> Subscription {
        let (sender, receiver) = crossbeam::channel::unbounded();
        let id = SubscriptionID::default();
        self.subscribers.insert(id, sender);
        Subscription { id, receiver }
    }
    /// Returns false if there was no such subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionID) -> bool {
        self.subscribers.remove(&id).is_some()
    }
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
    fn emit(&mut self, event: &DocumentEvent) {
        // Prune any whose receiver was dropped.
        self.subscribers
            .retain(|_, sender| sender.send(event.clone()).is_ok());
    }

    /// Append a layer on top. Layers of the wrong size are refused and handed back.
    pub fn push_layer(&mut self, layer: Layer) -> Result<layer::ID, Layer> {
        self.insert_layer(self.layers.len(), layer)
    }
    /// Insert a layer at `index` (clamped to the top). Layers of the wrong size are refused and
    /// handed back.
    pub fn insert_layer(&mut self, index: usize, layer: Layer) -> Result<layer::ID, Layer> {
        if layer.size() != self.size {
            return Err(layer);
        }
        let index = index.min(self.layers.len());
        let id = layer.id();
        self.layers.insert(index, layer);
        self.dirty = true;
        self.emit(&DocumentEvent::LayerInserted { index, layer: id });
        Ok(id)
    }
    pub fn remove_layer(&mut self, index: usize) -> Option<Layer> {
        let id = self.layers.get(index)?.id();
        self.emit(&DocumentEvent::LayerRemoving {
            index,
            len: self.layers.len(),
            layer: id,
        });
        let layer = self.layers.remove(index);
        self.dirty = true;
        self.emit(&DocumentEvent::LayerRemoved { index, layer: id });
        Some(layer)
    }
    /// Change one property, announcing it. Returns false if the layer doesn't exist.
    /// Setting a property to its current value is not a change and is not announced.
    fn set_property(
        &mut self,
        id: layer::ID,
        property: LayerProperty,
        apply: impl FnOnce(&mut LayerProperties),
    ) -> bool {
        let Some(layer) = self.layer(id) else {
            return false;
        };
        let old = layer.properties().clone();
        let mut new = old.clone();
        apply(&mut new);
        if new == old {
            return true;
        }
        self.emit(&DocumentEvent::PropertyChanging {
            layer: id,
            property,
            old,
        });
        if let Some(layer) = self.layer_mut(id) {
            *layer.properties_mut() = new;
            layer.invalidate_all();
        }
        self.dirty = true;
        self.emit(&DocumentEvent::PropertyChanged { layer: id, property });
        true
    }
    pub fn set_layer_visible(&mut self, id: layer::ID, visible: bool) -> bool {
        self.set_property(id, LayerProperty::Visible, |props| props.visible = visible)
    }
    pub fn set_layer_name(&mut self, id: layer::ID, name: impl Into<String>) -> bool {
        let name = name.into();
        self.set_property(id, LayerProperty::Name, |props| props.name = name)
    }
    pub fn set_layer_opacity(&mut self, id: layer::ID, opacity: u8) -> bool {
        self.set_property(id, LayerProperty::Opacity, |props| props.opacity = opacity)
    }
    /// Replace all properties at once, announcing each that differs.
    pub fn set_layer_properties(&mut self, id: layer::ID, properties: LayerProperties) -> bool {
        let LayerProperties {
            name,
            visible,
            opacity,
        } = properties;
        self.set_layer_name(id, name)
            && self.set_layer_visible(id, visible)
            && self.set_layer_opacity(id, opacity)
    }
    /// Mark every layer for a thumbnail refresh and full redraw.
    pub fn invalidate_all(&mut self) {
        for layer in &mut self.layers {
            layer.invalidate_all();
        }
    }
}

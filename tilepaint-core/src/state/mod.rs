//! # State
//!
//! The document model the engine operates on: layers, the layer stack, selection, and view.

pub mod document;
pub mod layer;
pub mod selection;
pub mod view;

pub use document::{Document, DocumentEvent, Subscription, ID as DocumentID, SOFTWARE_KEY};
pub use layer::{Layer, LayerProperties, LayerProperty, ID as LayerID};
pub use selection::Selection;
pub use view::{ViewState, ZoomBasis};

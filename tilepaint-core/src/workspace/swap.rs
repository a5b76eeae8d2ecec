//! Attaching and detaching documents, and keeping the active layer valid as the document changes.

use super::{Workspace, WorkspaceError};
use crate::history::{Memento, MementoKind};
use crate::state::{
    Document, DocumentEvent, Layer, LayerID, LayerProperty, ViewState, ZoomBasis, SOFTWARE_KEY,
};

/// Written to every attached document's metadata.
const EDITOR_IDENTITY: &str = concat!("tilepaint ", env!("CARGO_PKG_VERSION"));

#[derive(thiserror::Error, Debug)]
#[error("document swap failed: {source}")]
pub struct SwapError {
    pub source: WorkspaceError,
    /// The document that ended up unattached: the incoming one if detaching failed, else the
    /// outgoing one.
    pub document: Option<Document>,
}

/// What survives from the outgoing document to the incoming.
struct Snapshot {
    basis: ZoomBasis,
    scale: f64,
    active: Option<LayerID>,
    active_index: Option<usize>,
}

impl Workspace {
    /// Replace the attached document, returning the old one. `None` detaches without attaching
    /// anything.
    ///
    /// The tool is suspended for the duration and comes back against the new document. The active
    /// layer is carried over by position where possible.
    ///
    /// History belongs to the outgoing document and is cleared, so replacing a document can't
    /// itself be undone.
    pub fn set_document(
        &mut self,
        mut incoming: Option<Document>,
    ) -> Result<Option<Document>, SwapError> {
        let snapshot = Snapshot {
            basis: self.view.basis,
            scale: self.view.scale,
            active: self.active_layer,
            active_index: self.active_layer_index(),
        };
        if let Some(document) = incoming.as_mut() {
            document
                .metadata
                .insert(SOFTWARE_KEY.to_owned(), EDITOR_IDENTITY.to_owned());
        }
        if let (Some(document), Some(subscription)) =
            (self.document.as_mut(), self.subscription.take())
        {
            document.unsubscribe(subscription.id());
        }
        self.tool_data.clear();

        if let Err(source) = self.suspend() {
            // Still attached to the outgoing document, so keep listening to it.
            self.subscription = self.document.as_mut().map(Document::subscribe);
            return Err(SwapError {
                source,
                document: incoming,
            });
        }
        let mut guard = self.resume_on_drop();
        guard.active_layer = None;
        let incoming_size = incoming.as_ref().map(Document::size);
        if guard.scratch.size().is_some() && guard.scratch.size() != incoming_size {
            if let Err(err) = guard.scratch.discard() {
                let previous = snapshot
                    .active_index
                    .and_then(|index| guard.document.as_ref()?.layer_at(index).map(Layer::id));
                guard.active_layer = previous;
                drop(guard);
                self.subscription = self.document.as_mut().map(Document::subscribe);
                return Err(SwapError {
                    source: err.into(),
                    document: incoming,
                });
            }
        }
        if !guard.selection.is_empty() {
            guard.selection.reset();
        }

        let outgoing = std::mem::replace(&mut guard.document, incoming);
        guard.history.clear();
        if let Some(outgoing) = &outgoing {
            log::debug!("Detached {}", outgoing.id());
        }

        let attached = guard.attach(&snapshot);
        let resumed = guard.finish();
        self.view.scroll = [0.0; 2];

        match attached.and(resumed) {
            Ok(()) => Ok(outgoing),
            Err(source) => Err(SwapError {
                source,
                document: outgoing,
            }),
        }
    }
    /// Everything needed to work on the newly attached document, short of resuming the tool.
    ///
    /// A failure to allocate the scratch buffer is reported only after the rest is done,
    /// leaving the document attached with no tool able to activate.
    fn attach(&mut self, snapshot: &Snapshot) -> Result<(), WorkspaceError> {
        let Some(document) = self.document.as_mut() else {
            return Ok(());
        };
        log::debug!("Attaching {} ({} layers)", document.id(), document.len());
        let scratch = self.scratch.ensure_size(document.size());
        self.selection.set_clip_rect(document.bounds());
        self.subscription = Some(document.subscribe());

        self.active_layer = snapshot
            .active
            .filter(|&layer| document.contains(layer))
            .or_else(|| {
                snapshot
                    .active_index
                    .and_then(|index| document.layer_at(index))
                    .or_else(|| document.layer_at(0))
                    .map(Layer::id)
            });

        document.invalidate_all();
        self.view = ViewState {
            basis: snapshot.basis,
            scale: match snapshot.basis {
                ZoomBasis::ScaleFactor => snapshot.scale,
                ZoomBasis::FitWindow => ViewState::default().scale,
            },
            ..ViewState::default()
        };
        scratch?;
        Ok(())
    }

    /// React to everything that happened to the attached document since last time.
    pub(super) fn process_document_events(&mut self) -> Result<(), WorkspaceError> {
        let Some(subscription) = &self.subscription else {
            return Ok(());
        };
        let events: Vec<_> = subscription.drain().collect();
        for event in events {
            self.handle_document_event(event)?;
        }
        Ok(())
    }
    fn handle_document_event(&mut self, event: DocumentEvent) -> Result<(), WorkspaceError> {
        log::trace!("{event:?}");
        match event {
            DocumentEvent::LayerInserted { layer, .. } => {
                // Events may lag behind, make sure it's still there.
                if self.document.as_ref().is_some_and(|document| document.contains(layer)) {
                    self.replace_active_layer(Some(layer))?;
                }
            }
            // Reassigned on every removal, whichever layer was active.
            DocumentEvent::LayerRemoving { index, len, .. } => {
                let replacement = self.removal_replacement(index, len);
                self.replace_active_layer(replacement)?;
            }
            DocumentEvent::LayerRemoved { .. } => (),
            DocumentEvent::PropertyChanging {
                layer,
                property,
                old,
            } => {
                if self.records_properties && !self.history.is_executing() {
                    let name = match property {
                        LayerProperty::Name => "Rename Layer",
                        LayerProperty::Visible if old.visible => "Hide Layer",
                        LayerProperty::Visible => "Show Layer",
                        LayerProperty::Opacity => "Layer Opacity",
                    };
                    self.history.push(Memento::new(
                        name,
                        MementoKind::LayerProperties {
                            layer,
                            properties: old,
                        },
                    ));
                }
            }
            DocumentEvent::PropertyChanged {
                layer,
                property: LayerProperty::Visible,
            } => {
                let Some(document) = &self.document else {
                    return Ok(());
                };
                let hidden = document.layer(layer).is_some_and(|layer| !layer.is_visible());
                if hidden
                    && self.active_layer == Some(layer)
                    && document.len() > 1
                    && !self.history.is_executing()
                {
                    if let Some(index) = document.index_of(layer) {
                        self.select_closest_visible(index)?;
                    }
                }
            }
            DocumentEvent::PropertyChanged { .. } => (),
        }
        Ok(())
    }
    /// The layer to activate when the layer at `index` of `len` layers is removed.
    ///
    /// Tries the layer below if the top one was removed, and the layer above otherwise. If that
    /// doesn't exist, the bottom layer. The layer has already been removed by the time this runs,
    /// so positions are mapped onto the remaining layers.
    fn removal_replacement(&self, index: usize, len: usize) -> Option<LayerID> {
        let document = self.document.as_ref()?;
        let candidate = if index + 1 == len {
            index.checked_sub(1)
        } else {
            Some(index + 1)
        };
        candidate
            .filter(|&candidate| candidate < len)
            .map(|candidate| if candidate > index { candidate - 1 } else { candidate })
            .and_then(|remaining| document.layer_at(remaining))
            .or_else(|| document.layer_at(0))
            .map(Layer::id)
    }
    /// Activate the visible layer nearest to `index`, preferring lower layers at equal distance.
    /// Leaves the active layer alone if no layer is visible.
    pub fn select_closest_visible(&mut self, index: usize) -> Result<(), WorkspaceError> {
        let Some(document) = &self.document else {
            return Ok(());
        };
        let len = document.len();
        let found = (0..len)
            .flat_map(|distance| [index.checked_sub(distance), index.checked_add(distance)])
            .flatten()
            .filter(|&candidate| candidate < len)
            .filter_map(|candidate| document.layer_at(candidate))
            .find(|layer| layer.is_visible())
            .map(Layer::id);
        match found {
            Some(layer) => self.replace_active_layer(Some(layer)),
            None => Ok(()),
        }
    }
}

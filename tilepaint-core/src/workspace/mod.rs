//! # Workspace
//!
//! The editing session around one attached [`Document`]. Owns the scratch buffer, the active tool,
//! history, and the active layer, and is the single entry point through which all of them are
//! changed:
//!
//! * Pointer input goes to the active tool, see [`Workspace::pointer_down`] and friends.
//! * Programmatic changes run through [`Workspace::perform_action`] and
//!   [`Workspace::execute_function`], which suspend the tool around them.
//! * Documents are swapped with [`Workspace::set_document`].
//!
//! Invariant: the active layer, if any, is always a member of the attached document.

mod execute;
mod suspend;
mod swap;

pub use execute::{
    Action, ActionError, ActionFlags, ErrorReporter, Function, FunctionResult, Progress,
    ProgressMessage, ProgressUi,
};
pub use suspend::{SuspendError, SuspendGuard};
pub use swap::SwapError;

use crate::config::Settings;
use crate::history::{Direction, HistoryError, HistoryStack};
use crate::scratch::{ScratchArbiter, ScratchError};
use crate::state::{Document, Layer, LayerID, Selection, Subscription, ViewState};
use crate::surface::SurfaceError;
use crate::tools::{ActiveTool, PointerEvent, ToolData, ToolEnv, ToolKind, ToolRegistry};
use crate::util::Size;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error(transparent)]
    Scratch(#[from] ScratchError),
    #[error(transparent)]
    Suspend(#[from] SuspendError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("layer {0} is not in the attached document")]
    LayerNotInDocument(LayerID),
    #[error("a {}x{} layer does not fit the document", .0.width, .0.height)]
    LayerSizeMismatch(Size),
    #[error("no document is attached")]
    NoDocument,
    #[error("out of memory inside a critical region, the document may be left inconsistent")]
    CriticalRegionFailure,
}

pub struct Workspace {
    document: Option<Document>,
    /// Our connection to `document`'s events. Drained after every change we make to it.
    subscription: Option<Subscription>,
    active_layer: Option<LayerID>,
    scratch: ScratchArbiter,
    suspension: suspend::Suspension,
    tool: Option<ActiveTool>,
    registry: ToolRegistry,
    tool_data: ToolData,
    history: HistoryStack,
    /// Off while an action or function runs, whose own memento covers the property changes it
    /// makes.
    records_properties: bool,
    selection: Selection,
    view: ViewState,
    settings: Settings,
}
impl Default for Workspace {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
impl Workspace {
    /// An empty workspace. The settings' default tool activates once a document is attached.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            document: None,
            subscription: None,
            active_layer: None,
            scratch: ScratchArbiter::new(),
            suspension: suspend::Suspension::remembering(settings.default_tool),
            tool: None,
            registry: ToolRegistry::default(),
            tool_data: ToolData::default(),
            history: HistoryStack::with_limit(settings.execution.history_limit),
            records_properties: true,
            selection: Selection::default(),
            view: ViewState::default(),
            settings,
        }
    }
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
    #[must_use]
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }
    /// Direct access for pixel edits. Structural or property changes made through this are picked
    /// up the next time the workspace processes document events.
    pub fn document_mut(&mut self) -> Option<&mut Document> {
        self.document.as_mut()
    }
    #[must_use]
    pub fn active_layer(&self) -> Option<LayerID> {
        self.active_layer
    }
    #[must_use]
    pub fn active_layer_index(&self) -> Option<usize> {
        self.document.as_ref()?.index_of(self.active_layer?)
    }
    /// The tool instance currently receiving input, if any.
    #[must_use]
    pub fn active_tool(&self) -> Option<&ActiveTool> {
        self.tool.as_ref()
    }
    #[must_use]
    pub fn history(&self) -> &HistoryStack {
        &self.history
    }
    #[must_use]
    pub fn scratch(&self) -> &ScratchArbiter {
        &self.scratch
    }
    /// The scratch buffer is free for anyone to borrow while the tool is suspended.
    pub fn scratch_mut(&mut self) -> &mut ScratchArbiter {
        &mut self.scratch
    }
    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.registry
    }
    #[must_use]
    pub fn tool_data(&self) -> &ToolData {
        &self.tool_data
    }
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }
    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }
    #[must_use]
    pub fn view(&self) -> &ViewState {
        &self.view
    }
    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    pub fn set_active_layer(&mut self, layer: LayerID) -> Result<(), WorkspaceError> {
        let document = self.document.as_ref().ok_or(WorkspaceError::NoDocument)?;
        if !document.contains(layer) {
            return Err(WorkspaceError::LayerNotInDocument(layer));
        }
        self.replace_active_layer(Some(layer))
    }
    /// A tool's capture session is tied to one layer, so an active tool is restarted across the
    /// change.
    fn replace_active_layer(&mut self, layer: Option<LayerID>) -> Result<(), WorkspaceError> {
        if self.active_layer == layer {
            return Ok(());
        }
        if self.tool.is_some() {
            let mut guard = self.suspended()?;
            guard.active_layer = layer;
            guard.finish()
        } else {
            self.active_layer = layer;
            Ok(())
        }
    }
    fn document_or_err(&mut self) -> Result<&mut Document, WorkspaceError> {
        self.document.as_mut().ok_or(WorkspaceError::NoDocument)
    }
    /// Insert a layer and make it active.
    pub fn insert_layer(&mut self, index: usize, layer: Layer) -> Result<LayerID, WorkspaceError> {
        let id = self
            .document_or_err()?
            .insert_layer(index, layer)
            .map_err(|layer| WorkspaceError::LayerSizeMismatch(layer.size()))?;
        self.process_document_events()?;
        Ok(id)
    }
    pub fn push_layer(&mut self, layer: Layer) -> Result<LayerID, WorkspaceError> {
        let index = self.document.as_ref().map_or(0, Document::len);
        self.insert_layer(index, layer)
    }
    /// Remove the layer at `index`. The active layer is reassigned relative to the removed
    /// position.
    pub fn remove_layer(&mut self, index: usize) -> Result<Option<Layer>, WorkspaceError> {
        let mut guard = self.suspended()?;
        let removed = guard.document_or_err()?.remove_layer(index);
        guard.process_document_events()?;
        guard.finish()?;
        Ok(removed)
    }
    fn set_layer_property(
        &mut self,
        layer: LayerID,
        set: impl FnOnce(&mut Document) -> bool,
    ) -> Result<(), WorkspaceError> {
        if !set(self.document_or_err()?) {
            return Err(WorkspaceError::LayerNotInDocument(layer));
        }
        self.process_document_events()
    }
    pub fn set_layer_visible(
        &mut self,
        layer: LayerID,
        visible: bool,
    ) -> Result<(), WorkspaceError> {
        self.set_layer_property(layer, |document| document.set_layer_visible(layer, visible))
    }
    pub fn set_layer_name(&mut self, layer: LayerID, name: &str) -> Result<(), WorkspaceError> {
        self.set_layer_property(layer, |document| document.set_layer_name(layer, name))
    }
    pub fn set_layer_opacity(&mut self, layer: LayerID, opacity: u8) -> Result<(), WorkspaceError> {
        self.set_layer_property(layer, |document| document.set_layer_opacity(layer, opacity))
    }

    /// Run `f` on the active tool, if there is one and a layer to draw on.
    fn dispatch(
        &mut self,
        f: impl FnOnce(&mut ActiveTool, ToolEnv<'_>) -> Result<(), SurfaceError>,
    ) -> Result<(), WorkspaceError> {
        let Self {
            document,
            active_layer,
            tool,
            history,
            tool_data,
            selection,
            settings,
            ..
        } = &mut *self;
        let (Some(tool), Some(document), Some(layer)) =
            (tool.as_mut(), document.as_mut(), *active_layer)
        else {
            return Ok(());
        };
        let generation = history.generation();
        let env = ToolEnv {
            layer: document
                .layer_mut(layer)
                .ok_or(WorkspaceError::LayerNotInDocument(layer))?,
            history: &mut *history,
            data: tool_data,
            settings: &settings.tools,
            clip: selection.clip_rect(),
        };
        f(tool, env)?;
        if history.generation() != generation {
            document.dirty = true;
        }
        Ok(())
    }
    pub fn pointer_down(&mut self, event: PointerEvent) -> Result<(), WorkspaceError> {
        self.dispatch(|tool, env| tool.pointer_down(env, event))
    }
    pub fn pointer_move(&mut self, event: PointerEvent) -> Result<(), WorkspaceError> {
        self.dispatch(|tool, env| tool.pointer_move(env, event))
    }
    pub fn pointer_up(&mut self, event: PointerEvent) -> Result<(), WorkspaceError> {
        self.dispatch(|tool, env| tool.pointer_up(env, event))
    }
    pub fn pointer_enter(&mut self) -> Result<(), WorkspaceError> {
        self.dispatch(|tool, env| {
            tool.pointer_enter(env);
            Ok(())
        })
    }
    pub fn pointer_leave(&mut self) -> Result<(), WorkspaceError> {
        self.dispatch(|tool, env| {
            tool.pointer_leave(env);
            Ok(())
        })
    }

    /// Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> Result<bool, WorkspaceError> {
        self.step_history(Direction::Undo)
    }
    /// Returns false if there was nothing to redo.
    pub fn redo(&mut self) -> Result<bool, WorkspaceError> {
        self.step_history(Direction::Redo)
    }
    fn step_history(&mut self, direction: Direction) -> Result<bool, WorkspaceError> {
        // Scratch contents are stale once layers change underneath the tool.
        let mut guard = self.suspended()?;
        let Some(memento) = guard.history.begin(direction) else {
            guard.finish()?;
            return Ok(false);
        };
        log::debug!("{direction} {:?}", memento.name());
        let applied = match guard.document.as_mut() {
            Some(document) => memento.apply(document),
            None => Err(HistoryError::MismatchedState),
        };
        // Still executing, so the property changes just made aren't recorded anew.
        let processed = guard.process_document_events();
        guard.history.finish(applied)?;
        processed?;
        if let Some(document) = guard.document.as_mut() {
            document.dirty = true;
        }
        guard.finish()?;
        Ok(true)
    }
    /// The kind of tool that is, or will be once resumed, active.
    #[must_use]
    pub fn selected_tool(&self) -> Option<ToolKind> {
        self.suspension.remembered()
    }
}

#[cfg(test)]
mod test {
    use super::{Workspace, WorkspaceError};
    use crate::config::Settings;
    use crate::state::{Document, Layer};
    use crate::surface::Pixel;
    use crate::tools::{PointerEvent, ToolKind};
    use crate::util::Size;

    pub(super) fn workspace_with(layers: usize) -> Workspace {
        let mut workspace = Workspace::new(Settings {
            default_tool: Some(ToolKind::Brush),
            ..Default::default()
        });
        let document = Document::with_layers(Size::new(64, 64), layers).unwrap();
        workspace.set_document(Some(document)).unwrap();
        workspace
    }

    #[test]
    fn paint_undo_redo() {
        let mut workspace = workspace_with(1);
        let layer = workspace.active_layer().unwrap();
        workspace.pointer_down(PointerEvent::at(8, 8)).unwrap();
        workspace.pointer_move(PointerEvent::at(40, 8)).unwrap();
        workspace.pointer_up(PointerEvent::at(40, 8)).unwrap();
        let pixel = |workspace: &Workspace| {
            workspace
                .document()
                .unwrap()
                .layer(layer)
                .unwrap()
                .surface()
                .get(24, 8)
        };
        assert_eq!(pixel(&workspace), Some(Pixel::BLACK));
        assert!(workspace.document().unwrap().dirty);

        assert!(workspace.undo().unwrap());
        assert_eq!(pixel(&workspace), Some(Pixel::TRANSPARENT));
        // Tool came back after the undo.
        assert_eq!(workspace.active_tool().map(|tool| tool.kind()), Some(ToolKind::Brush));
        assert!(workspace.redo().unwrap());
        assert_eq!(pixel(&workspace), Some(Pixel::BLACK));
        assert!(!workspace.redo().unwrap());
    }
    #[test]
    fn insertion_activates() {
        let mut workspace = workspace_with(1);
        let layer = Layer::new("New", Size::new(64, 64)).unwrap();
        let id = workspace.insert_layer(0, layer).unwrap();
        assert_eq!(workspace.active_layer(), Some(id));
        assert_eq!(workspace.active_layer_index(), Some(0));

        let wrong = Layer::new("Wrong", Size::new(8, 8)).unwrap();
        assert_eq!(
            workspace.push_layer(wrong),
            Err(WorkspaceError::LayerSizeMismatch(Size::new(8, 8)))
        );
    }
    #[test]
    fn foreign_layer_rejected() {
        let mut workspace = workspace_with(1);
        let other = Document::with_layers(Size::new(64, 64), 1).unwrap();
        let foreign = other.layer_at(0).unwrap().id();
        assert_eq!(
            workspace.set_active_layer(foreign),
            Err(WorkspaceError::LayerNotInDocument(foreign))
        );
        assert_eq!(
            workspace.set_layer_visible(foreign, false),
            Err(WorkspaceError::LayerNotInDocument(foreign))
        );
    }
    #[test]
    fn property_changes_recorded() {
        let mut workspace = workspace_with(1);
        let layer = workspace.active_layer().unwrap();
        workspace.set_layer_name(layer, "Renamed").unwrap();
        workspace.set_layer_opacity(layer, 128).unwrap();
        assert_eq!(
            workspace.history().undo_names().collect::<Vec<_>>(),
            ["Layer Opacity", "Rename Layer"]
        );
        workspace.undo().unwrap();
        workspace.undo().unwrap();
        let document = workspace.document().unwrap();
        assert_eq!(document.layer(layer).unwrap().name(), "Layer 1");
        assert_eq!(document.layer(layer).unwrap().properties().opacity, 255);
        // Undoing didn't record anything new, and both are redoable.
        assert!(!workspace.history().can_undo());
        assert_eq!(workspace.history().redo_len(), 2);
    }
}

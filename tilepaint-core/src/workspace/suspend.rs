//! Tool suspension.
//!
//! Programmatic changes must not race the interactive tool for the layer or the scratch buffer, so
//! the tool is torn down around them and rebuilt afterwards. Suspensions nest: only the outermost
//! suspend deactivates, and only the matching outermost resume reactivates a fresh tool of the same
//! kind.

use super::{Workspace, WorkspaceError};
use crate::scratch::ScratchError;
use crate::tools::{ActiveTool, ToolEnv, ToolKind};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendError {
    #[error("resume without a matching suspend")]
    Unmatched,
}

#[derive(Debug, Default)]
pub(super) struct Suspension {
    depth: usize,
    /// The tool to be active whenever depth is zero.
    remembered: Option<ToolKind>,
}
impl Suspension {
    pub(super) fn remembering(kind: Option<ToolKind>) -> Self {
        Self {
            depth: 0,
            remembered: kind,
        }
    }
    pub(super) fn remembered(&self) -> Option<ToolKind> {
        self.remembered
    }
}

/// Keeps the tool suspended while alive, dereferencing to the workspace so work can be done inside.
///
/// Dropping resumes, logging any failure. Use [`SuspendGuard::finish`] to resume and observe
/// errors.
pub struct SuspendGuard<'w> {
    workspace: &'w mut Workspace,
    /// False for a scope that never suspended, see [`Workspace::scope`].
    owes_resume: bool,
}
impl SuspendGuard<'_> {
    pub fn finish(mut self) -> Result<(), WorkspaceError> {
        if std::mem::take(&mut self.owes_resume) {
            self.workspace.resume()
        } else {
            Ok(())
        }
    }
}
impl std::ops::Deref for SuspendGuard<'_> {
    type Target = Workspace;
    fn deref(&self) -> &Self::Target {
        self.workspace
    }
}
impl std::ops::DerefMut for SuspendGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.workspace
    }
}
impl Drop for SuspendGuard<'_> {
    fn drop(&mut self) {
        if self.owes_resume {
            if let Err(err) = self.workspace.resume() {
                log::error!("Failed to resume tool after suspended scope: {err}");
            }
        }
    }
}

impl Workspace {
    #[must_use]
    pub fn suspension_depth(&self) -> usize {
        self.suspension.depth
    }
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspension.depth > 0
    }
    /// Deactivate the tool, if this is the outermost suspension. Must be paired with
    /// [`Self::resume`].
    pub fn suspend(&mut self) -> Result<(), WorkspaceError> {
        if self.suspension.depth == 0 {
            if let Some(tool) = &self.tool {
                self.suspension.remembered = Some(tool.kind());
            }
            self.deactivate_tool()?;
            log::trace!("Suspended {:?}", self.suspension.remembered);
        }
        self.suspension.depth += 1;
        Ok(())
    }
    /// Undo one [`Self::suspend`]. The outermost resume activates a new tool of the remembered
    /// kind.
    pub fn resume(&mut self) -> Result<(), WorkspaceError> {
        self.suspension.depth = self
            .suspension
            .depth
            .checked_sub(1)
            .ok_or(SuspendError::Unmatched)?;
        if self.suspension.depth == 0 {
            self.activate_tool()?;
        }
        Ok(())
    }
    /// Suspend until the returned guard is dropped or finished.
    pub fn suspended(&mut self) -> Result<SuspendGuard<'_>, WorkspaceError> {
        self.scope(true)
    }
    /// A guard that suspends only if `suspend` is set, for callers that decide at runtime.
    pub(super) fn scope(&mut self, suspend: bool) -> Result<SuspendGuard<'_>, WorkspaceError> {
        if suspend {
            self.suspend()?;
            Ok(self.resume_on_drop())
        } else {
            Ok(SuspendGuard {
                workspace: self,
                owes_resume: false,
            })
        }
    }
    /// Guard for a [`Self::suspend`] the caller has already made, for callers that must act on its
    /// failure with the workspace still borrowable.
    pub(super) fn resume_on_drop(&mut self) -> SuspendGuard<'_> {
        SuspendGuard {
            workspace: self,
            owes_resume: true,
        }
    }
    /// Choose the tool receiving input, or None for no tool.
    ///
    /// While suspended, this only changes which tool will be activated on resume.
    pub fn set_tool(&mut self, kind: Option<ToolKind>) -> Result<(), WorkspaceError> {
        self.suspension.remembered = kind;
        if self.is_suspended() {
            return Ok(());
        }
        if self.tool.as_ref().map(ActiveTool::kind) == kind {
            return Ok(());
        }
        self.deactivate_tool()?;
        self.activate_tool()
    }
    fn activate_tool(&mut self) -> Result<(), WorkspaceError> {
        if self.tool.is_some() {
            return Ok(());
        }
        let Some(kind) = self.suspension.remembered else {
            return Ok(());
        };
        let Some(behavior) = self.registry.create(kind) else {
            log::warn!("No tool registered for {kind}");
            return Ok(());
        };
        let lease = match self.scratch.borrow(format!("{kind}: activate")) {
            Ok(lease) => lease,
            Err(ScratchError::Missing) => {
                log::debug!("No scratch buffer, {kind} activates once a document is attached");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        self.tool = Some(ActiveTool::new(behavior, lease));
        Ok(())
    }
    /// Tear down the tool, committing its gesture in progress and returning its lease.
    fn deactivate_tool(&mut self) -> Result<(), WorkspaceError> {
        let Some(tool) = self.tool.take() else {
            return Ok(());
        };
        let kind = tool.kind();
        let Self {
            document,
            active_layer,
            history,
            tool_data,
            selection,
            settings,
            ..
        } = &mut *self;
        let generation = history.generation();
        let env = match (document.as_mut(), *active_layer) {
            (Some(document), Some(layer)) => document.layer_mut(layer).map(|layer| ToolEnv {
                layer,
                history: &mut *history,
                data: tool_data,
                settings: &settings.tools,
                clip: selection.clip_rect(),
            }),
            _ => None,
        };
        let (lease, committed) = tool.deactivate(env);
        if history.generation() != generation {
            if let Some(document) = document.as_mut() {
                document.dirty = true;
            }
        }
        self.scratch.give_back(lease)?;
        if let Err(err) = committed {
            // The pixels stay as drawn, only undo is lost.
            log::warn!("Failed to record {kind} history: {err}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::SuspendError;
    use crate::tools::{PointerEvent, ToolKind};
    use crate::workspace::test::workspace_with;
    use crate::workspace::{Workspace, WorkspaceError};

    #[test]
    fn nesting_restores_same_tool() {
        let mut workspace = workspace_with(1);
        assert_eq!(workspace.active_tool().map(|t| t.kind()), Some(ToolKind::Brush));
        for depth in 1..=3 {
            workspace.suspend().unwrap();
            assert_eq!(workspace.suspension_depth(), depth);
            assert!(workspace.active_tool().is_none());
            assert!(!workspace.scratch().is_borrowed());
        }
        for depth in (0..3).rev() {
            workspace.resume().unwrap();
            assert_eq!(workspace.suspension_depth(), depth);
            // Only the outermost resume brings the tool back.
            assert_eq!(workspace.active_tool().is_some(), depth == 0);
        }
        assert_eq!(workspace.active_tool().map(|t| t.kind()), Some(ToolKind::Brush));
        assert_eq!(workspace.scratch().borrow_reason(), Some("Brush: activate"));
        assert_eq!(
            workspace.resume(),
            Err(WorkspaceError::Suspend(SuspendError::Unmatched))
        );
    }
    #[test]
    fn guard_resumes_on_drop() {
        let mut workspace = workspace_with(1);
        {
            let mut guard = workspace.suspended().unwrap();
            assert!(guard.active_tool().is_none());
            // Scratch buffer is free for others while suspended.
            let lease = guard.scratch_mut().borrow("preview").unwrap();
            guard.scratch_mut().give_back(lease).unwrap();
        }
        assert!(!workspace.is_suspended());
        assert!(workspace.active_tool().is_some());
    }
    #[test]
    fn set_tool_while_suspended_is_deferred() {
        let mut workspace = workspace_with(1);
        workspace.suspend().unwrap();
        workspace.set_tool(Some(ToolKind::Rectangle)).unwrap();
        assert!(workspace.active_tool().is_none());
        assert_eq!(workspace.selected_tool(), Some(ToolKind::Rectangle));
        workspace.resume().unwrap();
        assert_eq!(
            workspace.active_tool().map(|t| t.kind()),
            Some(ToolKind::Rectangle)
        );

        workspace.set_tool(None).unwrap();
        assert!(workspace.active_tool().is_none());
        assert!(!workspace.scratch().is_borrowed());
        workspace.suspend().unwrap();
        workspace.resume().unwrap();
        assert!(workspace.active_tool().is_none());
    }
    #[test]
    fn suspending_commits_gesture() {
        let mut workspace = workspace_with(1);
        workspace.pointer_down(PointerEvent::at(5, 5)).unwrap();
        assert!(!workspace.history().can_undo());
        workspace.suspend().unwrap();
        assert_eq!(workspace.history().undo_names().collect::<Vec<_>>(), ["Brush"]);
        workspace.resume().unwrap();
        // Fresh instance, not pressed.
        assert!(!workspace.active_tool().unwrap().is_pressed());
    }
    #[test]
    fn no_document_defers_activation() {
        let mut workspace = Workspace::default();
        workspace.set_tool(Some(ToolKind::Eraser)).unwrap();
        assert!(workspace.active_tool().is_none());
        let document =
            crate::state::Document::with_layers(crate::util::Size::new(8, 8), 1).unwrap();
        workspace.set_document(Some(document)).unwrap();
        assert_eq!(workspace.active_tool().map(|t| t.kind()), Some(ToolKind::Eraser));
    }
}

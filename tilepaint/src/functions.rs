//! Programmatic edits offered by the editor.

use rayon::prelude::*;
use tilepaint_core::history::{Memento, MementoKind};
use tilepaint_core::state::Layer;
use tilepaint_core::surface::Pixel;
use tilepaint_core::workspace::{
    Action, ActionError, ActionFlags, Function, Progress, Workspace, WorkspaceError,
};

/// Invert the color channels of the active layer, leaving alpha. Rows are processed in parallel,
/// and the whole thing can be cancelled until the result is committed.
pub struct Invert;

impl Function for Invert {
    fn name(&self) -> &str {
        "Invert Colors"
    }
    fn flags(&self) -> ActionFlags {
        ActionFlags::REPORTS_PROGRESS | ActionFlags::CANCELLABLE
    }
    fn execute(
        &mut self,
        workspace: &mut Workspace,
        progress: &Progress,
    ) -> Result<Option<Memento>, ActionError> {
        let Some(layer_id) = workspace.active_layer() else {
            return Ok(None);
        };
        let layer = workspace
            .document_mut()
            .and_then(|document| document.layer_mut(layer_id))
            .ok_or(WorkspaceError::LayerNotInDocument(layer_id))?;
        let rect = layer.bounds();
        // Work on a copy, the layer stays untouched if cancelled.
        let mut inverted = layer.surface().read_patch(rect)?;
        let width = inverted.size().width as usize;
        let rows = inverted.size().height as usize;
        if width == 0 || rows == 0 {
            return Ok(None);
        }

        let done = std::sync::atomic::AtomicUsize::new(0);
        let finished = inverted.pixels_mut().par_chunks_mut(width).try_for_each(|row| {
            if progress.should_cancel() {
                return Err(());
            }
            for Pixel { r, g, b, .. } in row {
                *r = !*r;
                *g = !*g;
                *b = !*b;
            }
            let done = done.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
            // Report every percent or so, not every row.
            if done % (rows / 100).max(1) == 0 {
                progress.report(done as f64 * 100.0 / rows as f64);
            }
            Ok(())
        });
        if finished.is_err() || progress.should_cancel() {
            log::debug!("Invert cancelled");
            return Ok(None);
        }

        progress.enter_critical_region();
        // Swapping leaves the old pixels in `inverted`, ready to be the undo patch.
        if !layer.surface_mut().swap_patch(rect, &mut inverted) {
            return Err(ActionError::message("Layer changed size during invert"));
        }
        layer.invalidate(rect);
        Ok(Some(Memento::new(
            "Invert Colors",
            MementoKind::Bitmap {
                layer: layer_id,
                rect,
                patch: inverted,
            },
        )))
    }
}

/// Add a blank layer on top and make it active. Layer insertion isn't undoable, so this records no
/// history.
pub struct NewLayer {
    pub name: Option<String>,
}

impl Action for NewLayer {
    fn name(&self) -> &str {
        "New Layer"
    }
    fn perform(&mut self, workspace: &mut Workspace) -> Result<Option<Memento>, ActionError> {
        let document = workspace.document().ok_or(WorkspaceError::NoDocument)?;
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| format!("Layer {}", document.len() + 1));
        let layer = Layer::new(name, document.size())?;
        workspace.push_layer(layer)?;
        Ok(None)
    }
}

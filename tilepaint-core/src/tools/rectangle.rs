use super::{PointerEvent, Tool, ToolContext, ToolKind};
use crate::surface::SurfaceError;
use crate::util::{Rect, Region};

/// Drag out a filled rectangle. While dragging, the previous preview is erased by restoring
/// the saved region before the next one is drawn.
#[derive(Default)]
pub struct Rectangle {
    anchor: Option<(i32, i32)>,
}
impl Rectangle {
    fn preview(&self, ctx: &mut ToolContext<'_>, corner: (i32, i32)) {
        let Some(anchor) = self.anchor else {
            return;
        };
        ctx.restore_saved();
        let rect = Rect::spanning(anchor, corner).intersect(&ctx.clip());
        let region = Region::from_rect(rect);
        ctx.capture(Some(&region), rect);
        let pixel = ctx.settings().pixel();
        ctx.fill(rect, pixel);
    }
}
impl Tool for Rectangle {
    fn kind(&self) -> ToolKind {
        ToolKind::Rectangle
    }
    fn on_pointer_down(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: PointerEvent,
    ) -> Result<(), SurfaceError> {
        self.anchor = Some(event.position());
        self.preview(ctx, event.position());
        Ok(())
    }
    fn on_pointer_move(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: PointerEvent,
        pressed: bool,
    ) -> Result<(), SurfaceError> {
        if pressed {
            self.preview(ctx, event.position());
        }
        Ok(())
    }
    fn on_pointer_up(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: PointerEvent,
    ) -> Result<(), SurfaceError> {
        self.preview(ctx, event.position());
        self.anchor = None;
        ctx.commit("Rectangle")
    }
    fn on_interrupted(&mut self, _ctx: &mut ToolContext<'_>) {
        // Keep the last preview as drawn.
        self.anchor = None;
    }
}

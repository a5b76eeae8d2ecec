use super::{PointerEvent, Tool, ToolContext, ToolKind};
use crate::surface::{Pixel, SurfaceError};
use crate::util::Rect;

/// Where the last stroke of a brush ended. Shift-clicking continues from here with a straight line.
#[derive(Default)]
struct StrokeEnd(Option<(i32, i32)>);

/// Square-dab painting. The eraser is the same tool, painting transparency.
pub struct Brush {
    erase: bool,
    last: Option<(i32, i32)>,
}
impl Brush {
    #[must_use]
    pub fn paint() -> Self {
        Self {
            erase: false,
            last: None,
        }
    }
    #[must_use]
    pub fn eraser() -> Self {
        Self {
            erase: true,
            last: None,
        }
    }
    fn pixel(&self, ctx: &ToolContext<'_>) -> Pixel {
        if self.erase {
            Pixel::TRANSPARENT
        } else {
            ctx.settings().pixel()
        }
    }
    fn dab(&self, ctx: &mut ToolContext<'_>, (x, y): (i32, i32)) {
        let rect = Rect::around(x, y, ctx.settings().brush_radius).intersect(&ctx.clip());
        if rect.is_empty() {
            return;
        }
        ctx.capture(None, rect);
        let pixel = self.pixel(ctx);
        ctx.fill(rect, pixel);
    }
    /// Dabs at every pixel step from `from` to `to`, inclusive.
    fn line(&self, ctx: &mut ToolContext<'_>, from: (i32, i32), to: (i32, i32)) {
        let dx = i64::from(to.0) - i64::from(from.0);
        let dy = i64::from(to.1) - i64::from(from.1);
        let steps = dx.abs().max(dy.abs());
        if steps == 0 {
            self.dab(ctx, to);
            return;
        }
        for step in 0..=steps {
            // Rounded lerp, stays within the i32 endpoints.
            let x = i64::from(from.0) + (dx * step + steps / 2).div_euclid(steps);
            let y = i64::from(from.1) + (dy * step + steps / 2).div_euclid(steps);
            self.dab(ctx, (x as i32, y as i32));
        }
    }
    fn end_stroke(&mut self, ctx: &mut ToolContext<'_>, at: (i32, i32)) {
        self.last = None;
        ctx.data::<StrokeEnd>().0 = Some(at);
    }
}
impl Tool for Brush {
    fn kind(&self) -> ToolKind {
        if self.erase {
            ToolKind::Eraser
        } else {
            ToolKind::Brush
        }
    }
    fn on_pointer_down(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: PointerEvent,
    ) -> Result<(), SurfaceError> {
        let here = event.position();
        match ctx.data::<StrokeEnd>().0 {
            Some(end) if event.shift => self.line(ctx, end, here),
            _ => self.dab(ctx, here),
        }
        self.last = Some(here);
        Ok(())
    }
    fn on_pointer_move(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: PointerEvent,
        pressed: bool,
    ) -> Result<(), SurfaceError> {
        if !pressed {
            return Ok(());
        }
        let here = event.position();
        if let Some(last) = self.last {
            self.line(ctx, last, here);
        }
        self.last = Some(here);
        Ok(())
    }
    fn on_pointer_up(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: PointerEvent,
    ) -> Result<(), SurfaceError> {
        self.end_stroke(ctx, event.position());
        ctx.commit(&self.kind().to_string())
    }
    fn on_interrupted(&mut self, ctx: &mut ToolContext<'_>) {
        if let Some(last) = self.last {
            self.end_stroke(ctx, last);
        }
    }
}

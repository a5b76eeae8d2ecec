//! # Tools
//!
//! Interactive tools turn pointer input into pixel edits on the active layer.
//!
//! A tool is split in two: the [`Tool`] behavior, which is what differs between a brush and a
//! rectangle, and the [`ActiveTool`] host, which owns everything every tool needs while active. The
//! host holds the scratch buffer lease for the entire activation, the [`UndoCapture`] state backing
//! it, and the pointer press/enter bookkeeping. Behaviors reach all of that through a
//! [`ToolContext`].

mod brush;
mod rectangle;

pub use brush::Brush;
pub use rectangle::Rectangle;

use crate::capture::{Backup, UndoCapture};
use crate::history::{HistoryStack, Memento, MementoKind};
use crate::scratch::ScratchLease;
use crate::state::{Layer, LayerID};
use crate::surface::{Pixel, Surface, SurfaceError};
use crate::util::{Rect, Region};

#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum ToolKind {
    Brush,
    Eraser,
    Rectangle,
}

/// Settings shared by every tool, as chosen in the toolbar.
#[derive(Copy, Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Half-width of a brush dab, in pixels.
    pub brush_radius: u32,
    pub color: [u8; 4],
}
impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            brush_radius: 2,
            color: [0, 0, 0, 255],
        }
    }
}
impl ToolSettings {
    #[must_use]
    pub fn pixel(&self) -> Pixel {
        let [r, g, b, a] = self.color;
        Pixel::rgba(r, g, b, a)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PointerEvent {
    pub x: i32,
    pub y: i32,
    pub shift: bool,
}
impl PointerEvent {
    #[must_use]
    pub fn at(x: i32, y: i32) -> Self {
        Self { x, y, shift: false }
    }
    #[must_use]
    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

/// Per-tool cached data that outlives tool instances, keyed by kind.
/// Tools are recreated on every suspend/resume, this is where they keep what should survive that.
#[derive(Default)]
pub struct ToolData {
    entries: hashbrown::HashMap<ToolKind, Box<dyn std::any::Any + Send>>,
}
impl ToolData {
    #[must_use]
    pub fn get<T: std::any::Any>(&self, kind: ToolKind) -> Option<&T> {
        self.entries.get(&kind)?.downcast_ref()
    }
    /// Get the entry for `kind`, replacing it with a default if absent or of another type.
    pub fn get_or_default<T: std::any::Any + Send + Default>(&mut self, kind: ToolKind) -> &mut T {
        let entry = self
            .entries
            .entry(kind)
            .or_insert_with(|| Box::new(T::default()));
        if !entry.is::<T>() {
            *entry = Box::new(T::default());
        }
        // Just ensured the type.
        entry.downcast_mut().unwrap_or_else(|| unreachable!())
    }
    pub fn clear(&mut self) {
        self.entries.clear();
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tool behavior. Handlers are called only while a layer is active.
pub trait Tool: Send {
    fn kind(&self) -> ToolKind;
    fn on_pointer_down(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: PointerEvent,
    ) -> Result<(), SurfaceError>;
    /// `pressed` is whether any button is currently held.
    fn on_pointer_move(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: PointerEvent,
        pressed: bool,
    ) -> Result<(), SurfaceError>;
    fn on_pointer_up(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: PointerEvent,
    ) -> Result<(), SurfaceError>;
    fn on_enter(&mut self, _ctx: &mut ToolContext<'_>) {}
    fn on_leave(&mut self, _ctx: &mut ToolContext<'_>) {}
    /// The tool is being deactivated mid-gesture. Any uncommitted change is committed by the host
    /// afterwards.
    fn on_interrupted(&mut self, _ctx: &mut ToolContext<'_>) {}
}

pub type ToolFactory = fn() -> Box<dyn Tool>;

/// Constructs tool behaviors by kind.
pub struct ToolRegistry {
    factories: hashbrown::HashMap<ToolKind, ToolFactory>,
}
impl Default for ToolRegistry {
    fn default() -> Self {
        let mut registry = Self {
            factories: hashbrown::HashMap::new(),
        };
        registry.register(ToolKind::Brush, || Box::new(Brush::paint()));
        registry.register(ToolKind::Eraser, || Box::new(Brush::eraser()));
        registry.register(ToolKind::Rectangle, || Box::new(Rectangle::default()));
        registry
    }
}
impl ToolRegistry {
    /// Replace the factory for `kind`, returning the old one.
    pub fn register(&mut self, kind: ToolKind, factory: ToolFactory) -> Option<ToolFactory> {
        self.factories.insert(kind, factory)
    }
    #[must_use]
    pub fn create(&self, kind: ToolKind) -> Option<Box<dyn Tool>> {
        self.factories.get(&kind).map(|factory| factory())
    }
}

/// Everything a tool touches outside of the host itself.
pub struct ToolEnv<'a> {
    pub layer: &'a mut Layer,
    pub history: &'a mut HistoryStack,
    pub data: &'a mut ToolData,
    pub settings: &'a ToolSettings,
    /// Edits are confined to this rect.
    pub clip: Rect,
}

pub struct ToolContext<'a> {
    kind: ToolKind,
    layer: &'a mut Layer,
    scratch: &'a mut Surface,
    capture: &'a mut UndoCapture,
    /// Bounds of everything changed since the last commit.
    dirty: &'a mut Rect,
    history: &'a mut HistoryStack,
    data: &'a mut ToolData,
    settings: &'a ToolSettings,
    clip: Rect,
}
impl ToolContext<'_> {
    #[must_use]
    pub fn layer_id(&self) -> LayerID {
        self.layer.id()
    }
    #[must_use]
    pub fn settings(&self) -> &ToolSettings {
        self.settings
    }
    #[must_use]
    pub fn clip(&self) -> Rect {
        self.clip.intersect(&self.layer.bounds())
    }
    /// This tool's cached data.
    pub fn data<T: std::any::Any + Send + Default>(&mut self) -> &mut T {
        self.data.get_or_default(self.kind)
    }
    /// Back up the area about to be changed. See [`UndoCapture::capture`].
    pub fn capture(&mut self, region: Option<&Region>, bounds: Rect) -> Backup {
        self.capture
            .capture(self.layer.surface(), self.scratch, region, bounds)
    }
    /// Undo the pixel changes within the saved region. See [`UndoCapture::restore_saved`].
    pub fn restore_saved(&mut self) -> bool {
        self.capture.restore_saved(self.layer, self.scratch)
    }
    /// Fill a rect of the layer, which must have been captured first. Returns the rect actually
    /// filled.
    pub fn fill(&mut self, rect: Rect, pixel: Pixel) -> Rect {
        let rect = rect.intersect(&self.clip());
        if rect.is_empty() {
            return rect;
        }
        self.layer.surface_mut().fill_rect(rect, pixel);
        self.layer.invalidate(rect);
        *self.dirty = self.dirty.union(&rect);
        rect
    }
    /// Record everything changed since the last commit as one history entry, and begin a new
    /// capture session.
    ///
    /// Nothing is recorded if nothing changed.
    pub fn commit(&mut self, name: &str) -> Result<(), SurfaceError> {
        let rect = std::mem::replace(self.dirty, Rect::EMPTY);
        if !rect.is_empty() {
            // The dirty bounds may span tiles never touched, and thus never backed up. Those are
            // still pristine, so back them up now to complete the patch.
            self.capture
                .capture(self.layer.surface(), self.scratch, None, rect);
            let patch = self.scratch.read_patch(rect)?;
            self.history.push(Memento::new(
                name,
                MementoKind::Bitmap {
                    layer: self.layer.id(),
                    rect,
                    patch,
                },
            ));
        }
        self.capture.reset();
        Ok(())
    }
    #[must_use]
    pub fn has_uncommitted(&self) -> bool {
        !self.dirty.is_empty()
    }
}

/// A tool instance, alive from activation to deactivation.
pub struct ActiveTool {
    behavior: Box<dyn Tool>,
    lease: ScratchLease,
    capture: UndoCapture,
    dirty: Rect,
    /// Buttons currently held.
    press_depth: u32,
    /// Nested pointer-enter count.
    enter_depth: u32,
}
impl ActiveTool {
    /// Become active, holding `lease` until deactivated. Capture state starts out empty.
    #[must_use]
    pub fn new(behavior: Box<dyn Tool>, lease: ScratchLease) -> Self {
        log::debug!("Activated {} with {}", behavior.kind(), lease.id());
        Self {
            behavior,
            lease,
            capture: UndoCapture::new(),
            dirty: Rect::EMPTY,
            press_depth: 0,
            enter_depth: 0,
        }
    }
    #[must_use]
    pub fn kind(&self) -> ToolKind {
        self.behavior.kind()
    }
    #[must_use]
    pub fn is_pressed(&self) -> bool {
        self.press_depth > 0
    }
    #[must_use]
    pub fn is_inside(&self) -> bool {
        self.enter_depth > 0
    }
    #[must_use]
    pub fn capture(&self) -> &UndoCapture {
        &self.capture
    }
    fn context<'a>(
        &'a mut self,
        env: ToolEnv<'a>,
    ) -> (&'a mut (dyn Tool + 'static), ToolContext<'a>) {
        let Self {
            behavior,
            lease,
            capture,
            dirty,
            ..
        } = self;
        let ctx = ToolContext {
            kind: behavior.kind(),
            layer: env.layer,
            scratch: lease.surface_mut(),
            capture,
            dirty,
            history: env.history,
            data: env.data,
            settings: env.settings,
            clip: env.clip,
        };
        (behavior.as_mut(), ctx)
    }
    /// Only the first of several held buttons is reported to the behavior.
    pub fn pointer_down(
        &mut self,
        env: ToolEnv<'_>,
        event: PointerEvent,
    ) -> Result<(), SurfaceError> {
        self.press_depth += 1;
        if self.press_depth != 1 {
            return Ok(());
        }
        let (behavior, mut ctx) = self.context(env);
        behavior.on_pointer_down(&mut ctx, event)
    }
    pub fn pointer_move(
        &mut self,
        env: ToolEnv<'_>,
        event: PointerEvent,
    ) -> Result<(), SurfaceError> {
        let pressed = self.is_pressed();
        let (behavior, mut ctx) = self.context(env);
        behavior.on_pointer_move(&mut ctx, event, pressed)
    }
    /// Reported once all held buttons are released. Unmatched releases are ignored.
    pub fn pointer_up(
        &mut self,
        env: ToolEnv<'_>,
        event: PointerEvent,
    ) -> Result<(), SurfaceError> {
        let Some(depth) = self.press_depth.checked_sub(1) else {
            return Ok(());
        };
        self.press_depth = depth;
        if depth != 0 {
            return Ok(());
        }
        let (behavior, mut ctx) = self.context(env);
        behavior.on_pointer_up(&mut ctx, event)
    }
    pub fn pointer_enter(&mut self, env: ToolEnv<'_>) {
        self.enter_depth += 1;
        if self.enter_depth == 1 {
            let (behavior, mut ctx) = self.context(env);
            behavior.on_enter(&mut ctx);
        }
    }
    pub fn pointer_leave(&mut self, env: ToolEnv<'_>) {
        let Some(depth) = self.enter_depth.checked_sub(1) else {
            return;
        };
        self.enter_depth = depth;
        if depth == 0 {
            let (behavior, mut ctx) = self.context(env);
            behavior.on_leave(&mut ctx);
        }
    }
    /// Tear down, committing any gesture in progress. The lease is handed back for return to the
    /// arbiter even if committing failed.
    ///
    /// Without an `env` (the layer is gone), uncommitted changes are dropped.
    pub fn deactivate(
        mut self,
        env: Option<ToolEnv<'_>>,
    ) -> (ScratchLease, Result<(), SurfaceError>) {
        let kind = self.kind();
        let result = match env {
            Some(env) => {
                let pressed = self.is_pressed();
                let (behavior, mut ctx) = self.context(env);
                if pressed {
                    behavior.on_interrupted(&mut ctx);
                }
                ctx.commit(&kind.to_string())
            }
            None => {
                if !self.dirty.is_empty() {
                    log::warn!("{kind} deactivated without a layer, dropping uncommitted changes");
                }
                Ok(())
            }
        };
        log::debug!("Deactivated {kind}");
        (self.lease, result)
    }
}

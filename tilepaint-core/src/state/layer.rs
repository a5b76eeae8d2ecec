use crate::surface::{Surface, SurfaceError};
use crate::util::{Rect, Size};

pub type ID = crate::PaintID<Layer>;

/// User-facing properties of a layer. Changing any of them is announced to document subscribers.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LayerProperties {
    pub name: String,
    pub visible: bool,
    pub opacity: u8,
}
impl LayerProperties {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            opacity: 255,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::Display)]
pub enum LayerProperty {
    Name,
    Visible,
    Opacity,
}

/// A bitmap layer.
#[derive(Debug)]
pub struct Layer {
    id: ID,
    properties: LayerProperties,
    surface: Surface,
    /// Area awaiting redraw, or None if clean.
    invalid: Option<Rect>,
    /// The layer's preview in the layers panel is out of date.
    thumbnail_stale: bool,
}
impl Layer {
    pub fn new(name: impl Into<String>, size: Size) -> Result<Self, SurfaceError> {
        Ok(Self::with_surface(name, Surface::new(size)?))
    }
    #[must_use]
    pub fn with_surface(name: impl Into<String>, surface: Surface) -> Self {
        Self {
            id: ID::default(),
            properties: LayerProperties::named(name),
            surface,
            invalid: None,
            thumbnail_stale: true,
        }
    }
    #[must_use]
    pub fn id(&self) -> ID {
        self.id
    }
    #[must_use]
    pub fn properties(&self) -> &LayerProperties {
        &self.properties
    }
    /// Not public - go through the document, so that subscribers are told.
    pub(super) fn properties_mut(&mut self) -> &mut LayerProperties {
        &mut self.properties
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.properties.name
    }
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.properties.visible
    }
    #[must_use]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }
    /// Raw pixel access. Callers are responsible for [`Layer::invalidate`]-ing what they touch.
    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }
    #[must_use]
    pub fn size(&self) -> Size {
        self.surface.size()
    }
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.surface.bounds()
    }
    /// Mark an area as needing redraw. Also makes the thumbnail stale.
    pub fn invalidate(&mut self, rect: Rect) {
        let rect = rect.intersect(&self.bounds());
        if rect.is_empty() {
            return;
        }
        self.invalid = Some(self.invalid.unwrap_or(Rect::EMPTY).union(&rect));
        self.thumbnail_stale = true;
    }
    pub fn invalidate_all(&mut self) {
        self.invalidate(self.bounds());
    }
    /// The pending redraw area, if any.
    #[must_use]
    pub fn invalid(&self) -> Option<Rect> {
        self.invalid
    }
    /// Take the pending redraw area, marking the layer clean.
    pub fn take_invalid(&mut self) -> Option<Rect> {
        self.invalid.take()
    }
    #[must_use]
    pub fn thumbnail_stale(&self) -> bool {
        self.thumbnail_stale
    }
    pub fn mark_thumbnail_fresh(&mut self) {
        self.thumbnail_stale = false;
    }
}

//! # Surfaces
//!
//! CPU pixel buffers. Layers own one each, the workspace owns one more as the scratch buffer. All
//! copies between surfaces are positional: pixel `(x, y)` of the source lands on `(x, y)` of the
//! destination.

use crate::util::{Rect, Region, Size};

/// Straight-alpha RGBA8.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, Debug, Default, bytemuck::Pod, bytemuck::Zeroable,
)]
#[repr(C)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}
impl Pixel {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("out of memory allocating a {}x{} surface", .0.width, .0.height)]
    OutOfMemory(Size),
}

#[derive(Clone, PartialEq, Eq)]
pub struct Surface {
    size: Size,
    pixels: Vec<Pixel>,
}
impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface").field("size", &self.size).finish_non_exhaustive()
    }
}
impl Surface {
    /// Allocate a transparent surface. Allocation failure is reported, rather than aborting, as
    /// surfaces can be canvas-sized.
    pub fn new(size: Size) -> Result<Self, SurfaceError> {
        Self::filled(size, Pixel::TRANSPARENT)
    }
    /// A zero-sized surface. Does not allocate.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            size: Size::new(0, 0),
            pixels: Vec::new(),
        }
    }
    pub fn filled(size: Size, pixel: Pixel) -> Result<Self, SurfaceError> {
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(size.area())
            .map_err(|_| SurfaceError::OutOfMemory(size))?;
        pixels.resize(size.area(), pixel);
        Ok(Self { size, pixels })
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
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }
    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
    // Caller ensures the point is in bounds.
    fn index(&self, x: i32, y: i32) -> usize {
        // In-bounds coordinates are never negative.
        y.unsigned_abs() as usize * self.size.width as usize + x.unsigned_abs() as usize
    }
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<Pixel> {
        self.bounds()
            .contains(x, y)
            .then(|| self.pixels[self.index(x, y)])
    }
    /// Returns false if the point was out of bounds.
    pub fn set(&mut self, x: i32, y: i32, pixel: Pixel) -> bool {
        if self.bounds().contains(x, y) {
            let idx = self.index(x, y);
            self.pixels[idx] = pixel;
            true
        } else {
            false
        }
    }
    /// Row slice of the pixels in `rect` on row `y`. `rect` must already be clipped to bounds.
    fn span(&self, rect: &Rect, y: i32) -> std::ops::Range<usize> {
        let start = self.index(rect.left(), y);
        start..start + rect.width as usize
    }
    pub fn fill_rect(&mut self, rect: Rect, pixel: Pixel) {
        let rect = rect.intersect(&self.bounds());
        for y in rect.top()..rect.bottom() {
            let span = self.span(&rect, y);
            self.pixels[span].fill(pixel);
        }
    }
    /// Copy the pixels of `rect` from `src`. Clipped against both surfaces.
    pub fn copy_rect_from(&mut self, src: &Surface, rect: Rect) {
        let rect = rect.intersect(&self.bounds()).intersect(&src.bounds());
        for y in rect.top()..rect.bottom() {
            let dst_span = self.span(&rect, y);
            let src_span = src.span(&rect, y);
            self.pixels[dst_span].copy_from_slice(&src.pixels[src_span]);
        }
    }
    pub fn copy_region_from(&mut self, src: &Surface, region: &Region) {
        for rect in region.rects() {
            self.copy_rect_from(src, *rect);
        }
    }
    /// Copy `rect` out into a new surface of the rect's size. The patch is positioned at the
    /// origin; use [`Surface::swap_patch`] with the same rect to put it back.
    pub fn read_patch(&self, rect: Rect) -> Result<Surface, SurfaceError> {
        let rect = rect.intersect(&self.bounds());
        let mut patch = Surface::new(rect.size())?;
        for (row, y) in (rect.top()..rect.bottom()).enumerate() {
            let src_span = self.span(&rect, y);
            let width = rect.width as usize;
            patch.pixels[row * width..(row + 1) * width].copy_from_slice(&self.pixels[src_span]);
        }
        Ok(patch)
    }
    /// Exchange the pixels of `rect` with the contents of `patch`, which must be exactly `rect`'s
    /// size. Returns false (touching nothing) on a size mismatch or if `rect` is not fully in
    /// bounds.
    pub fn swap_patch(&mut self, rect: Rect, patch: &mut Surface) -> bool {
        if patch.size != rect.size() || !self.bounds().contains_rect(&rect) {
            return false;
        }
        let width = rect.width as usize;
        for (row, y) in (rect.top()..rect.bottom()).enumerate() {
            let span = self.span(&rect, y);
            self.pixels[span].swap_with_slice(&mut patch.pixels[row * width..(row + 1) * width]);
        }
        true
    }
}

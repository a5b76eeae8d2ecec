//! # Undo capture
//!
//! Before a tool changes pixels, it asks for the area it is about to touch to be backed up into the
//! scratch buffer. Backups happen at the granularity of [`TILE_SIZE`] square tiles: the first
//! request covering a tile copies the whole tile, and later requests within the same capture
//! session skip it. Contiguous unsaved tiles in a row are merged into one rect so that a wide
//! stroke costs one copy per tile row, not one per tile.
//!
//! Alongside the tiles, the most recent request's precise [`Region`] is remembered as the *saved
//! region*, which [`UndoCapture::restore_saved`] puts back - this is how rubber-band tools erase
//! their previous preview.

use crate::state::Layer;
use crate::surface::Surface;
use crate::util::{Rect, Region, Size};

/// Edge length of a tile, in pixels.
pub const TILE_SIZE: u32 = 32;

/// One bit per tile of a layer, set once that tile has been copied to the scratch buffer.
#[derive(Clone, Debug)]
pub struct TileGrid {
    columns: usize,
    rows: usize,
    saved: bitvec::vec::BitVec,
}
impl TileGrid {
    /// A grid covering `size`, rounded up to whole tiles. None for zero-area sizes.
    #[must_use]
    pub fn covering(size: Size) -> Option<Self> {
        if size.is_empty() {
            return None;
        }
        let columns = size.width.div_ceil(TILE_SIZE) as usize;
        let rows = size.height.div_ceil(TILE_SIZE) as usize;
        Some(Self {
            columns,
            rows,
            saved: bitvec::vec::BitVec::repeat(false, columns * rows),
        })
    }
    /// `(columns, rows)`
    #[must_use]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.columns, self.rows)
    }
    /// Out-of-range tiles are never saved.
    #[must_use]
    pub fn is_saved(&self, column: usize, row: usize) -> bool {
        column < self.columns
            && row < self.rows
            && self.saved.get(row * self.columns + column).is_some_and(|bit| *bit)
    }
    fn mark_saved(&mut self, column: usize, row: usize) {
        self.saved.set(row * self.columns + column, true);
    }
    #[must_use]
    pub fn saved_count(&self) -> usize {
        self.saved.count_ones()
    }
}

/// The copies performed by one [`UndoCapture::capture`] call, in the order they were made.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Backup {
    pub rects: smallvec::SmallVec<[Rect; 4]>,
}
impl Backup {
    #[must_use]
    pub fn copies(&self) -> usize {
        self.rects.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
    /// Bounds of everything copied.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.rects.iter().fold(Rect::EMPTY, |acc, rect| acc.union(rect))
    }
}

/// Per-tool capture state. Starts empty, and is reset whenever the tool deactivates.
#[derive(Default, Debug)]
pub struct UndoCapture {
    /// Allocated on first use.
    tiles: Option<TileGrid>,
    saved: Option<Region>,
}
impl UndoCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn tile_grid(&self) -> Option<&TileGrid> {
        self.tiles.as_ref()
    }
    #[must_use]
    pub fn saved_region(&self) -> Option<&Region> {
        self.saved.as_ref()
    }
    /// Back up `layer` pixels into `scratch` for the union of `region`'s bounds and `bounds`, then
    /// make `region` the saved region.
    ///
    /// A request lying entirely outside the layer does nothing at all, and leaves the saved region
    /// as it was.
    pub fn capture(
        &mut self,
        layer: &Surface,
        scratch: &mut Surface,
        region: Option<&Region>,
        bounds: Rect,
    ) -> Backup {
        let layer_bounds = layer.bounds();
        let requested = region.map_or(bounds, Region::bounds).union(&bounds);
        let bounds = requested.intersect(&layer_bounds);
        let mut backup = Backup::default();
        // Nothing to back up, so the previously saved region remains the one to restore.
        if bounds.is_empty() {
            return backup;
        }

        // Grid must match the layer. If the layer was swapped out from under us, start over.
        let Some(fresh) = TileGrid::covering(layer.size()) else {
            return backup;
        };
        if self.tiles.as_ref().map(TileGrid::dimensions) != Some(fresh.dimensions()) {
            self.tiles = Some(fresh);
        }
        let Some(tiles) = self.tiles.as_mut() else {
            return backup;
        };

        // Bounds are clipped to the layer, thus non-negative.
        let tile = TILE_SIZE as usize;
        let left_tile = bounds.left().unsigned_abs() as usize / tile;
        let top_tile = bounds.top().unsigned_abs() as usize / tile;
        let right_tile = (bounds.right().unsigned_abs() as usize - 1) / tile;
        let bottom_tile = (bounds.bottom().unsigned_abs() as usize - 1) / tile;

        let mut flush = |accum: &mut Rect, backup: &mut Backup| {
            if !accum.is_empty() {
                scratch.copy_rect_from(layer, *accum);
                backup.rects.push(*accum);
                *accum = Rect::EMPTY;
            }
        };

        for row in top_tile..=bottom_tile {
            let mut accum = Rect::EMPTY;
            for column in left_tile..=right_tile {
                if tiles.is_saved(column, row) {
                    flush(&mut accum, &mut backup);
                } else {
                    // Tile indices are bounded by the layer's i32 dimensions.
                    let tile_rect = Rect::new(
                        (column * tile) as i32,
                        (row * tile) as i32,
                        TILE_SIZE,
                        TILE_SIZE,
                    )
                    .intersect(&layer_bounds);
                    accum = accum.union(&tile_rect);
                    tiles.mark_saved(column, row);
                }
            }
            flush(&mut accum, &mut backup);
        }
        if !backup.is_empty() {
            log::trace!(
                "Backed up {} rect(s) covering {:?}",
                backup.copies(),
                backup.bounds()
            );
        }

        self.saved = region.cloned();
        backup
    }
    /// Copy `region` from `scratch` back onto `layer`, marking it for redraw.
    /// Independent of the tile bookkeeping.
    pub fn restore(layer: &mut Layer, scratch: &Surface, region: &Region) {
        layer.surface_mut().copy_region_from(scratch, region);
        for rect in region.rects() {
            layer.invalidate(*rect);
        }
    }
    /// Restore and forget the saved region. Returns false if there wasn't one.
    pub fn restore_saved(&mut self, layer: &mut Layer, scratch: &Surface) -> bool {
        match self.saved.take() {
            Some(region) => {
                Self::restore(layer, scratch, &region);
                true
            }
            None => false,
        }
    }
    pub fn clear_saved_region(&mut self) {
        self.saved = None;
    }
    /// Forget which tiles are saved, so the next capture copies everything afresh.
    pub fn clear_tile_grid(&mut self) {
        self.tiles = None;
    }
    pub fn reset(&mut self) {
        self.clear_saved_region();
        self.clear_tile_grid();
    }
}

#[cfg(test)]
mod test {
    use super::{UndoCapture, TILE_SIZE};
    use crate::state::Layer;
    use crate::surface::{Pixel, Surface};
    use crate::util::{Rect, Region, Size};

    // Every pixel distinct-ish, so misplaced copies are caught.
    fn patterned_layer(size: Size) -> Layer {
        let mut surface = Surface::new(size).unwrap();
        for y in 0..size.height as i32 {
            for x in 0..size.width as i32 {
                surface.set(x, y, Pixel::rgba(x as u8, y as u8, (x ^ y) as u8, 255));
            }
        }
        Layer::with_surface("Pattern", surface)
    }
    fn scratch_for(layer: &Layer) -> Surface {
        Surface::filled(layer.size(), Pixel::rgba(1, 2, 3, 4)).unwrap()
    }

    #[test]
    fn grid_dimensions_round_up() {
        let grid = super::TileGrid::covering(Size::new(100, 64)).unwrap();
        assert_eq!(grid.dimensions(), (4, 2));
        assert!(super::TileGrid::covering(Size::new(0, 64)).is_none());
    }
    #[test]
    fn documented_scenario() {
        let layer = patterned_layer(Size::new(100, 100));
        let mut scratch = scratch_for(&layer);
        let mut capture = UndoCapture::new();

        let first = Rect::new(10, 10, 20, 20);
        let backup = capture.capture(
            layer.surface(),
            &mut scratch,
            Some(&Region::from_rect(first)),
            first,
        );
        assert_eq!(backup.rects.as_slice(), &[Rect::new(0, 0, 32, 32)]);

        let second = Rect::new(15, 15, 20, 20);
        let backup = capture.capture(
            layer.surface(),
            &mut scratch,
            Some(&Region::from_rect(second)),
            second,
        );
        // Spills into tile (1, 1) as 15 + 20 > 32.
        assert_eq!(
            backup.rects.as_slice(),
            &[Rect::new(32, 0, 32, 32), Rect::new(0, 32, 64, 32)]
        );

        let outside = Rect::new(200, 200, 10, 10);
        let backup = capture.capture(
            layer.surface(),
            &mut scratch,
            Some(&Region::from_rect(outside)),
            outside,
        );
        assert!(backup.is_empty());
        // The out-of-bounds request did not supersede the second.
        assert_eq!(capture.saved_region(), Some(&Region::from_rect(second)));
    }
    #[test]
    fn out_of_bounds_first_capture_allocates_nothing() {
        let layer = patterned_layer(Size::new(100, 100));
        let mut scratch = scratch_for(&layer);
        let mut capture = UndoCapture::new();
        let backup = capture.capture(
            layer.surface(),
            &mut scratch,
            None,
            Rect::new(200, 200, 10, 10),
        );
        assert!(backup.is_empty());
        assert!(capture.tile_grid().is_none());
        assert!(capture.saved_region().is_none());
        assert_eq!(scratch, scratch_for(&layer));
    }
    #[test]
    fn within_one_tile_copies_once() {
        let layer = patterned_layer(Size::new(100, 100));
        let mut scratch = scratch_for(&layer);
        let mut capture = UndoCapture::new();
        let a = Rect::new(10, 10, 20, 20);
        let b = Rect::new(12, 12, 18, 18);
        let copies = capture.capture(layer.surface(), &mut scratch, None, a).copies()
            + capture.capture(layer.surface(), &mut scratch, None, b).copies();
        assert_eq!(copies, 1);
        assert_eq!(capture.tile_grid().unwrap().saved_count(), 1);
        // No precise region given.
        assert!(capture.saved_region().is_none());
    }
    #[test]
    fn merges_runs_and_skips_saved() {
        let layer = patterned_layer(Size::new(160, 40));
        let mut scratch = scratch_for(&layer);
        let mut capture = UndoCapture::new();
        // Save the middle tile of row 0.
        capture.capture(layer.surface(), &mut scratch, None, Rect::new(70, 0, 1, 1));
        // Then the whole top row.
        let backup = capture.capture(layer.surface(), &mut scratch, None, Rect::new(0, 0, 160, 1));
        assert_eq!(
            backup.rects.as_slice(),
            &[Rect::new(0, 0, 64, 32), Rect::new(96, 0, 64, 32)]
        );
        // Partial last row is clipped to the layer.
        let backup = capture.capture(layer.surface(), &mut scratch, None, Rect::new(0, 39, 1, 1));
        assert_eq!(backup.rects.as_slice(), &[Rect::new(0, 32, 32, 8)]);
    }
    #[test]
    fn every_requested_pixel_is_original() {
        let mut layer = patterned_layer(Size::new(96, 96));
        let original = layer.surface().clone();
        let mut scratch = scratch_for(&layer);
        let mut capture = UndoCapture::new();
        let requests = [
            Rect::new(0, 0, 40, 40),
            Rect::new(20, 20, 40, 40),
            Rect::new(50, 5, 30, 80),
        ];
        let mut total = 0;
        for rect in requests {
            total += capture
                .capture(layer.surface(), &mut scratch, None, rect)
                .rects
                .iter()
                .map(|r| r.width as usize * r.height as usize / (TILE_SIZE * TILE_SIZE) as usize)
                .sum::<usize>();
            // Scribble over what was just requested, like a tool would.
            layer.surface_mut().fill_rect(rect, Pixel::BLACK);
        }
        // No tile was ever copied twice.
        assert_eq!(total, capture.tile_grid().unwrap().saved_count());
        for rect in requests {
            for y in rect.top()..rect.bottom() {
                for x in rect.left()..rect.right() {
                    assert_eq!(scratch.get(x, y), original.get(x, y), "at {x}, {y}");
                }
            }
        }
    }
    #[test]
    fn restore_puts_back_only_region() {
        let mut layer = patterned_layer(Size::new(64, 64));
        let original = layer.surface().clone();
        let mut scratch = scratch_for(&layer);
        let mut capture = UndoCapture::new();
        let rect = Rect::new(5, 5, 10, 10);
        let region = Region::from_rect(rect);
        capture.capture(layer.surface(), &mut scratch, Some(&region), rect);

        layer.surface_mut().fill_rect(Rect::new(0, 0, 64, 64), Pixel::WHITE);
        layer.take_invalid();
        assert!(capture.restore_saved(&mut layer, &scratch));
        assert!(capture.saved_region().is_none());
        assert_eq!(layer.invalid(), Some(rect));

        for y in 0..64 {
            for x in 0..64 {
                let expected = if rect.contains(x, y) {
                    original.get(x, y)
                } else {
                    Some(Pixel::WHITE)
                };
                assert_eq!(layer.surface().get(x, y), expected, "at {x}, {y}");
            }
        }
        // Second time, nothing saved.
        assert!(!capture.restore_saved(&mut layer, &scratch));
    }
    #[test]
    fn clearing() {
        let layer = patterned_layer(Size::new(64, 64));
        let mut scratch = scratch_for(&layer);
        let mut capture = UndoCapture::new();
        let rect = Rect::new(0, 0, 8, 8);
        capture.capture(layer.surface(), &mut scratch, Some(&rect.into()), rect);

        capture.clear_saved_region();
        assert!(capture.saved_region().is_none());
        assert!(capture.tile_grid().is_some());

        // Saved tiles are skipped until the grid is cleared.
        assert!(capture.capture(layer.surface(), &mut scratch, None, rect).is_empty());
        capture.clear_tile_grid();
        assert_eq!(capture.capture(layer.surface(), &mut scratch, None, rect).copies(), 1);
    }
}

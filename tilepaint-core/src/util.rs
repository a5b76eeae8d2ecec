//! Utility types, used throughout the crate.
//! Integer pixel geometry: [`Size`], [`Rect`], and [`Region`].

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}
impl Size {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
    #[must_use]
    pub fn area(self) -> usize {
        self.width as usize * self.height as usize
    }
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An axis-aligned pixel rectangle. `x, y` is the inclusive top-left, extending `width` right and
/// `height` down.
///
/// Any rect with zero area is considered empty, regardless of position.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}
impl Rect {
    pub const EMPTY: Self = Self {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
    /// Rect at the origin covering `size`.
    #[must_use]
    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }
    /// Create from exclusive edges. Inverted edges produce an empty rect.
    #[must_use]
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        if right <= left || bottom <= top {
            return Self::EMPTY;
        }
        Self::new(
            left,
            top,
            right.abs_diff(left),
            bottom.abs_diff(top),
        )
    }
    #[must_use]
    pub fn left(&self) -> i32 {
        self.x
    }
    #[must_use]
    pub fn top(&self) -> i32 {
        self.y
    }
    /// Exclusive right edge.
    #[must_use]
    pub fn right(&self) -> i32 {
        self.x.saturating_add_unsigned(self.width)
    }
    /// Exclusive bottom edge.
    #[must_use]
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add_unsigned(self.height)
    }
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
    /// Smallest rect containing both. Empty rects contribute nothing.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => Self::EMPTY,
            (true, false) => *other,
            (false, true) => *self,
            (false, false) => Self::from_edges(
                self.left().min(other.left()),
                self.top().min(other.top()),
                self.right().max(other.right()),
                self.bottom().max(other.bottom()),
            ),
        }
    }
    /// Overlapping area, or [`Rect::EMPTY`] if none.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self::from_edges(
            self.left().max(other.left()),
            self.top().max(other.top()),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        )
    }
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left() && x < self.right() && y >= self.top() && y < self.bottom()
    }
    /// Does `other` lie entirely within `self`? Empty rects are contained by everything.
    #[must_use]
    pub fn contains_rect(&self, other: &Self) -> bool {
        other.is_empty()
            || (other.left() >= self.left()
                && other.top() >= self.top()
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }
    /// Rect spanning two corner points, inclusive of both.
    #[must_use]
    pub fn spanning(a: (i32, i32), b: (i32, i32)) -> Self {
        Self::from_edges(
            a.0.min(b.0),
            a.1.min(b.1),
            a.0.max(b.0).saturating_add(1),
            a.1.max(b.1).saturating_add(1),
        )
    }
    /// Square of side `2 * radius + 1` centered on a point.
    #[must_use]
    pub fn around(x: i32, y: i32, radius: u32) -> Self {
        let r = i32::try_from(radius).unwrap_or(i32::MAX / 2);
        Self::from_edges(
            x.saturating_sub(r),
            y.saturating_sub(r),
            x.saturating_add(r).saturating_add(1),
            y.saturating_add(r).saturating_add(1),
        )
    }
}

/// An arbitrary set of pixels, described as a union of rects.
///
/// Rects may overlap. This is the "precise" shape a tool asks to protect, as opposed to the
/// tile-rounded area the capture engine actually backs up.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Region {
    // Optimize for a single rect, which is what most tools hand us.
    rects: smallvec::SmallVec<[Rect; 1]>,
}
impl Region {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        let mut this = Self::new();
        this.add_rect(rect);
        this
    }
    /// Add the pixels of `rect` to this region. Empty rects are ignored.
    pub fn add_rect(&mut self, rect: Rect) {
        if !rect.is_empty() {
            self.rects.push(rect);
        }
    }
    pub fn union_with(&mut self, other: &Region) {
        self.rects.extend(other.rects.iter().copied());
    }
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
    /// Bounding rect of every pixel in the region.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.rects
            .iter()
            .fold(Rect::EMPTY, |acc, rect| acc.union(rect))
    }
    /// Clip every rect of this region against `clip`.
    #[must_use]
    pub fn intersect_rect(&self, clip: &Rect) -> Self {
        let mut out = Self::new();
        for rect in &self.rects {
            out.add_rect(rect.intersect(clip));
        }
        out
    }
}
impl From<Rect> for Region {
    fn from(value: Rect) -> Self {
        Self::from_rect(value)
    }
}

#[cfg(test)]
mod test {
    use super::{Rect, Region};
    #[test]
    fn union_ignores_empty() {
        let a = Rect::new(10, 10, 5, 5);
        assert_eq!(a.union(&Rect::EMPTY), a);
        assert_eq!(Rect::EMPTY.union(&a), a);
        assert_eq!(
            a.union(&Rect::new(30, 0, 2, 2)),
            Rect::from_edges(10, 0, 32, 15)
        );
    }
    #[test]
    fn intersect() {
        let a = Rect::new(0, 0, 100, 100);
        assert_eq!(
            a.intersect(&Rect::new(90, 95, 20, 20)),
            Rect::new(90, 95, 10, 5)
        );
        assert!(a.intersect(&Rect::new(200, 200, 10, 10)).is_empty());
        // Touching edges do not overlap.
        assert!(a.intersect(&Rect::new(100, 0, 10, 10)).is_empty());
    }
    #[test]
    fn region_bounds() {
        let mut region = Region::from_rect(Rect::new(5, 5, 1, 1));
        region.add_rect(Rect::new(20, 2, 4, 4));
        region.add_rect(Rect::EMPTY);
        assert_eq!(region.rects().len(), 2);
        assert_eq!(region.bounds(), Rect::from_edges(5, 2, 24, 6));
        assert!(Region::new().bounds().is_empty());
    }
    #[test]
    fn spanning_is_inclusive() {
        assert_eq!(Rect::spanning((4, 4), (2, 3)), Rect::new(2, 3, 3, 2));
        assert_eq!(Rect::around(10, 10, 2), Rect::new(8, 8, 5, 5));
    }
}

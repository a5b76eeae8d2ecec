use crate::util::{Rect, Region};

/// The user's selection outline, and the rect it is clipped to (the document bounds).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    outline: Region,
    clip: Rect,
}
impl Selection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outline.is_empty()
    }
    #[must_use]
    pub fn outline(&self) -> &Region {
        &self.outline
    }
    #[must_use]
    pub fn clip_rect(&self) -> Rect {
        self.clip
    }
    pub fn set_clip_rect(&mut self, clip: Rect) {
        self.clip = clip;
        self.outline = self.outline.intersect_rect(&clip);
    }
    pub fn set_outline(&mut self, outline: Region) {
        self.outline = outline.intersect_rect(&self.clip);
    }
    /// Select nothing.
    pub fn reset(&mut self) {
        self.outline = Region::new();
    }
}

#[cfg(test)]
mod test {
    use super::Selection;
    use crate::util::{Rect, Region};
    #[test]
    fn outline_is_clipped() {
        let mut selection = Selection::default();
        selection.set_clip_rect(Rect::new(0, 0, 10, 10));
        selection.set_outline(Region::from_rect(Rect::new(5, 5, 10, 10)));
        assert_eq!(selection.outline().bounds(), Rect::new(5, 5, 5, 5));
        selection.reset();
        assert!(selection.is_empty());
    }
}

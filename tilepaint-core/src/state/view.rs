/// How the canvas zoom is decided.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum ZoomBasis {
    /// Zoom follows the window size so the whole document is visible.
    #[default]
    FitWindow,
    /// Zoom is a fixed scale factor chosen by the user.
    ScaleFactor,
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ViewState {
    pub basis: ZoomBasis,
    /// Screen pixels per document pixel. Only meaningful when `basis` is
    /// [`ZoomBasis::ScaleFactor`].
    pub scale: f64,
    /// Top-left of the visible area, in document pixels.
    pub scroll: [f64; 2],
}
impl Default for ViewState {
    fn default() -> Self {
        Self {
            basis: ZoomBasis::FitWindow,
            scale: 1.0,
            scroll: [0.0; 2],
        }
    }
}
impl ViewState {
    /// Multiply the scale, switching to a fixed zoom.
    pub fn zoom_by(&mut self, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            self.basis = ZoomBasis::ScaleFactor;
            self.scale *= factor;
        }
    }
}

use crate::conversion_util::SamplesPerPixel;

/// Performs the actual repaint once a coalesced visual change has been computed.
pub trait DisplaySurface {
    fn apply_zoom(&mut self, zoom: SamplesPerPixel);

    /// Horizontal origin in pixels, vertical origin in pixels.
    fn apply_scroll(&mut self, x: Option<f64>, y: Option<f64>);

    fn redraw_grid(&mut self);

    fn prepare_for_render(&mut self);

    fn redraw_auxiliary(&mut self) {}
}

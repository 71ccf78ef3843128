use crate::{Samples, TimelineEngineResult};
use derive_more::Display;

/// Zoom level as number of samples covered by one pixel.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
#[display(fmt = "{} samples/px", _0)]
pub struct SamplesPerPixel(i64);

impl SamplesPerPixel {
    pub const MIN: SamplesPerPixel = SamplesPerPixel(1);
    pub const MAX: SamplesPerPixel = SamplesPerPixel(1 << 26);

    pub fn new(value: i64) -> TimelineEngineResult<Self> {
        if value < Self::MIN.0 {
            return Err("samples per pixel must be at least 1");
        }
        if value > Self::MAX.0 {
            return Err("samples per pixel too large");
        }
        Ok(Self(value))
    }

    /// Like [`SamplesPerPixel::new`] but clamps instead of failing.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(Self::MIN.0, Self::MAX.0))
    }

    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl Default for SamplesPerPixel {
    fn default() -> Self {
        Self(256)
    }
}

pub fn convert_samples_to_pixels_unrounded(samples: Samples, zoom: SamplesPerPixel) -> f64 {
    samples.get() as f64 / zoom.get() as f64
}

pub fn convert_pixels_to_samples(pixels: f64, zoom: SamplesPerPixel) -> Samples {
    Samples::new((pixels * zoom.get() as f64).round() as i64)
}

/// On-screen distance converted to time at the given zoom, exact.
pub fn convert_pixel_distance_to_samples(pixels: u32, zoom: SamplesPerPixel) -> Samples {
    Samples::new(pixels as i64 * zoom.get())
}

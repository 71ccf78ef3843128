use crate::conversion_util::SamplesPerPixel;
use crate::grid::{grid_rule, ClockFamily, GridFamily};
use crate::{Beats, Samples, TempoMap, TimecodeSettings, PPQN};
use derive_more::Display;
use enumflags2::{bitflags, BitFlags};
use num::rational::Ratio;
use strum::{EnumIter, IntoEnumIterator};
use timeline_api::{GridType, Hz, TimeSignature};

/// Marks closer than this are not legible anymore.
pub const MIN_LEGIBLE_MARK_SPACING_PX: f64 = 8.0;

/// Granularity of the musical ruler, finest first.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, EnumIter, Display)]
pub enum BbtScale {
    #[display(fmt = "1/128")]
    OneTwentyEighths,
    #[display(fmt = "1/64")]
    SixtyFourths,
    #[display(fmt = "1/32")]
    ThirtySeconds,
    #[display(fmt = "1/16")]
    Sixteenths,
    #[display(fmt = "1/8")]
    Eighths,
    #[display(fmt = "1/4")]
    Quarters,
    #[display(fmt = "1 bar")]
    Bars1,
    #[display(fmt = "4 bars")]
    Bars4,
    #[display(fmt = "16 bars")]
    Bars16,
    #[display(fmt = "64 bars")]
    Bars64,
    #[display(fmt = "many bars")]
    ManyBars,
}

impl BbtScale {
    pub fn is_bar_level(&self) -> bool {
        use BbtScale::*;
        matches!(self, Bars1 | Bars4 | Bars16 | Bars64 | ManyBars)
    }

    /// Factor by which the tuple factor of a grid type is multiplied to get the subdivision
    /// shown at this scale. `None` at quarter and bar level.
    pub fn subdivision_multiplier(&self) -> Option<u32> {
        use BbtScale::*;
        let m = match self {
            OneTwentyEighths => 16,
            SixtyFourths => 8,
            ThirtySeconds => 4,
            Sixteenths => 2,
            Eighths => 1,
            Quarters | Bars1 | Bars4 | Bars16 | Bars64 | ManyBars => return None,
        };
        Some(m)
    }

    fn length_in_quarters(&self, meter: TimeSignature) -> f64 {
        use BbtScale::*;
        let bar = meter.numerator as f64 * 4.0 / meter.denominator as f64;
        match self {
            OneTwentyEighths => 1.0 / 32.0,
            SixtyFourths => 1.0 / 16.0,
            ThirtySeconds => 1.0 / 8.0,
            Sixteenths => 1.0 / 4.0,
            Eighths => 1.0 / 2.0,
            Quarters => 1.0,
            Bars1 => bar,
            Bars4 => 4.0 * bar,
            Bars16 => 16.0 * bar,
            Bars64 => 64.0 * bar,
            ManyBars => f64::INFINITY,
        }
    }
}

/// Granularity of the clock rulers.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, EnumIter, Display)]
pub enum ClockScale {
    #[display(fmt = "sub-frames")]
    SubFrames,
    #[display(fmt = "frames")]
    Frames,
    #[display(fmt = "CD frames")]
    CdFrames,
    #[display(fmt = "milliseconds")]
    Milliseconds,
    #[display(fmt = "seconds")]
    Seconds,
    #[display(fmt = "minutes")]
    Minutes,
    #[display(fmt = "hours")]
    Hours,
}

impl ClockScale {
    /// Exact length of one unit in samples.
    pub fn unit_length(&self, sample_rate: Hz, timecode: &TimecodeSettings) -> Ratio<i64> {
        let sr = sample_rate.get() as i64;
        let (fps_numerator, fps_denominator) = timecode.format.frames_per_second();
        let frame = Ratio::new(sr * fps_denominator, fps_numerator);
        match self {
            ClockScale::SubFrames => frame / timecode.subframes_per_frame.max(1) as i64,
            ClockScale::Frames => frame,
            ClockScale::CdFrames => Ratio::new(sr, 75),
            ClockScale::Milliseconds => Ratio::new(sr, 1000),
            ClockScale::Seconds => Ratio::from_integer(sr),
            ClockScale::Minutes => Ratio::from_integer(60 * sr),
            ClockScale::Hours => Ratio::from_integer(3600 * sr),
        }
    }
}

/// The resolved scale of the ruler matching the grid type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Display)]
pub enum RulerScale {
    /// Nothing resolved (no grid or no session).
    #[default]
    #[display(fmt = "none")]
    None,
    #[display(fmt = "{}", _0)]
    Bbt(BbtScale),
    #[display(fmt = "{}", _0)]
    Clock(ClockScale),
}

/// Picks the finest legible scale for the current zoom.
pub struct RulerScaleResolver<'a> {
    tempo_map: &'a dyn TempoMap,
    timecode: &'a TimecodeSettings,
}

impl<'a> RulerScaleResolver<'a> {
    pub fn new(tempo_map: &'a dyn TempoMap, timecode: &'a TimecodeSettings) -> Self {
        Self {
            tempo_map,
            timecode,
        }
    }

    pub fn resolve(
        &self,
        grid_type: GridType,
        zoom: SamplesPerPixel,
        window_start: Samples,
        window_end: Samples,
    ) -> RulerScale {
        match grid_rule(grid_type).family {
            GridFamily::None => RulerScale::None,
            GridFamily::Bar | GridFamily::Beat => {
                RulerScale::Bbt(self.resolve_bbt(zoom, window_start, window_end))
            }
            GridFamily::Clock(family) => RulerScale::Clock(self.resolve_clock(family, zoom)),
        }
    }

    fn resolve_bbt(&self, zoom: SamplesPerPixel, start: Samples, end: Samples) -> BbtScale {
        let start_beats = self.tempo_map.to_beats(start);
        let meter = self.tempo_map.meter_at(start_beats);
        let quarter_samples = {
            let quarters_in_window = (self.tempo_map.to_beats(end) - start_beats).quarters();
            if quarters_in_window >= 1.0 {
                (end - start).get() as f64 / quarters_in_window
            } else {
                let one_later = self.tempo_map.to_samples(start_beats + Beats::from_ticks(PPQN));
                (one_later - self.tempo_map.to_samples(start_beats)).get() as f64
            }
        };
        let px_per_quarter = quarter_samples / zoom.get() as f64;
        BbtScale::iter()
            .find(|s| s.length_in_quarters(meter) * px_per_quarter >= MIN_LEGIBLE_MARK_SPACING_PX)
            .unwrap_or(BbtScale::ManyBars)
    }

    fn resolve_clock(&self, family: ClockFamily, zoom: SamplesPerPixel) -> ClockScale {
        let sample_rate = self.tempo_map.sample_rate();
        let ladder = family.ladder();
        ladder
            .iter()
            .copied()
            .find(|s| {
                let unit = s.unit_length(sample_rate, self.timecode);
                let unit_samples = *unit.numer() as f64 / *unit.denom() as f64;
                unit_samples / zoom.get() as f64 >= MIN_LEGIBLE_MARK_SPACING_PX
            })
            .unwrap_or_else(|| family.coarsest())
    }
}

#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RulerKind {
    Timecode = 1 << 0,
    MinSec = 1 << 1,
    Samples = 1 << 2,
    Bbt = 1 << 3,
    CdMarkers = 1 << 4,
}

/// Rulers which should be visible when rulers follow the grid. `None` means "leave as is".
pub fn rulers_following_grid(grid_type: GridType) -> Option<BitFlags<RulerKind>> {
    let rulers = match grid_rule(grid_type).family {
        GridFamily::None => return None,
        GridFamily::Bar | GridFamily::Beat => RulerKind::Bbt.into(),
        GridFamily::Clock(ClockFamily::Timecode) => RulerKind::Timecode.into(),
        GridFamily::Clock(ClockFamily::MinSec) => RulerKind::MinSec.into(),
        GridFamily::Clock(ClockFamily::CdFrame) => RulerKind::MinSec | RulerKind::CdMarkers,
    };
    Some(rulers)
}

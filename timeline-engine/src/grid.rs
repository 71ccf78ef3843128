use crate::rounding::round_to_line;
use crate::{Beats, ClockScale, RulerScale, Samples, TempoMap, TimeValue, TimecodeSettings};
use timeline_api::{GridType, RoundMode, SnapPreference};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ClockFamily {
    Timecode,
    MinSec,
    CdFrame,
}

impl ClockFamily {
    /// Ruler scales of this family, finest first.
    pub fn ladder(&self) -> &'static [ClockScale] {
        use ClockScale::*;
        match self {
            ClockFamily::Timecode => &[SubFrames, Frames, Seconds, Minutes, Hours],
            ClockFamily::MinSec => &[Milliseconds, Seconds, Minutes, Hours],
            ClockFamily::CdFrame => &[CdFrames, Seconds, Minutes, Hours],
        }
    }

    pub fn finest(&self) -> ClockScale {
        self.ladder()[0]
    }

    pub fn coarsest(&self) -> ClockScale {
        self.ladder()[self.ladder().len() - 1]
    }

    /// The scale whose unit is used when rounding at the given ruler scale.
    ///
    /// Sub-frames are displayed but positions still snap to whole frames.
    fn rounding_scale(&self, scale: ClockScale) -> Option<ClockScale> {
        if !self.ladder().contains(&scale) {
            return None;
        }
        let rounding_scale = match scale {
            ClockScale::SubFrames => ClockScale::Frames,
            s => s,
        };
        Some(rounding_scale)
    }

    fn applies_timecode_offset(&self) -> bool {
        *self == ClockFamily::Timecode
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum GridFamily {
    None,
    Bar,
    Beat,
    Clock(ClockFamily),
}

/// How a grid type rounds.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct GridRule {
    pub grid_type: GridType,
    pub family: GridFamily,
    /// Lines per beat when not limited by the ruler scale. 0 for non-beat grids.
    pub beat_divisions: u32,
    /// Base tuple factor: 3, 5 or 7 for tuplets, 2 otherwise.
    pub tuple_factor: u32,
}

const fn rule(
    grid_type: GridType,
    family: GridFamily,
    beat_divisions: u32,
    tuple_factor: u32,
) -> GridRule {
    GridRule {
        grid_type,
        family,
        beat_divisions,
        tuple_factor,
    }
}

/// Indexed by the primitive value of [`GridType`].
const GRID_RULES: [GridRule; 21] = {
    use GridFamily::*;
    use GridType as G;
    [
        rule(G::None, None, 0, 2),
        rule(G::Bar, Bar, 0, 2),
        rule(G::Beat, Beat, 1, 2),
        rule(G::BeatDiv2, Beat, 2, 2),
        rule(G::BeatDiv3, Beat, 3, 3),
        rule(G::BeatDiv4, Beat, 4, 2),
        rule(G::BeatDiv5, Beat, 5, 5),
        rule(G::BeatDiv6, Beat, 6, 3),
        rule(G::BeatDiv7, Beat, 7, 7),
        rule(G::BeatDiv8, Beat, 8, 2),
        rule(G::BeatDiv10, Beat, 10, 5),
        rule(G::BeatDiv12, Beat, 12, 3),
        rule(G::BeatDiv14, Beat, 14, 7),
        rule(G::BeatDiv16, Beat, 16, 2),
        rule(G::BeatDiv20, Beat, 20, 5),
        rule(G::BeatDiv24, Beat, 24, 3),
        rule(G::BeatDiv28, Beat, 28, 7),
        rule(G::BeatDiv32, Beat, 32, 2),
        rule(G::Timecode, Clock(ClockFamily::Timecode), 0, 2),
        rule(G::MinSec, Clock(ClockFamily::MinSec), 0, 2),
        rule(G::CdFrame, Clock(ClockFamily::CdFrame), 0, 2),
    ]
};

pub fn grid_rule(grid_type: GridType) -> &'static GridRule {
    let index: usize = grid_type.into();
    &GRID_RULES[index]
}

/// Musical rounding target.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MusicalRounding {
    Bar,
    Subdivision(u32),
}

/// Picks the musical rounding for a beat-family grid.
///
/// With the scaled preference, the ruler scale limits the resolution but never makes it finer
/// than the grid type itself. The tuple factor is kept, so a 1/12 grid always lands on triplets.
pub fn musical_rounding(
    rule: &GridRule,
    ruler_scale: RulerScale,
    preference: SnapPreference,
) -> MusicalRounding {
    if rule.family == GridFamily::Bar {
        return MusicalRounding::Bar;
    }
    if preference == SnapPreference::GridUnscaled {
        return MusicalRounding::Subdivision(rule.beat_divisions);
    }
    let scale = match ruler_scale {
        RulerScale::None => return MusicalRounding::Subdivision(rule.beat_divisions),
        RulerScale::Bbt(s) => s,
        RulerScale::Clock(s) => {
            panic!("programming error: clock ruler scale {s} used for musical grid")
        }
    };
    if scale.is_bar_level() {
        return MusicalRounding::Bar;
    }
    let divisor = match scale.subdivision_multiplier() {
        None => 1,
        Some(m) => (m * rule.tuple_factor).min(rule.beat_divisions),
    };
    MusicalRounding::Subdivision(divisor)
}

/// Picks the clock scale whose unit is used for rounding.
pub fn clock_rounding_scale(
    family: ClockFamily,
    ruler_scale: RulerScale,
    preference: SnapPreference,
) -> ClockScale {
    let scale = if preference == SnapPreference::GridUnscaled {
        family.finest()
    } else {
        match ruler_scale {
            RulerScale::None => family.finest(),
            RulerScale::Clock(s) => s,
            RulerScale::Bbt(s) => {
                panic!("programming error: musical ruler scale {s} used for {family:?} grid")
            }
        }
    };
    family.rounding_scale(scale).unwrap_or_else(|| {
        panic!("programming error: no rounding rule for {scale} in {family:?} grid")
    })
}

pub struct GridContext<'a> {
    pub tempo_map: &'a dyn TempoMap,
    pub timecode: &'a TimecodeSettings,
    pub ruler_scale: RulerScale,
}

/// Returns the grid line selected by `mode`, in the domain of `position`.
///
/// `None` if the grid type has no lines.
pub fn round_to_grid(
    position: TimeValue,
    mode: RoundMode,
    grid_type: GridType,
    preference: SnapPreference,
    ctx: &GridContext,
) -> Option<TimeValue> {
    let rule = grid_rule(grid_type);
    let rounded = match rule.family {
        GridFamily::None => return None,
        GridFamily::Bar | GridFamily::Beat => {
            let rounding = musical_rounding(rule, ctx.ruler_scale, preference);
            round_musical(position, mode, rounding, ctx.tempo_map)
        }
        GridFamily::Clock(family) => {
            let scale = clock_rounding_scale(family, ctx.ruler_scale, preference);
            round_clock(position, mode, family, scale, ctx)
        }
    };
    Some(rounded.in_domain(position.domain(), ctx.tempo_map))
}

fn round_musical(
    position: TimeValue,
    mode: RoundMode,
    rounding: MusicalRounding,
    tempo_map: &dyn TempoMap,
) -> TimeValue {
    let (beats, mode) = match position {
        TimeValue::Musical(b) => (b, mode),
        TimeValue::Linear(s) => {
            let beats = tempo_map.to_beats(s);
            let back = tempo_map.to_samples(beats);
            if back == s {
                (beats, mode)
            } else {
                // Between two ticks: pick the tick on the rounding side, it's not an exact hit.
                let d = mode.direction();
                let beats = if d > 0 && back < s {
                    beats + Beats::from_ticks(1)
                } else if d < 0 && back > s {
                    beats - Beats::from_ticks(1)
                } else {
                    beats
                };
                (beats, mode.maybe())
            }
        }
    };
    let rounded = match rounding {
        MusicalRounding::Bar => tempo_map.round_to_bar(beats, mode),
        MusicalRounding::Subdivision(divisor) => {
            tempo_map.round_to_subdivision(beats, divisor, mode)
        }
    };
    TimeValue::Musical(rounded)
}

fn round_clock(
    position: TimeValue,
    mode: RoundMode,
    family: ClockFamily,
    scale: ClockScale,
    ctx: &GridContext,
) -> TimeValue {
    let samples = position.to_samples(ctx.tempo_map).get();
    let unit = scale.unit_length(ctx.tempo_map.sample_rate(), ctx.timecode);
    let numerator = *unit.numer() as i128;
    let denominator = *unit.denom() as i128;
    let offset = if family.applies_timecode_offset() {
        ctx.timecode.offset.get() as i128
    } else {
        0
    };
    let k = ((samples as i128 - offset) * denominator).div_euclid(numerator) as i64;
    let line = |k: i64| (offset + (k as i128 * numerator).div_euclid(denominator)) as i64;
    let rounded = round_to_line(samples, mode, k, line);
    TimeValue::Linear(Samples::new(rounded))
}

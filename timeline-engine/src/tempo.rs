use crate::rounding::round_to_line;
use crate::{Beats, Samples, PPQN};
use std::fmt;
use std::fmt::Formatter;
use thiserror::Error;
use timeline_api::{Bpm, Hz, RoundMode, TimeSignature};

/// Converts between linear and musical time.
///
/// Implementations must be immutable snapshots: the same input always yields the same output.
/// A changed tempo map is a new snapshot, which may be handed over from another thread.
pub trait TempoMap: Send + Sync {
    fn sample_rate(&self) -> Hz;

    fn to_beats(&self, samples: Samples) -> Beats;

    fn to_samples(&self, beats: Beats) -> Samples;

    /// Rounds to a line of the grid which divides each beat (meter pulse) into `divisor` parts.
    fn round_to_subdivision(&self, beats: Beats, divisor: u32, mode: RoundMode) -> Beats;

    fn round_to_bar(&self, beats: Beats, mode: RoundMode) -> Beats;

    fn meter_at(&self, beats: Beats) -> TimeSignature;
}

/// Bars-beats-ticks position. Bars and beats are 1-based, ticks are quarter-note ticks.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct BbtTime {
    pub bars: i64,
    pub beats: u32,
    pub ticks: i64,
}

impl BbtTime {
    pub const fn new(bars: i64, beats: u32, ticks: i64) -> Self {
        Self { bars, beats, ticks }
    }
}

impl fmt::Display for BbtTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{:04}", self.bars, self.beats, self.ticks)
    }
}

/// A tempo/meter change. Sections must start on bar lines of their predecessor.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct TempoSection {
    pub start: Beats,
    pub bpm: Bpm,
    pub time_signature: TimeSignature,
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum TempoMapError {
    #[error("tempo map needs at least one section")]
    Empty,
    #[error("first tempo section must start at zero but starts at {0}")]
    FirstSectionNotAtZero(Beats),
    #[error("tempo section at {0} doesn't start after its predecessor")]
    NotIncreasing(Beats),
    #[error("tempo section at {0} doesn't start on a bar line")]
    NotOnBarLine(Beats),
}

/// Piecewise-constant tempo map.
#[derive(Clone, Debug)]
pub struct StaticTempoMap {
    sample_rate: Hz,
    sections: Vec<ResolvedSection>,
}

#[derive(Copy, Clone, Debug)]
struct ResolvedSection {
    start: Beats,
    start_sample: f64,
    /// 0-based.
    start_bar: i64,
    samples_per_tick: f64,
    time_signature: TimeSignature,
}

impl ResolvedSection {
    fn pulse_ticks(&self) -> i64 {
        PPQN * 4 / self.time_signature.denominator as i64
    }

    fn bar_ticks(&self) -> i64 {
        self.pulse_ticks() * self.time_signature.numerator as i64
    }
}

impl Default for StaticTempoMap {
    /// 120 BPM, 4/4, 48 kHz.
    fn default() -> Self {
        Self::constant(
            Hz::default(),
            Bpm::DEFAULT,
            TimeSignature::default(),
        )
    }
}

impl StaticTempoMap {
    pub fn constant(sample_rate: Hz, bpm: Bpm, time_signature: TimeSignature) -> Self {
        let section = TempoSection {
            start: Beats::ZERO,
            bpm,
            time_signature,
        };
        Self {
            sample_rate,
            sections: vec![resolve_first(sample_rate, section)],
        }
    }

    pub fn new(sample_rate: Hz, sections: Vec<TempoSection>) -> Result<Self, TempoMapError> {
        let mut iter = sections.into_iter();
        let first = iter.next().ok_or(TempoMapError::Empty)?;
        if first.start != Beats::ZERO {
            return Err(TempoMapError::FirstSectionNotAtZero(first.start));
        }
        let mut prev = resolve_first(sample_rate, first);
        let mut resolved = vec![prev];
        for section in iter {
            let delta = (section.start - prev.start).ticks();
            if delta <= 0 {
                return Err(TempoMapError::NotIncreasing(section.start));
            }
            if delta % prev.bar_ticks() != 0 {
                return Err(TempoMapError::NotOnBarLine(section.start));
            }
            let next = ResolvedSection {
                start: section.start,
                start_sample: prev.start_sample + delta as f64 * prev.samples_per_tick,
                start_bar: prev.start_bar + delta / prev.bar_ticks(),
                samples_per_tick: samples_per_tick(sample_rate, section.bpm),
                time_signature: section.time_signature,
            };
            resolved.push(next);
            prev = next;
        }
        Ok(Self {
            sample_rate,
            sections: resolved,
        })
    }

    pub fn bbt_at(&self, beats: Beats) -> BbtTime {
        let s = self.section_at_beats(beats);
        let offset = (beats - s.start).ticks();
        let bar_ticks = s.bar_ticks();
        let in_bar = offset.rem_euclid(bar_ticks);
        BbtTime {
            bars: s.start_bar + offset.div_euclid(bar_ticks) + 1,
            beats: (in_bar / s.pulse_ticks()) as u32 + 1,
            ticks: in_bar % s.pulse_ticks(),
        }
    }

    pub fn beats_at_bbt(&self, bbt: BbtTime) -> Beats {
        let bar_index = bbt.bars - 1;
        let i = self
            .sections
            .partition_point(|s| s.start_bar <= bar_index)
            .saturating_sub(1);
        let s = &self.sections[i];
        let ticks = s.start.ticks()
            + (bar_index - s.start_bar) * s.bar_ticks()
            + (bbt.beats as i64 - 1) * s.pulse_ticks()
            + bbt.ticks;
        Beats::from_ticks(ticks)
    }

    fn section_index_at_beats(&self, beats: Beats) -> usize {
        self.sections
            .partition_point(|s| s.start <= beats)
            .saturating_sub(1)
    }

    fn section_at_beats(&self, beats: Beats) -> &ResolvedSection {
        &self.sections[self.section_index_at_beats(beats)]
    }

    fn section_at_sample(&self, sample: f64) -> &ResolvedSection {
        let i = self
            .sections
            .partition_point(|s| s.start_sample <= sample)
            .saturating_sub(1);
        &self.sections[i]
    }

    /// Rounds onto lines spaced `spacing.0 / spacing.1` ticks apart, starting at each section
    /// start. Sections never share lines across their boundary.
    fn round_in_sections(
        &self,
        beats: Beats,
        mode: RoundMode,
        spacing: impl Fn(&ResolvedSection) -> (i64, i64) + Copy,
    ) -> Beats {
        let i = self.section_index_at_beats(beats);
        let s = &self.sections[i];
        let next_start = self.sections.get(i + 1).map(|n| n.start.ticks());
        let (numerator, denominator) = spacing(s);
        let line = |k: i64| {
            let l = s.start.ticks() + (k * numerator).div_euclid(denominator);
            match next_start {
                Some(n) => l.min(n),
                None => l,
            }
        };
        let offset = (beats - s.start).ticks();
        let k = (offset * denominator).div_euclid(numerator);
        let rounded = round_to_line(beats.ticks(), mode, k, line);
        if rounded < s.start.ticks() && i > 0 {
            // Crossed the section start backwards, continue on the lines of the previous section.
            let just_before = Beats::from_ticks(s.start.ticks() - 1);
            return self.round_in_sections(just_before, RoundMode::DownMaybe, spacing);
        }
        Beats::from_ticks(rounded)
    }
}

impl TempoMap for StaticTempoMap {
    fn sample_rate(&self) -> Hz {
        self.sample_rate
    }

    fn to_beats(&self, samples: Samples) -> Beats {
        let sample = samples.get() as f64;
        let s = self.section_at_sample(sample);
        let ticks = ((sample - s.start_sample) / s.samples_per_tick).round() as i64;
        s.start + Beats::from_ticks(ticks)
    }

    fn to_samples(&self, beats: Beats) -> Samples {
        let s = self.section_at_beats(beats);
        let ticks = (beats - s.start).ticks();
        Samples::new((s.start_sample + ticks as f64 * s.samples_per_tick).round() as i64)
    }

    fn round_to_subdivision(&self, beats: Beats, divisor: u32, mode: RoundMode) -> Beats {
        let divisor = divisor.max(1) as i64;
        self.round_in_sections(beats, mode, |s| (s.pulse_ticks(), divisor))
    }

    fn round_to_bar(&self, beats: Beats, mode: RoundMode) -> Beats {
        self.round_in_sections(beats, mode, |s| (s.bar_ticks(), 1))
    }

    fn meter_at(&self, beats: Beats) -> TimeSignature {
        self.section_at_beats(beats).time_signature
    }
}

fn resolve_first(sample_rate: Hz, section: TempoSection) -> ResolvedSection {
    ResolvedSection {
        start: section.start,
        start_sample: 0.0,
        start_bar: 0,
        samples_per_tick: samples_per_tick(sample_rate, section.bpm),
        time_signature: section.time_signature,
    }
}

fn samples_per_tick(sample_rate: Hz, bpm: Bpm) -> f64 {
    sample_rate.get() as f64 * 60.0 / (bpm.get() * PPQN as f64)
}

use crate::TempoMap;
use derive_more::{Add, Display, Neg, Sub};
use std::cmp::Ordering;
use std::fmt;
use std::fmt::Formatter;
use thiserror::Error;

/// Ticks per quarter note.
pub const PPQN: i64 = 1920;

/// A position or distance in linear time.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Add, Sub, Neg, Display,
)]
#[display(fmt = "{} samples", _0)]
pub struct Samples(i64);

impl Samples {
    pub const ZERO: Samples = Samples(0);
    pub const MAX: Samples = Samples(i64::MAX);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(&self) -> i64 {
        self.0
    }

    pub fn abs(&self) -> Self {
        Self(self.0.saturating_abs())
    }
}

/// A position or distance in musical time, counted in ticks of a quarter note.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Add, Sub, Neg)]
pub struct Beats {
    ticks: i64,
}

impl Beats {
    pub const ZERO: Beats = Beats { ticks: 0 };
    pub const MAX: Beats = Beats { ticks: i64::MAX };

    pub const fn from_ticks(ticks: i64) -> Self {
        Self { ticks }
    }

    pub const fn from_quarters(quarters: i64) -> Self {
        Self {
            ticks: quarters * PPQN,
        }
    }

    pub const fn ticks(&self) -> i64 {
        self.ticks
    }

    pub fn quarters(&self) -> f64 {
        self.ticks as f64 / PPQN as f64
    }

    pub fn abs(&self) -> Self {
        Self {
            ticks: self.ticks.saturating_abs(),
        }
    }
}

impl fmt::Display for Beats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}q+{}",
            self.ticks.div_euclid(PPQN),
            self.ticks.rem_euclid(PPQN)
        )
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum TimeDomain {
    #[display(fmt = "audio")]
    Audio,
    #[display(fmt = "beat")]
    Beat,
}

/// A time value which is either linear (samples) or musical (beats).
///
/// The domain of a value only changes via [`TimeValue::in_domain`]. Values of different domains
/// neither compare nor subtract.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TimeValue {
    Linear(Samples),
    Musical(Beats),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Error)]
#[error("can't relate {left} time to {right} time without explicit conversion")]
pub struct TimeDomainMismatch {
    pub left: TimeDomain,
    pub right: TimeDomain,
}

impl TimeValue {
    pub const fn zero(domain: TimeDomain) -> Self {
        match domain {
            TimeDomain::Audio => TimeValue::Linear(Samples::ZERO),
            TimeDomain::Beat => TimeValue::Musical(Beats::ZERO),
        }
    }

    /// The largest value of the given domain, used as "nothing found yet" sentinel.
    pub const fn max(domain: TimeDomain) -> Self {
        match domain {
            TimeDomain::Audio => TimeValue::Linear(Samples::MAX),
            TimeDomain::Beat => TimeValue::Musical(Beats::MAX),
        }
    }

    pub fn domain(&self) -> TimeDomain {
        match self {
            TimeValue::Linear(_) => TimeDomain::Audio,
            TimeValue::Musical(_) => TimeDomain::Beat,
        }
    }

    pub fn is_max(&self) -> bool {
        *self == Self::max(self.domain())
    }

    /// Count of the smallest units of the own domain (samples or ticks).
    pub fn units(&self) -> i64 {
        match self {
            TimeValue::Linear(s) => s.get(),
            TimeValue::Musical(b) => b.ticks(),
        }
    }

    fn with_units(domain: TimeDomain, units: i64) -> Self {
        match domain {
            TimeDomain::Audio => TimeValue::Linear(Samples::new(units)),
            TimeDomain::Beat => TimeValue::Musical(Beats::from_ticks(units)),
        }
    }

    pub fn to_samples(&self, tempo_map: &dyn TempoMap) -> Samples {
        match self {
            TimeValue::Linear(s) => *s,
            TimeValue::Musical(b) => tempo_map.to_samples(*b),
        }
    }

    pub fn to_beats(&self, tempo_map: &dyn TempoMap) -> Beats {
        match self {
            TimeValue::Linear(s) => tempo_map.to_beats(*s),
            TimeValue::Musical(b) => *b,
        }
    }

    /// Converts this value into the given domain. This is the only way to change the domain.
    pub fn in_domain(&self, domain: TimeDomain, tempo_map: &dyn TempoMap) -> TimeValue {
        if self.domain() == domain {
            return *self;
        }
        match domain {
            TimeDomain::Audio => TimeValue::Linear(self.to_samples(tempo_map)),
            TimeDomain::Beat => TimeValue::Musical(self.to_beats(tempo_map)),
        }
    }

    /// Signed distance from this value to `other` (`other - self`).
    ///
    /// Saturates instead of overflowing, so distances to the [`TimeValue::max`] sentinel are safe.
    pub fn distance(&self, other: &TimeValue) -> Result<TimeValue, TimeDomainMismatch> {
        if self.domain() != other.domain() {
            return Err(TimeDomainMismatch {
                left: self.domain(),
                right: other.domain(),
            });
        }
        let units = other.units().saturating_sub(self.units());
        Ok(Self::with_units(self.domain(), units))
    }

    /// Like [`TimeValue::distance`] but converts `other` into the domain of this value first.
    pub fn distance_via(&self, other: &TimeValue, tempo_map: &dyn TempoMap) -> TimeValue {
        let other = other.in_domain(self.domain(), tempo_map);
        let units = other.units().saturating_sub(self.units());
        Self::with_units(self.domain(), units)
    }

    pub fn abs(&self) -> TimeValue {
        match self {
            TimeValue::Linear(s) => TimeValue::Linear(s.abs()),
            TimeValue::Musical(b) => TimeValue::Musical(b.abs()),
        }
    }

    /// Moves this value by the given number of smallest units of its own domain.
    pub fn nudged(&self, units: i64) -> TimeValue {
        Self::with_units(self.domain(), self.units().saturating_add(units))
    }
}

impl PartialOrd for TimeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (TimeValue::Linear(a), TimeValue::Linear(b)) => a.partial_cmp(b),
            (TimeValue::Musical(a), TimeValue::Musical(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TimeValue::Linear(s) => s.fmt(f),
            TimeValue::Musical(b) => b.fmt(f),
        }
    }
}

impl From<Samples> for TimeValue {
    fn from(value: Samples) -> Self {
        TimeValue::Linear(value)
    }
}

impl From<Beats> for TimeValue {
    fn from(value: Beats) -> Self {
        TimeValue::Musical(value)
    }
}

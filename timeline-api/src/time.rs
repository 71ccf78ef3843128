use crate::TimelineApiResult;
use derive_more::Display;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// Tempo in quarter notes per minute.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Serialize, Deserialize, Display)]
#[display(fmt = "{} BPM", _0)]
pub struct Bpm(f64);

impl Bpm {
    pub const DEFAULT: Bpm = Bpm(120.0);

    pub fn new(value: f64) -> TimelineApiResult<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err("BPM value must be > 0.0");
        }
        Ok(Self(value))
    }

    pub const fn get(&self) -> f64 {
        self.0
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize, Display)]
#[display(fmt = "{}/{}", numerator, denominator)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    /// The denominator must be a power of two not larger than 32.
    pub fn new(numerator: u32, denominator: u32) -> TimelineApiResult<Self> {
        if numerator == 0 {
            return Err("time signature numerator must be > 0");
        }
        if !denominator.is_power_of_two() || denominator > 32 {
            return Err("time signature denominator must be one of 1, 2, 4, 8, 16, 32");
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }
}

/// Sample rate.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize, Display)]
#[display(fmt = "{} Hz", _0)]
pub struct Hz(u32);

impl Hz {
    pub fn new(value: u32) -> TimelineApiResult<Self> {
        if value == 0 {
            return Err("sample rate must be > 0");
        }
        Ok(Self(value))
    }

    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl Default for Hz {
    fn default() -> Self {
        Self(48_000)
    }
}

/// Non-drop timecode frame rates.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Debug,
    Default,
    Serialize,
    Deserialize,
    EnumIter,
    TryFromPrimitive,
    IntoPrimitive,
    Display,
)]
#[repr(usize)]
pub enum TimecodeFormat {
    #[display(fmt = "23.976 fps")]
    Fps23976,
    #[display(fmt = "24 fps")]
    Fps24,
    #[display(fmt = "24.976 fps")]
    Fps24976,
    #[display(fmt = "25 fps")]
    Fps25,
    #[display(fmt = "29.97 fps")]
    Fps2997,
    #[default]
    #[display(fmt = "30 fps")]
    Fps30,
    #[display(fmt = "50 fps")]
    Fps50,
    #[display(fmt = "59.94 fps")]
    Fps5994,
    #[display(fmt = "60 fps")]
    Fps60,
}

impl TimecodeFormat {
    /// Frames per second as exact fraction `(numerator, denominator)`.
    pub const fn frames_per_second(&self) -> (i64, i64) {
        use TimecodeFormat::*;
        match self {
            Fps23976 => (24_000, 1001),
            Fps24 => (24, 1),
            Fps24976 => (25_000, 1001),
            Fps25 => (25, 1),
            Fps2997 => (30_000, 1001),
            Fps30 => (30, 1),
            Fps50 => (50, 1),
            Fps5994 => (60_000, 1001),
            Fps60 => (60, 1),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize, Display)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn get(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_invalid_values() {
        assert!(Bpm::new(0.0).is_err());
        assert!(Bpm::new(f64::NAN).is_err());
        assert!(Hz::new(0).is_err());
        assert!(TimeSignature::new(0, 4).is_err());
        assert!(TimeSignature::new(7, 6).is_err());
        assert!(TimeSignature::new(7, 64).is_err());
    }

    #[test]
    fn accept_valid_values() {
        assert_eq!(Bpm::new(120.0).unwrap().get(), 120.0);
        assert_eq!(Hz::new(44_100).unwrap().get(), 44_100);
        assert_eq!(TimeSignature::new(7, 8).unwrap().to_string(), "7/8");
    }

    #[test]
    fn default_bpm_is_valid() {
        assert_eq!(Bpm::new(Bpm::DEFAULT.get()), Ok(Bpm::DEFAULT));
        assert_eq!(Bpm::DEFAULT.to_string(), "120 BPM");
    }
}

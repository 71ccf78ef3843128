use derive_more::Display;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// The unit which the timeline snaps to.
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
pub enum GridType {
    #[default]
    #[display(fmt = "No Grid")]
    None,
    #[display(fmt = "Bar")]
    Bar,
    #[display(fmt = "1/4 Note")]
    Beat,
    #[display(fmt = "1/8 Note")]
    BeatDiv2,
    #[display(fmt = "1/4 Triplet")]
    BeatDiv3,
    #[display(fmt = "1/16 Note")]
    BeatDiv4,
    #[display(fmt = "1/4 Quintuplet")]
    BeatDiv5,
    #[display(fmt = "1/8 Triplet")]
    BeatDiv6,
    #[display(fmt = "1/4 Septuplet")]
    BeatDiv7,
    #[display(fmt = "1/32 Note")]
    BeatDiv8,
    #[display(fmt = "1/8 Quintuplet")]
    BeatDiv10,
    #[display(fmt = "1/16 Triplet")]
    BeatDiv12,
    #[display(fmt = "1/8 Septuplet")]
    BeatDiv14,
    #[display(fmt = "1/64 Note")]
    BeatDiv16,
    #[display(fmt = "1/16 Quintuplet")]
    BeatDiv20,
    #[display(fmt = "1/32 Triplet")]
    BeatDiv24,
    #[display(fmt = "1/16 Septuplet")]
    BeatDiv28,
    #[display(fmt = "1/128 Note")]
    BeatDiv32,
    #[display(fmt = "Timecode")]
    Timecode,
    #[display(fmt = "MinSec")]
    MinSec,
    #[display(fmt = "CD Frames")]
    CdFrame,
}

impl GridType {
    pub fn is_none(&self) -> bool {
        *self == GridType::None
    }

    /// Bar, beat and beat subdivisions.
    pub fn is_musical(&self) -> bool {
        use GridType::*;
        matches!(
            self,
            Bar | Beat
                | BeatDiv2
                | BeatDiv3
                | BeatDiv4
                | BeatDiv5
                | BeatDiv6
                | BeatDiv7
                | BeatDiv8
                | BeatDiv10
                | BeatDiv12
                | BeatDiv14
                | BeatDiv16
                | BeatDiv20
                | BeatDiv24
                | BeatDiv28
                | BeatDiv32
        )
    }

    /// Timecode, minutes:seconds and CD frames.
    pub fn is_absolute_clock(&self) -> bool {
        matches!(self, GridType::Timecode | GridType::MinSec | GridType::CdFrame)
    }

    /// Next finer choice when cycling through the common grid types.
    ///
    /// Tuplet and clock grids are not part of the cycle and stay where they are.
    pub fn next_grid_choice(&self) -> Self {
        use GridType::*;
        match self {
            None => Bar,
            Bar => Beat,
            Beat => BeatDiv2,
            BeatDiv2 => BeatDiv4,
            BeatDiv4 => BeatDiv8,
            BeatDiv8 => BeatDiv16,
            BeatDiv16 => BeatDiv32,
            BeatDiv32 => None,
            other => *other,
        }
    }

    /// Next coarser choice when cycling through the common grid types.
    pub fn prev_grid_choice(&self) -> Self {
        use GridType::*;
        match self {
            None => BeatDiv32,
            BeatDiv32 => BeatDiv16,
            BeatDiv16 => BeatDiv8,
            BeatDiv8 => BeatDiv4,
            BeatDiv4 => BeatDiv2,
            BeatDiv2 => Beat,
            Beat => Bar,
            Bar => None,
            other => *other,
        }
    }
}

/// Whether snapping is active absent an explicit override.
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
pub enum SnapMode {
    #[display(fmt = "Off")]
    Off,
    #[default]
    #[display(fmt = "Magnetic")]
    Magnetic,
}

impl SnapMode {
    pub fn cycle(&self) -> Self {
        match self {
            SnapMode::Off => SnapMode::Magnetic,
            SnapMode::Magnetic => SnapMode::Off,
        }
    }
}

/// Which candidate families a call site wants to consider.
#[derive(
    Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize, EnumIter, Display,
)]
pub enum SnapPreference {
    /// Markers, region boundaries and the grid as it is currently drawn.
    #[default]
    #[display(fmt = "Any visible")]
    AnyVisual,
    /// Only the grid, limited to the lines the ruler can show at the current zoom.
    #[display(fmt = "Grid (scaled)")]
    GridScaled,
    /// Only the grid, at the resolution of the grid type no matter the zoom.
    #[display(fmt = "Grid (unscaled)")]
    GridUnscaled,
}

impl SnapPreference {
    pub fn is_grid_only(&self) -> bool {
        *self != SnapPreference::AnyVisual
    }
}

/// Rounding direction.
///
/// The "maybe" variants and [`RoundMode::Nearest`] leave a position which is exactly on a line
/// untouched. The "always" variants move to the adjacent line in that case.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize, EnumIter, Display)]
pub enum RoundMode {
    #[display(fmt = "Down (always)")]
    DownAlways,
    #[display(fmt = "Down")]
    DownMaybe,
    #[display(fmt = "Nearest")]
    Nearest,
    #[display(fmt = "Up")]
    UpMaybe,
    #[display(fmt = "Up (always)")]
    UpAlways,
}

impl RoundMode {
    /// -1, 0 or 1.
    pub fn direction(&self) -> i32 {
        use RoundMode::*;
        match self {
            DownAlways | DownMaybe => -1,
            Nearest => 0,
            UpMaybe | UpAlways => 1,
        }
    }

    pub fn is_always(&self) -> bool {
        matches!(self, RoundMode::DownAlways | RoundMode::UpAlways)
    }

    /// The same direction but keeping exact hits.
    pub fn maybe(&self) -> Self {
        match self {
            RoundMode::DownAlways => RoundMode::DownMaybe,
            RoundMode::UpAlways => RoundMode::UpMaybe,
            other => *other,
        }
    }
}

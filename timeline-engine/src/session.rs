use crate::{RegionPoint, Samples, TempoMap, TimeValue};
use enumflags2::BitFlags;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;
use std::sync::Arc;
use timeline_api::{TimecodeFormat, TrackId};

/// Reports markers around a position.
pub trait LocationStore {
    /// The last marker at or before `position` and the first marker at or after it.
    fn nearest_markers(
        &self,
        position: TimeValue,
        tempo_map: &dyn TempoMap,
    ) -> (Option<TimeValue>, Option<TimeValue>);
}

/// Enumerates edit-relevant boundaries of regions.
pub trait RegionStore {
    /// The requested points of all regions on the given tracks, in any order.
    fn boundary_points_for(
        &self,
        tracks: &[TrackId],
        points: BitFlags<RegionPoint>,
    ) -> Vec<TimeValue>;
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TimecodeSettings {
    pub format: TimecodeFormat,
    pub subframes_per_frame: u32,
    /// Position of timecode zero relative to sample zero. May be negative.
    pub offset: Samples,
}

impl Default for TimecodeSettings {
    fn default() -> Self {
        Self {
            format: TimecodeFormat::default(),
            subframes_per_frame: 100,
            offset: Samples::ZERO,
        }
    }
}

/// What the editor needs from an open session.
#[derive(Clone)]
pub struct Session {
    pub tempo_map: Arc<dyn TempoMap>,
    pub locations: Rc<dyn LocationStore>,
    pub regions: Rc<dyn RegionStore>,
    pub timecode: TimecodeSettings,
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("sample_rate", &self.tempo_map.sample_rate())
            .field("timecode", &self.timecode)
            .finish()
    }
}

/// Engine-side changes, delivered to the UI context through [`base::UiDispatcher`].
#[derive(Clone)]
pub enum SessionEvent {
    RegionsChanged,
    /// Carries the new snapshot, which replaces the one of the session.
    TempoMapChanged(Arc<dyn TempoMap>),
    TimecodeChanged(TimecodeSettings),
}

impl Debug for SessionEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::RegionsChanged => f.write_str("RegionsChanged"),
            SessionEvent::TempoMapChanged(map) => f
                .debug_tuple("TempoMapChanged")
                .field(&map.sample_rate())
                .finish(),
            SessionEvent::TimecodeChanged(timecode) => {
                f.debug_tuple("TimecodeChanged").field(timecode).finish()
            }
        }
    }
}

use crate::{RegionStore, TempoMap, TimeDomain, TimeValue};
use base::metrics_util::record_occurrence;
use enumflags2::{bitflags, BitFlags};
use itertools::Itertools;
use timeline_api::{RoundMode, TrackId};

#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RegionPoint {
    Start = 1 << 0,
    End = 1 << 1,
    Sync = 1 << 2,
}

/// Sorted region boundaries of the visible tracks, rebuilt lazily.
///
/// Boundaries of distinct regions which coincide are all kept.
#[derive(Debug)]
pub struct RegionBoundaryCache {
    domain: TimeDomain,
    boundaries: Vec<TimeValue>,
    /// Region points the boundaries were collected for.
    points: BitFlags<RegionPoint>,
    dirty: bool,
}

impl Default for RegionBoundaryCache {
    fn default() -> Self {
        Self::new(TimeDomain::Audio)
    }
}

impl RegionBoundaryCache {
    /// Creates an empty, dirty cache which stores its boundaries in the given domain.
    pub fn new(domain: TimeDomain) -> Self {
        Self {
            domain,
            boundaries: vec![],
            points: BitFlags::empty(),
            dirty: true,
        }
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Drops all boundaries, e.g. when the session closes.
    pub fn clear(&mut self) {
        self.boundaries = vec![];
        self.dirty = true;
    }

    /// Rebuilds the cache if it's dirty or was built for other region points and gives read
    /// access to it.
    pub fn ensure_built(
        &mut self,
        regions: &dyn RegionStore,
        visible_tracks: &[TrackId],
        points: BitFlags<RegionPoint>,
        tempo_map: &dyn TempoMap,
    ) -> RegionBoundaries<'_> {
        if self.dirty || points != self.points {
            self.rebuild(regions, visible_tracks, points, tempo_map);
        }
        RegionBoundaries {
            domain: self.domain,
            boundaries: &self.boundaries,
        }
    }

    fn rebuild(
        &mut self,
        regions: &dyn RegionStore,
        visible_tracks: &[TrackId],
        points: BitFlags<RegionPoint>,
        tempo_map: &dyn TempoMap,
    ) {
        let domain = self.domain;
        self.boundaries = if points.is_empty() || visible_tracks.is_empty() {
            vec![]
        } else {
            regions
                .boundary_points_for(visible_tracks, points)
                .into_iter()
                .map(|p| p.in_domain(domain, tempo_map))
                .sorted_by_key(|p| p.units())
                .collect()
        };
        self.points = points;
        self.dirty = false;
        record_occurrence("timeline.region_boundary_cache.rebuild");
        tracing::debug!(
            msg = "Rebuilt region boundary cache",
            count = self.boundaries.len(),
            track_count = visible_tracks.len()
        );
    }
}

/// Read access to a built [`RegionBoundaryCache`].
#[derive(Copy, Clone, Debug)]
pub struct RegionBoundaries<'a> {
    domain: TimeDomain,
    boundaries: &'a [TimeValue],
}

impl<'a> RegionBoundaries<'a> {
    pub fn as_slice(&self) -> &'a [TimeValue] {
        self.boundaries
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// The boundary before and the boundary after `position`, in the domain of the cache.
    ///
    /// A boundary exactly at `position` counts as both, except for the "always" modes which
    /// look strictly before (down) or strictly after (up).
    pub fn candidates_around(
        &self,
        position: TimeValue,
        mode: RoundMode,
        tempo_map: &dyn TempoMap,
    ) -> (Option<TimeValue>, Option<TimeValue>) {
        let pos = position.in_domain(self.domain, tempo_map).units();
        // upper_bound
        let first_after = self.boundaries.partition_point(|b| b.units() <= pos);
        // lower_bound
        let first_at_or_after = self.boundaries.partition_point(|b| b.units() < pos);
        let before_end = if mode == RoundMode::DownAlways {
            first_at_or_after
        } else {
            first_after
        };
        let after_start = if mode == RoundMode::UpAlways {
            first_after
        } else {
            first_at_or_after
        };
        let before = before_end
            .checked_sub(1)
            .map(|i| self.boundaries[i]);
        let after = self.boundaries.get(after_start).copied();
        (before, after)
    }
}

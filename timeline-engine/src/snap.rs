use crate::conversion_util::{convert_pixel_distance_to_samples, SamplesPerPixel};
use crate::grid::{round_to_grid, GridContext};
use crate::{
    RegionBoundaryCache, RegionPoint, RulerScale, Session, SnapConfigSource, TempoMap, TimeValue,
};
use base::metrics_util::measure_time;
use enumflags2::{bitflags, BitFlags};
use timeline_api::{GridType, RoundMode, SnapMode, SnapPreference, TrackId};

/// Kinds of snap targets, in the order in which they compete.
#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CandidateFamily {
    Markers = 1 << 0,
    RegionBoundaries = 1 << 1,
    Grid = 1 << 2,
}

/// Decides which candidate families take part in a snap.
pub struct SnapPolicy;

impl SnapPolicy {
    pub fn families(
        preference: SnapPreference,
        config: &dyn SnapConfigSource,
        grid_type: GridType,
    ) -> BitFlags<CandidateFamily> {
        let mut families = BitFlags::empty();
        let grid_available = !grid_type.is_none();
        if preference.is_grid_only() {
            if grid_available {
                families |= CandidateFamily::Grid;
            }
            return families;
        }
        if config.snap_to_marks() {
            families |= CandidateFamily::Markers;
        }
        if !Self::region_points(config).is_empty() {
            families |= CandidateFamily::RegionBoundaries;
        }
        if config.snap_to_grid() && grid_available {
            families |= CandidateFamily::Grid;
        }
        families
    }

    pub fn region_points(config: &dyn SnapConfigSource) -> BitFlags<RegionPoint> {
        let mut points = BitFlags::empty();
        if config.snap_to_region_start() {
            points |= RegionPoint::Start;
        }
        if config.snap_to_region_end() {
            points |= RegionPoint::End;
        }
        if config.snap_to_region_sync() {
            points |= RegionPoint::Sync;
        }
        points
    }
}

/// Everything a snap needs to know about the editor at the moment of the call.
pub struct SnapContext<'a> {
    pub session: Option<&'a Session>,
    pub config: &'a dyn SnapConfigSource,
    pub grid_type: GridType,
    pub snap_mode: SnapMode,
    pub ruler_scale: RulerScale,
    pub zoom: SamplesPerPixel,
    pub visible_tracks: &'a [TrackId],
}

#[derive(Debug, Default)]
pub struct SnapEngine {
    region_boundaries: RegionBoundaryCache,
}

impl SnapEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region_boundary_cache(&self) -> &RegionBoundaryCache {
        &self.region_boundaries
    }

    pub fn invalidate_region_boundary_cache(&mut self) {
        self.region_boundaries.invalidate();
    }

    pub fn clear(&mut self) {
        self.region_boundaries.clear();
    }

    /// Snaps `position` to the closest enabled target.
    ///
    /// Returns `position` unchanged if snapping is off (unless forced), nothing qualifies or the
    /// winner is farther away than the magnetic threshold (unless forced). The result is always
    /// in the domain of `position`.
    pub fn snap(
        &mut self,
        ctx: &SnapContext,
        position: TimeValue,
        mode: RoundMode,
        preference: SnapPreference,
        force: bool,
    ) -> TimeValue {
        measure_time("timeline.snap", || {
            self.snap_internal(ctx, position, mode, preference, force)
        })
    }

    fn snap_internal(
        &mut self,
        ctx: &SnapContext,
        position: TimeValue,
        mode: RoundMode,
        preference: SnapPreference,
        force: bool,
    ) -> TimeValue {
        let Some(session) = ctx.session else {
            return position;
        };
        if ctx.snap_mode == SnapMode::Off && !force {
            return position;
        }
        let tempo_map = session.tempo_map.as_ref();
        let families = SnapPolicy::families(preference, ctx.config, ctx.grid_type);
        let mut tournament = Tournament::new(position, tempo_map);
        if families.contains(CandidateFamily::Markers) {
            // Markers exactly at the position must not win in the "always" modes.
            let query_position = if mode.is_always() {
                position.nudged(i64::from(mode.direction()))
            } else {
                position
            };
            let (before, after) = session.locations.nearest_markers(query_position, tempo_map);
            tournament.consider(select(position, before, after, mode, tempo_map));
        }
        if families.contains(CandidateFamily::RegionBoundaries) {
            let boundaries = self.region_boundaries.ensure_built(
                session.regions.as_ref(),
                ctx.visible_tracks,
                SnapPolicy::region_points(ctx.config),
                tempo_map,
            );
            let (before, after) = boundaries.candidates_around(position, mode, tempo_map);
            tournament.consider(select(position, before, after, mode, tempo_map));
        }
        if families.contains(CandidateFamily::Grid) {
            let grid_ctx = GridContext {
                tempo_map,
                timecode: &session.timecode,
                ruler_scale: ctx.ruler_scale,
            };
            tournament.consider(round_to_grid(
                position,
                mode,
                ctx.grid_type,
                preference,
                &grid_ctx,
            ));
        }
        let Some(best) = tournament.winner() else {
            return position;
        };
        if !force {
            let threshold = convert_pixel_distance_to_samples(
                ctx.config.snap_threshold_pixels(),
                ctx.zoom,
            );
            let distance = (best.to_samples(tempo_map) - position.to_samples(tempo_map)).abs();
            if distance > threshold {
                tracing::trace!(
                    msg = "Snap candidate beyond threshold",
                    %position,
                    %best,
                    %distance,
                    %threshold
                );
                return position;
            }
        }
        tracing::trace!(msg = "Snapped", %position, %best, ?mode, ?preference);
        best
    }
}

/// Picks one of the neighbours according to the rounding direction.
///
/// Ties in nearest mode go to the earlier neighbour.
fn select(
    position: TimeValue,
    before: Option<TimeValue>,
    after: Option<TimeValue>,
    mode: RoundMode,
    tempo_map: &dyn TempoMap,
) -> Option<TimeValue> {
    let direction = mode.direction();
    if direction < 0 {
        return before;
    }
    if direction > 0 {
        return after;
    }
    match (before, after) {
        (Some(b), Some(a)) => {
            let to_before = position.distance_via(&b, tempo_map).abs().units();
            let to_after = position.distance_via(&a, tempo_map).abs().units();
            if to_before <= to_after {
                Some(b)
            } else {
                Some(a)
            }
        }
        (b, None) => b,
        (None, a) => a,
    }
}

/// Keeps the candidate closest to the raw position. Earlier candidates win ties.
struct Tournament<'a> {
    position: TimeValue,
    tempo_map: &'a dyn TempoMap,
    best: TimeValue,
    best_distance: i64,
}

impl<'a> Tournament<'a> {
    fn new(position: TimeValue, tempo_map: &'a dyn TempoMap) -> Self {
        let best = TimeValue::max(position.domain());
        Self {
            position,
            tempo_map,
            best,
            best_distance: best.units(),
        }
    }

    fn consider(&mut self, candidate: Option<TimeValue>) {
        let Some(candidate) = candidate else {
            return;
        };
        let candidate = candidate.in_domain(self.position.domain(), self.tempo_map);
        let distance = self
            .position
            .distance_via(&candidate, self.tempo_map)
            .abs()
            .units();
        if distance < self.best_distance {
            self.best = candidate;
            self.best_distance = distance;
        }
    }

    fn winner(&self) -> Option<TimeValue> {
        if self.best.is_max() {
            None
        } else {
            Some(self.best)
        }
    }
}

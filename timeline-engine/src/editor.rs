use crate::conversion_util::{
    convert_pixels_to_samples, convert_samples_to_pixels_unrounded, SamplesPerPixel,
};
use crate::{
    rulers_following_grid, ControlScroll, DisplaySurface, IdleScheduler, RulerKind, RulerScale,
    RulerScaleResolver, Samples, Session, SessionEvent, SnapConfigSource, SnapContext, SnapEngine,
    TimeValue, VisualChange, VisualChangeKind, VisualChangeScheduler,
};
use base::metrics_util::measure_time;
use base::UiInbox;
use enumflags2::BitFlags;
use std::rc::Rc;
use timeline_api::{GridType, RoundMode, SnapMode, SnapPreference, TrackId};

/// What is currently visible.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ViewState {
    pub zoom: SamplesPerPixel,
    pub leftmost_sample: Samples,
    /// Vertical origin in pixels.
    pub y_origin: f64,
    /// Width of the track canvas in pixels.
    pub visible_canvas_width: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom: SamplesPerPixel::default(),
            leftmost_sample: Samples::ZERO,
            y_origin: 0.0,
            visible_canvas_width: 0.0,
        }
    }
}

impl ViewState {
    /// Number of samples covered by the visible canvas.
    pub fn page_samples(&self) -> Samples {
        convert_pixels_to_samples(self.visible_canvas_width, self.zoom)
    }
}

/// The timeline part of an editor window.
///
/// Lives in the UI context. Engine-side notifications reach it through
/// [`TimelineEditor::drain_session_events`].
pub struct TimelineEditor<S: DisplaySurface> {
    config: Rc<dyn SnapConfigSource>,
    session: Option<Session>,
    grid_type: GridType,
    snap_mode: SnapMode,
    view: ViewState,
    ruler_scale: RulerScale,
    visible_rulers: BitFlags<RulerKind>,
    visible_tracks: Vec<TrackId>,
    snap_engine: SnapEngine,
    visual_changes: VisualChangeScheduler,
    control_scroll: ControlScroll,
    surface: S,
}

impl<S: DisplaySurface> TimelineEditor<S> {
    pub fn new(config: Rc<dyn SnapConfigSource>, idle: Rc<dyn IdleScheduler>, surface: S) -> Self {
        Self {
            config,
            session: None,
            grid_type: GridType::default(),
            snap_mode: SnapMode::default(),
            view: ViewState::default(),
            ruler_scale: RulerScale::None,
            visible_rulers: RulerKind::Timecode | RulerKind::Bbt,
            visible_tracks: vec![],
            snap_engine: SnapEngine::new(),
            visual_changes: VisualChangeScheduler::new(idle),
            control_scroll: ControlScroll::default(),
            surface,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn set_session(&mut self, session: Session) {
        tracing::debug!(msg = "Session set", ?session);
        self.session = Some(session);
        self.snap_engine.clear();
        self.recompute_ruler_scale();
        self.surface.redraw_grid();
    }

    pub fn close_session(&mut self) {
        tracing::debug!(msg = "Session closed");
        self.session = None;
        self.snap_engine.clear();
        self.control_scroll.take_target();
        self.ruler_scale = RulerScale::None;
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn ruler_scale(&self) -> RulerScale {
        self.ruler_scale
    }

    pub fn visible_rulers(&self) -> BitFlags<RulerKind> {
        self.visible_rulers
    }

    pub fn set_visible_rulers(&mut self, rulers: BitFlags<RulerKind>) {
        self.visible_rulers = rulers;
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Another handle to the scheduler, e.g. for display code which wants to request changes.
    pub fn visual_changes(&self) -> VisualChangeScheduler {
        self.visual_changes.clone()
    }

    pub fn snap_engine(&self) -> &SnapEngine {
        &self.snap_engine
    }

    pub fn snap_position(
        &mut self,
        raw: TimeValue,
        mode: RoundMode,
        preference: SnapPreference,
        force: bool,
    ) -> TimeValue {
        let ctx = SnapContext {
            session: self.session.as_ref(),
            config: self.config.as_ref(),
            grid_type: self.grid_type,
            snap_mode: self.snap_mode,
            ruler_scale: self.ruler_scale,
            zoom: self.view.zoom,
            visible_tracks: &self.visible_tracks,
        };
        self.snap_engine.snap(&ctx, raw, mode, preference, force)
    }

    pub fn request_zoom(&self, zoom: SamplesPerPixel) {
        self.visual_changes.request_zoom(zoom);
    }

    pub fn request_scroll_x(&self, leftmost_sample: Samples) {
        self.visual_changes
            .request_time_origin(Samples::new(leftmost_sample.get().max(0)));
    }

    pub fn request_scroll_y(&self, y_origin: f64) {
        self.visual_changes.request_y_origin(y_origin.max(0.0));
    }

    pub fn request_auxiliary_redraw(&self) {
        self.visual_changes.request_auxiliary_redraw();
    }

    pub fn invalidate_region_boundary_cache(&mut self) {
        self.snap_engine.invalidate_region_boundary_cache();
    }

    /// The deferred apply, to be called from the idle callback.
    ///
    /// Returns `false` if there was nothing to apply.
    pub fn run_idle(&mut self) -> bool {
        let scheduler = self.visual_changes.clone();
        scheduler.run(|change| {
            measure_time("timeline.visual_change.apply", || {
                self.apply_visual_change(change)
            })
        })
    }

    fn apply_visual_change(&mut self, change: &VisualChange) {
        let pending = change.pending;
        if pending.contains(VisualChangeKind::ZoomLevel) {
            self.view.zoom = change.zoom;
            self.surface.apply_zoom(change.zoom);
        }
        if pending.contains(VisualChangeKind::TimeOrigin) {
            self.view.leftmost_sample = change.time_origin;
            let x = convert_samples_to_pixels_unrounded(change.time_origin, self.view.zoom);
            self.surface.apply_scroll(Some(x), None);
        }
        if pending.contains(VisualChangeKind::YOrigin) {
            self.view.y_origin = change.y_origin;
            self.surface.apply_scroll(None, Some(change.y_origin));
        }
        if pending.contains(VisualChangeKind::ZoomLevel) {
            self.recompute_ruler_scale();
            self.surface.redraw_grid();
        } else if pending
            .intersects(VisualChangeKind::TimeOrigin | VisualChangeKind::AuxiliaryRedraw)
        {
            self.surface.prepare_for_render();
        }
        if pending.contains(VisualChangeKind::AuxiliaryRedraw) {
            self.surface.redraw_auxiliary();
        }
        tracing::debug!(
            msg = "Applied visual change",
            ?pending,
            zoom = %self.view.zoom,
            leftmost_sample = %self.view.leftmost_sample,
            ruler_scale = %self.ruler_scale
        );
    }

    fn recompute_ruler_scale(&mut self) {
        self.ruler_scale = match &self.session {
            None => RulerScale::None,
            Some(session) => {
                let resolver =
                    RulerScaleResolver::new(session.tempo_map.as_ref(), &session.timecode);
                let start = self.view.leftmost_sample;
                let end = start + self.view.page_samples();
                resolver.resolve(self.grid_type, self.view.zoom, start, end)
            }
        };
    }

    pub fn grid_type(&self) -> GridType {
        self.grid_type
    }

    pub fn set_grid_type(&mut self, grid_type: GridType) {
        self.grid_type = grid_type;
        self.snap_engine.invalidate_region_boundary_cache();
        if self.config.rulers_follow_grid() {
            if let Some(rulers) = rulers_following_grid(grid_type) {
                self.visible_rulers = rulers;
            }
        }
        self.recompute_ruler_scale();
        self.surface.redraw_grid();
    }

    pub fn cycle_grid(&mut self, forward: bool) {
        let next = if forward {
            self.grid_type.next_grid_choice()
        } else {
            self.grid_type.prev_grid_choice()
        };
        self.set_grid_type(next);
    }

    pub fn snap_mode(&self) -> SnapMode {
        self.snap_mode
    }

    pub fn set_snap_mode(&mut self, snap_mode: SnapMode) {
        self.snap_mode = snap_mode;
    }

    pub fn cycle_snap_mode(&mut self) {
        self.snap_mode = self.snap_mode.cycle();
    }

    pub fn set_visible_tracks(&mut self, tracks: Vec<TrackId>) {
        self.visible_tracks = tracks;
        self.snap_engine.invalidate_region_boundary_cache();
    }

    pub fn set_visible_canvas_width(&mut self, width: f64) {
        self.view.visible_canvas_width = width.max(0.0);
        self.recompute_ruler_scale();
    }

    /// Halves (zoom in) or doubles (zoom out) the samples per pixel, starting from a pending
    /// zoom if there is one.
    pub fn zoom_step(&self, zoom_in: bool) {
        let current = self
            .visual_changes
            .pending_zoom()
            .unwrap_or(self.view.zoom)
            .get();
        let next = if zoom_in {
            current / 2
        } else {
            current.saturating_mul(2)
        };
        self.request_zoom(SamplesPerPixel::clamped(next));
    }

    /// The next (or previous) grid line, strictly beyond `playhead`.
    pub fn playhead_to_grid(&mut self, playhead: TimeValue, forward: bool) -> TimeValue {
        let mode = if forward {
            RoundMode::UpAlways
        } else {
            RoundMode::DownAlways
        };
        self.snap_position(playhead, mode, SnapPreference::GridScaled, true)
    }

    /// Scrolls by a fraction of the visible page, e.g. from a jog wheel.
    ///
    /// Nothing is requested here. The accumulated target is consumed by the next
    /// [`TimelineEditor::on_rapid_tick`].
    pub fn control_scroll(&mut self, fraction: f64) {
        if self.session.is_none() {
            return;
        }
        let step = (self.view.page_samples().get() as f64 * fraction).trunc() as i64;
        self.control_scroll
            .scroll_by(self.view.leftmost_sample, Samples::new(step));
    }

    pub fn on_rapid_tick(&mut self) {
        let target = self.control_scroll.take_target();
        self.scroll_to_control_target(target);
    }

    fn scroll_to_control_target(&mut self, target: Option<TimeValue>) {
        let (Some(target), Some(session)) = (target, &self.session) else {
            return;
        };
        let samples = target.to_samples(session.tempo_map.as_ref());
        self.request_scroll_x(samples);
    }

    pub fn handle_session_event(&mut self, event: SessionEvent) {
        tracing::debug!(msg = "Handling session event", ?event);
        match event {
            SessionEvent::RegionsChanged => {
                self.snap_engine.invalidate_region_boundary_cache();
            }
            SessionEvent::TempoMapChanged(tempo_map) => {
                let Some(session) = &mut self.session else {
                    return;
                };
                session.tempo_map = tempo_map;
                self.snap_engine.invalidate_region_boundary_cache();
                self.recompute_ruler_scale();
                self.surface.redraw_grid();
            }
            SessionEvent::TimecodeChanged(timecode) => {
                let Some(session) = &mut self.session else {
                    return;
                };
                session.timecode = timecode;
                self.recompute_ruler_scale();
                self.surface.redraw_grid();
            }
        }
    }

    /// Processes all events which were dispatched to the UI context so far.
    pub fn drain_session_events(&mut self, inbox: &UiInbox<SessionEvent>) {
        for event in inbox.drain() {
            self.handle_session_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BbtScale, ClockScale, EditorConfig, LocationStore, RegionPoint, RegionStore,
        StaticTempoMap, TempoMap, TimecodeSettings,
    };
    use approx::assert_abs_diff_eq;
    use base::ui_dispatch_channel;
    use std::cell::Cell;
    use std::sync::Arc;
    use timeline_api::{Bpm, Hz, TimeSignature, TimecodeFormat};

    #[derive(Clone, PartialEq, Debug)]
    enum SurfaceCall {
        Zoom(SamplesPerPixel),
        Scroll(Option<f64>, Option<f64>),
        RedrawGrid,
        PrepareForRender,
        RedrawAuxiliary,
    }

    #[derive(Default)]
    struct RecordingSurface {
        calls: Vec<SurfaceCall>,
        /// Requests this y origin whenever a zoom is applied.
        follow_up: Option<(VisualChangeScheduler, f64)>,
    }

    impl RecordingSurface {
        fn take_calls(&mut self) -> Vec<SurfaceCall> {
            std::mem::take(&mut self.calls)
        }
    }

    impl DisplaySurface for RecordingSurface {
        fn apply_zoom(&mut self, zoom: SamplesPerPixel) {
            self.calls.push(SurfaceCall::Zoom(zoom));
            if let Some((scheduler, y)) = &self.follow_up {
                scheduler.request_y_origin(*y);
            }
        }

        fn apply_scroll(&mut self, x: Option<f64>, y: Option<f64>) {
            self.calls.push(SurfaceCall::Scroll(x, y));
        }

        fn redraw_grid(&mut self) {
            self.calls.push(SurfaceCall::RedrawGrid);
        }

        fn prepare_for_render(&mut self) {
            self.calls.push(SurfaceCall::PrepareForRender);
        }

        fn redraw_auxiliary(&mut self) {
            self.calls.push(SurfaceCall::RedrawAuxiliary);
        }
    }

    #[derive(Default)]
    struct CountingIdle {
        count: Cell<u32>,
    }

    impl IdleScheduler for CountingIdle {
        fn schedule_idle(&self) {
            self.count.set(self.count.get() + 1);
        }
    }

    struct MarkerList(Vec<Samples>);

    impl LocationStore for MarkerList {
        fn nearest_markers(
            &self,
            position: TimeValue,
            tempo_map: &dyn TempoMap,
        ) -> (Option<TimeValue>, Option<TimeValue>) {
            let pos = position.to_samples(tempo_map);
            let before = self.0.iter().copied().filter(|m| *m <= pos).max();
            let after = self.0.iter().copied().filter(|m| *m >= pos).min();
            (before.map(TimeValue::from), after.map(TimeValue::from))
        }
    }

    /// Regions per track, plus a query counter.
    #[derive(Default)]
    struct RegionList {
        regions: Vec<(TrackId, Samples, Samples)>,
        queries: Cell<u32>,
    }

    impl RegionStore for RegionList {
        fn boundary_points_for(
            &self,
            tracks: &[TrackId],
            points: BitFlags<RegionPoint>,
        ) -> Vec<TimeValue> {
            self.queries.set(self.queries.get() + 1);
            let mut result = vec![];
            for (track, start, end) in &self.regions {
                if !tracks.contains(track) {
                    continue;
                }
                if points.contains(RegionPoint::Start) {
                    result.push(TimeValue::from(*start));
                }
                if points.contains(RegionPoint::End) {
                    result.push(TimeValue::from(*end));
                }
            }
            result
        }
    }

    struct Fixture {
        editor: TimelineEditor<RecordingSurface>,
        idle: Rc<CountingIdle>,
        regions: Rc<RegionList>,
    }

    fn fixture_with_config(config: EditorConfig) -> Fixture {
        let idle = Rc::new(CountingIdle::default());
        let regions = Rc::new(RegionList {
            regions: vec![
                (TrackId::new("a"), Samples::new(0), Samples::new(100)),
                (TrackId::new("a"), Samples::new(100), Samples::new(250)),
            ],
            queries: Cell::new(0),
        });
        let session = Session {
            tempo_map: Arc::new(StaticTempoMap::default()),
            locations: Rc::new(MarkerList(vec![Samples::new(48_000)])),
            regions: regions.clone(),
            timecode: TimecodeSettings::default(),
        };
        let mut editor =
            TimelineEditor::new(Rc::new(config), idle.clone(), RecordingSurface::default());
        editor.set_session(session);
        editor.set_visible_tracks(vec![TrackId::new("a")]);
        editor.set_visible_canvas_width(1000.0);
        editor.surface_mut().take_calls();
        Fixture {
            editor,
            idle,
            regions,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_config(EditorConfig::default())
    }

    fn slow_tempo_map() -> Arc<dyn TempoMap> {
        Arc::new(StaticTempoMap::constant(
            Hz::default(),
            Bpm::new(60.0).unwrap(),
            TimeSignature::default(),
        ))
    }

    fn zoom(value: i64) -> SamplesPerPixel {
        SamplesPerPixel::new(value).unwrap()
    }

    fn s(value: i64) -> TimeValue {
        TimeValue::Linear(Samples::new(value))
    }

    #[test]
    fn coalesce_zoom_and_scroll() {
        // Given
        let mut f = fixture();
        // When
        f.editor.request_zoom(zoom(100));
        f.editor.request_zoom(zoom(200));
        f.editor.request_scroll_x(Samples::new(48_000));
        // Then
        assert_eq!(f.idle.count.get(), 1);
        assert!(f.editor.run_idle());
        assert_eq!(
            f.editor.surface_mut().take_calls(),
            vec![
                SurfaceCall::Zoom(zoom(200)),
                SurfaceCall::Scroll(Some(240.0), None),
                SurfaceCall::RedrawGrid,
            ]
        );
        assert_eq!(f.editor.view().zoom, zoom(200));
        assert_eq!(f.editor.view().leftmost_sample, Samples::new(48_000));
        assert!(!f.editor.run_idle());
    }

    #[test]
    fn horizontal_scroll_prepares_for_render() {
        // Given
        let mut f = fixture();
        // When
        f.editor.request_scroll_x(Samples::new(2560));
        f.editor.run_idle();
        // Then
        let calls = f.editor.surface_mut().take_calls();
        assert_eq!(calls.len(), 2);
        let SurfaceCall::Scroll(Some(x), None) = calls[0] else {
            panic!("expected horizontal scroll, got {:?}", calls[0]);
        };
        assert_abs_diff_eq!(x, 10.0);
        assert_eq!(calls[1], SurfaceCall::PrepareForRender);
    }

    #[test]
    fn vertical_scroll_only_skips_render_preparation() {
        // Given
        let mut f = fixture();
        // When
        f.editor.request_scroll_y(30.0);
        f.editor.run_idle();
        // Then
        assert_eq!(
            f.editor.surface_mut().take_calls(),
            vec![SurfaceCall::Scroll(None, Some(30.0))]
        );
        assert_eq!(f.editor.view().y_origin, 30.0);
    }

    #[test]
    fn auxiliary_redraw() {
        // Given
        let mut f = fixture();
        // When
        f.editor.request_auxiliary_redraw();
        f.editor.run_idle();
        // Then
        assert_eq!(
            f.editor.surface_mut().take_calls(),
            vec![SurfaceCall::PrepareForRender, SurfaceCall::RedrawAuxiliary]
        );
    }

    #[test]
    fn requests_from_surface_land_in_next_cycle() {
        // Given
        let mut f = fixture();
        let scheduler = f.editor.visual_changes();
        f.editor.surface_mut().follow_up = Some((scheduler, 12.0));
        f.editor.request_zoom(zoom(512));
        // When
        f.editor.run_idle();
        let first_cycle = f.editor.surface_mut().take_calls();
        f.editor.surface_mut().follow_up = None;
        f.editor.run_idle();
        let second_cycle = f.editor.surface_mut().take_calls();
        // Then
        assert_eq!(
            first_cycle,
            vec![SurfaceCall::Zoom(zoom(512)), SurfaceCall::RedrawGrid]
        );
        assert_eq!(second_cycle, vec![SurfaceCall::Scroll(None, Some(12.0))]);
        assert_eq!(f.idle.count.get(), 2);
    }

    #[test]
    fn zoom_recomputes_ruler_scale() {
        // Given
        let mut f = fixture();
        f.editor.set_grid_type(GridType::MinSec);
        // When
        f.editor.request_zoom(zoom(1));
        f.editor.run_idle();
        let fine = f.editor.ruler_scale();
        f.editor.request_zoom(zoom(1 << 20));
        f.editor.run_idle();
        let coarse = f.editor.ruler_scale();
        // Then
        assert_eq!(fine, RulerScale::Clock(ClockScale::Milliseconds));
        assert_eq!(coarse, RulerScale::Clock(ClockScale::Hours));
    }

    #[test]
    fn snap_to_region_boundary() {
        // Given
        let mut f = fixture();
        f.editor.request_zoom(zoom(1));
        f.editor.run_idle();
        // When
        let snapped = f.editor.snap_position(
            s(110),
            RoundMode::Nearest,
            SnapPreference::AnyVisual,
            false,
        );
        // Then
        assert_eq!(snapped, s(100));
    }

    #[test]
    fn region_cache_invalidation() {
        // Given
        let mut f = fixture();
        let snap = |f: &mut Fixture| {
            f.editor
                .snap_position(s(110), RoundMode::Nearest, SnapPreference::AnyVisual, false)
        };
        // When
        snap(&mut f);
        snap(&mut f);
        let queries_before = f.regions.queries.get();
        f.editor.invalidate_region_boundary_cache();
        snap(&mut f);
        f.editor.handle_session_event(SessionEvent::RegionsChanged);
        snap(&mut f);
        f.editor.set_visible_tracks(vec![TrackId::new("a")]);
        snap(&mut f);
        // Then
        assert_eq!(queries_before, 1);
        assert_eq!(f.regions.queries.get(), 4);
    }

    #[test]
    fn bar_grid_snapping() {
        // Given
        let mut f = fixture();
        f.editor.set_grid_type(GridType::Bar);
        // When
        // Bar 3 beat 2.5 and bar 3 beat 3.5
        let early = f.editor.snap_position(
            s(2 * 96_000 + 36_000),
            RoundMode::Nearest,
            SnapPreference::GridUnscaled,
            true,
        );
        let late = f.editor.snap_position(
            s(2 * 96_000 + 60_000),
            RoundMode::Nearest,
            SnapPreference::GridUnscaled,
            true,
        );
        // Then
        assert_eq!(early, s(192_000));
        assert_eq!(late, s(288_000));
    }

    #[test]
    fn playhead_to_grid_moves_strictly() {
        // Given
        let mut f = fixture();
        f.editor.set_grid_type(GridType::Bar);
        // When
        let forward = f.editor.playhead_to_grid(s(96_000), true);
        let backward = f.editor.playhead_to_grid(s(96_000), false);
        // Then
        assert_eq!(forward, s(192_000));
        assert_eq!(backward, s(0));
    }

    #[test]
    fn snap_mode_off_returns_raw_position() {
        // Given
        let mut f = fixture();
        f.editor.set_snap_mode(SnapMode::Off);
        // When
        let snapped =
            f.editor
                .snap_position(s(110), RoundMode::Nearest, SnapPreference::AnyVisual, false);
        // Then
        assert_eq!(snapped, s(110));
        f.editor.cycle_snap_mode();
        assert_eq!(f.editor.snap_mode(), SnapMode::Magnetic);
    }

    #[test]
    fn closed_session_returns_raw_position() {
        // Given
        let mut f = fixture();
        f.editor.close_session();
        // When
        let snapped =
            f.editor
                .snap_position(s(110), RoundMode::Nearest, SnapPreference::AnyVisual, true);
        // Then
        assert_eq!(snapped, s(110));
        assert_eq!(f.editor.ruler_scale(), RulerScale::None);
        assert!(f.editor.snap_engine().region_boundary_cache().is_dirty());
    }

    #[test]
    fn grid_type_changes() {
        // Given
        let mut config = EditorConfig::default();
        config.set_rulers_follow_grid(true);
        let mut f = fixture_with_config(config);
        // When
        f.editor.set_grid_type(GridType::CdFrame);
        // Then
        assert_eq!(
            f.editor.visible_rulers(),
            RulerKind::MinSec | RulerKind::CdMarkers
        );
        assert!(matches!(
            f.editor.ruler_scale(),
            RulerScale::Clock(ClockScale::CdFrames | ClockScale::Seconds)
        ));
        assert!(f.editor.snap_engine().region_boundary_cache().is_dirty());
        assert_eq!(
            f.editor.surface_mut().take_calls(),
            vec![SurfaceCall::RedrawGrid]
        );
    }

    #[test]
    fn rulers_stay_when_not_following_grid() {
        let mut f = fixture();
        let before = f.editor.visible_rulers();
        f.editor.set_grid_type(GridType::MinSec);
        assert_eq!(f.editor.visible_rulers(), before);
    }

    #[test]
    fn cycle_grid() {
        // Given
        let mut f = fixture();
        // When
        f.editor.cycle_grid(true);
        f.editor.cycle_grid(true);
        // Then
        assert_eq!(f.editor.grid_type(), GridType::Beat);
        assert!(matches!(f.editor.ruler_scale(), RulerScale::Bbt(_)));
        f.editor.cycle_grid(false);
        assert_eq!(f.editor.grid_type(), GridType::Bar);
    }

    #[test]
    fn musical_ruler_scale_follows_zoom() {
        // Given
        let mut f = fixture();
        f.editor.set_grid_type(GridType::BeatDiv16);
        // When
        f.editor.request_zoom(zoom(10));
        f.editor.run_idle();
        // Then
        // A quarter spans 2400 px, so even 1/128 notes are legible.
        assert_eq!(
            f.editor.ruler_scale(),
            RulerScale::Bbt(BbtScale::OneTwentyEighths)
        );
    }

    #[test]
    fn zoom_step_builds_on_pending_zoom() {
        // Given
        let mut f = fixture();
        f.editor.request_zoom(zoom(1000));
        // When
        f.editor.zoom_step(true);
        f.editor.zoom_step(true);
        f.editor.run_idle();
        f.editor.zoom_step(false);
        f.editor.run_idle();
        // Then
        assert_eq!(f.editor.view().zoom, zoom(500));
        assert_eq!(f.idle.count.get(), 2);
    }

    #[test]
    fn zoom_step_is_clamped() {
        let mut f = fixture();
        f.editor.request_zoom(SamplesPerPixel::MIN);
        f.editor.zoom_step(true);
        f.editor.run_idle();
        assert_eq!(f.editor.view().zoom, SamplesPerPixel::MIN);
    }

    #[test]
    fn control_scroll_is_consumed_by_tick() {
        // Given
        let mut f = fixture();
        f.editor.request_zoom(zoom(10));
        f.editor.run_idle();
        f.editor.surface_mut().take_calls();
        // When
        f.editor.control_scroll(0.5);
        f.editor.control_scroll(0.5);
        f.editor.on_rapid_tick();
        f.editor.on_rapid_tick();
        f.editor.run_idle();
        // Then
        assert_eq!(f.editor.view().leftmost_sample, Samples::new(10_000));
        assert_eq!(f.idle.count.get(), 2);
    }

    #[test]
    fn control_scroll_without_session_does_nothing() {
        let mut f = fixture();
        f.editor.close_session();
        f.editor.control_scroll(1.0);
        f.editor.on_rapid_tick();
        assert!(!f.editor.run_idle());
    }

    #[test]
    fn session_events_via_ui_dispatch() {
        // Given
        let mut f = fixture();
        f.editor.set_grid_type(GridType::Timecode);
        f.editor.surface_mut().take_calls();
        let (dispatcher, inbox) = ui_dispatch_channel("session events");
        let timecode = TimecodeSettings {
            format: TimecodeFormat::Fps25,
            ..TimecodeSettings::default()
        };
        // When
        let engine_thread = std::thread::spawn(move || {
            dispatcher.dispatch(SessionEvent::RegionsChanged);
            dispatcher.dispatch(SessionEvent::TimecodeChanged(timecode));
            dispatcher.dispatch(SessionEvent::TempoMapChanged(slow_tempo_map()));
        });
        engine_thread.join().unwrap();
        f.editor.drain_session_events(&inbox);
        // Then
        let session = f.editor.session().unwrap();
        assert_eq!(session.timecode.format, TimecodeFormat::Fps25);
        assert_eq!(
            session.tempo_map.to_samples(crate::Beats::from_quarters(1)),
            Samples::new(48_000)
        );
        assert!(f.editor.snap_engine().region_boundary_cache().is_dirty());
        assert_eq!(
            f.editor.surface_mut().take_calls(),
            vec![SurfaceCall::RedrawGrid, SurfaceCall::RedrawGrid]
        );
    }

    #[test]
    fn tempo_map_change_replaces_snapshot() {
        // Given
        let mut f = fixture();
        f.editor.set_grid_type(GridType::Bar);
        let snap = |f: &mut Fixture| {
            f.editor.snap_position(
                s(100_000),
                RoundMode::Nearest,
                SnapPreference::GridUnscaled,
                true,
            )
        };
        let before = snap(&mut f);
        f.editor.surface_mut().take_calls();
        // When
        f.editor
            .handle_session_event(SessionEvent::TempoMapChanged(slow_tempo_map()));
        let after = snap(&mut f);
        // Then
        // One 4/4 bar takes 2 s at 120 BPM and 4 s at 60 BPM.
        assert_eq!(before, s(96_000));
        assert_eq!(after, s(192_000));
        assert_eq!(
            f.editor.surface_mut().take_calls(),
            vec![SurfaceCall::RedrawGrid]
        );
    }

    #[test]
    fn tempo_map_change_without_session_is_ignored() {
        let mut f = fixture();
        f.editor.close_session();
        f.editor
            .handle_session_event(SessionEvent::TempoMapChanged(slow_tempo_map()));
        assert!(f.editor.session().is_none());
        assert!(f.editor.surface_mut().take_calls().is_empty());
    }

    /// Snap preferences which the host changes behind the editor's back.
    struct LiveConfig {
        sync: Cell<bool>,
    }

    impl SnapConfigSource for LiveConfig {
        fn snap_to_grid(&self) -> bool {
            false
        }

        fn snap_to_marks(&self) -> bool {
            false
        }

        fn snap_to_region_start(&self) -> bool {
            true
        }

        fn snap_to_region_end(&self) -> bool {
            true
        }

        fn snap_to_region_sync(&self) -> bool {
            self.sync.get()
        }

        fn snap_threshold_pixels(&self) -> u32 {
            25
        }

        fn rulers_follow_grid(&self) -> bool {
            false
        }
    }

    /// One region from 0 to 10000 with its sync point at 5000.
    struct SyncedRegion;

    impl RegionStore for SyncedRegion {
        fn boundary_points_for(
            &self,
            _: &[TrackId],
            points: BitFlags<RegionPoint>,
        ) -> Vec<TimeValue> {
            let mut result = vec![];
            if points.contains(RegionPoint::Start) {
                result.push(s(0));
            }
            if points.contains(RegionPoint::End) {
                result.push(s(10_000));
            }
            if points.contains(RegionPoint::Sync) {
                result.push(s(5000));
            }
            result
        }
    }

    #[test]
    fn region_points_follow_live_config() {
        // Given
        let config = Rc::new(LiveConfig {
            sync: Cell::new(false),
        });
        let mut editor = TimelineEditor::new(
            config.clone(),
            Rc::new(CountingIdle::default()),
            RecordingSurface::default(),
        );
        editor.set_session(Session {
            tempo_map: Arc::new(StaticTempoMap::default()),
            locations: Rc::new(MarkerList(vec![])),
            regions: Rc::new(SyncedRegion),
            timecode: TimecodeSettings::default(),
        });
        editor.set_visible_tracks(vec![TrackId::new("a")]);
        let mut snap = || {
            editor.snap_position(s(5100), RoundMode::Nearest, SnapPreference::AnyVisual, true)
        };
        // When
        let before = snap();
        config.sync.set(true);
        let after_enabling_sync = snap();
        config.sync.set(false);
        let after_disabling_sync = snap();
        // Then
        assert_eq!(before, s(10_000));
        assert_eq!(after_enabling_sync, s(5000));
        assert_eq!(after_disabling_sync, s(10_000));
    }

    #[test]
    fn negative_scroll_is_clamped() {
        let mut f = fixture();
        f.editor.request_scroll_x(Samples::new(-100));
        f.editor.request_scroll_y(-5.0);
        f.editor.run_idle();
        assert_eq!(f.editor.view().leftmost_sample, Samples::ZERO);
        assert_eq!(f.editor.view().y_origin, 0.0);
    }

    #[test]
    fn markers_take_part() {
        // Given
        let mut f = fixture();
        // When
        let snapped: Vec<_> = [47_990, 48_000, 48_010]
            .into_iter()
            .map(|raw| {
                f.editor
                    .snap_position(s(raw), RoundMode::Nearest, SnapPreference::AnyVisual, false)
            })
            .collect();
        // Then
        assert_eq!(snapped, vec![s(48_000); 3]);
    }
}

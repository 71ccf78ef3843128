use crate::conversion_util::SamplesPerPixel;
use crate::Samples;
use enumflags2::{bitflags, BitFlags};
use std::cell::RefCell;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::mem;
use std::rc::Rc;

#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum VisualChangeKind {
    ZoomLevel = 1 << 0,
    TimeOrigin = 1 << 1,
    YOrigin = 1 << 2,
    AuxiliaryRedraw = 1 << 3,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SchedulerState {
    /// Nothing pending.
    Idle,
    /// Pending changes exist and exactly one idle callback is scheduled.
    Armed,
    /// The idle callback is applying a snapshot.
    Applying,
}

/// The pending dimensions. Values of dimensions not contained in `pending` are meaningless.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct VisualChange {
    pub pending: BitFlags<VisualChangeKind>,
    pub zoom: SamplesPerPixel,
    pub time_origin: Samples,
    pub y_origin: f64,
}

/// Hook into the UI event loop.
pub trait IdleScheduler {
    /// Arranges for [`VisualChangeScheduler::run`] to be called once the event loop is idle.
    fn schedule_idle(&self);
}

/// Coalesces view changes into at most one idle callback.
///
/// Cloning gives another handle to the same scheduler, so display code can request changes
/// while a change is being applied. Such requests are deferred to the next cycle.
#[derive(Clone)]
pub struct VisualChangeScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
    idle: Rc<dyn IdleScheduler>,
}

#[derive(Debug)]
struct SchedulerInner {
    state: SchedulerState,
    change: VisualChange,
}

impl Debug for VisualChangeScheduler {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualChangeScheduler")
            .field("inner", &self.inner.borrow())
            .finish()
    }
}

impl VisualChangeScheduler {
    pub fn new(idle: Rc<dyn IdleScheduler>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                state: SchedulerState::Idle,
                change: VisualChange::default(),
            })),
            idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.inner.borrow().state
    }

    pub fn pending(&self) -> BitFlags<VisualChangeKind> {
        self.inner.borrow().change.pending
    }

    /// The zoom level which will be applied with the next cycle, if any.
    pub fn pending_zoom(&self) -> Option<SamplesPerPixel> {
        let inner = self.inner.borrow();
        if inner.change.pending.contains(VisualChangeKind::ZoomLevel) {
            Some(inner.change.zoom)
        } else {
            None
        }
    }

    pub fn request_zoom(&self, zoom: SamplesPerPixel) {
        self.request(VisualChangeKind::ZoomLevel, |c| c.zoom = zoom);
    }

    pub fn request_time_origin(&self, time_origin: Samples) {
        self.request(VisualChangeKind::TimeOrigin, |c| c.time_origin = time_origin);
    }

    pub fn request_y_origin(&self, y_origin: f64) {
        self.request(VisualChangeKind::YOrigin, |c| c.y_origin = y_origin);
    }

    pub fn request_auxiliary_redraw(&self) {
        self.request(VisualChangeKind::AuxiliaryRedraw, |_| {});
    }

    fn request(&self, kind: VisualChangeKind, update: impl FnOnce(&mut VisualChange)) {
        let needs_schedule = {
            let mut inner = self.inner.borrow_mut();
            update(&mut inner.change);
            inner.change.pending |= kind;
            match inner.state {
                SchedulerState::Idle => {
                    inner.state = SchedulerState::Armed;
                    true
                }
                SchedulerState::Armed | SchedulerState::Applying => false,
            }
        };
        if needs_schedule {
            self.idle.schedule_idle();
        }
    }

    /// Hands a snapshot of the pending changes to `apply` and clears them.
    ///
    /// Returns `false` without calling `apply` if nothing was armed.
    pub fn run(&self, apply: impl FnOnce(&VisualChange)) -> bool {
        let change = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != SchedulerState::Armed {
                return false;
            }
            inner.state = SchedulerState::Applying;
            mem::take(&mut inner.change)
        };
        let _finish = scopeguard::guard((), |_| self.finish_run());
        apply(&change);
        true
    }

    fn finish_run(&self) {
        let needs_schedule = {
            let mut inner = self.inner.borrow_mut();
            if inner.change.pending.is_empty() {
                inner.state = SchedulerState::Idle;
                false
            } else {
                inner.state = SchedulerState::Armed;
                true
            }
        };
        if needs_schedule {
            tracing::trace!(msg = "Visual change requested while applying, rescheduling");
            self.idle.schedule_idle();
        }
    }
}

use crate::{Samples, TimeValue};

/// Accumulates rapid scroll input from a control surface until the next tick consumes it.
#[derive(Debug, Default)]
pub struct ControlScroll {
    target: Option<TimeValue>,
}

impl ControlScroll {
    /// Moves the pending target (or `current_origin` if there's none yet) by `delta`.
    ///
    /// The target never goes below zero.
    pub fn scroll_by(&mut self, current_origin: Samples, delta: Samples) {
        let base = match self.target {
            Some(TimeValue::Linear(s)) => s,
            _ => current_origin,
        };
        let new_target = Samples::new(base.get().saturating_add(delta.get()).max(0));
        self.target = Some(TimeValue::Linear(new_target));
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    /// Hands out the pending target, leaving nothing behind.
    pub fn take_target(&mut self) -> Option<TimeValue> {
        self.target.take()
    }
}

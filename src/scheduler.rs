//! Debouncing of recomputes triggered from the host's draw callback.
//!
//! While recomputes are fast the router runs on every draw. Once a pass takes
//! longer than the immediate limit, draws only (re)arm a timer of twice the
//! last pass duration and the recompute happens when it fires. The redraw
//! the host performs after that recompute must not arm the timer again.

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawAction {
    /// Recompute before drawing.
    RecomputeNow,
    /// Draw the cached wires; a recompute is pending on the timer.
    Deferred,
}

#[derive(Clone, Debug)]
pub struct RecomputeScheduler {
    immediate_limit: Duration,
    last_calc_time: Duration,
    pending: Option<Instant>,
    redraw_pending: bool,
    skip_next: bool,
}

impl RecomputeScheduler {
    pub fn new(immediate_limit: Duration) -> Self {
        RecomputeScheduler {
            immediate_limit,
            last_calc_time: Duration::ZERO,
            pending: None,
            redraw_pending: false,
            skip_next: false,
        }
    }

    pub fn last_calc_time(&self) -> Duration {
        self.last_calc_time
    }

    pub fn record_calc_time(&mut self, elapsed: Duration) {
        self.last_calc_time = elapsed;
    }

    /// When the pending timer fires, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending
    }

    /// Decides what a draw at `now` should do, restarting the timer when the
    /// recompute is deferred.
    pub fn on_draw(&mut self, now: Instant) -> DrawAction {
        if self.last_calc_time <= self.immediate_limit {
            self.skip_next = false;
            return DrawAction::RecomputeNow;
        }
        if self.skip_next {
            self.skip_next = false;
        } else {
            self.pending = Some(now + self.last_calc_time * 2);
        }
        DrawAction::Deferred
    }

    /// Returns true, once, when the timer has expired at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(deadline) if deadline <= now => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Asks the host to draw again, e.g. after a deferred recompute finished.
    pub fn request_redraw(&mut self) {
        self.redraw_pending = true;
    }

    /// Consumes a redraw request. The draw it causes will not arm the timer.
    pub fn take_redraw(&mut self) -> bool {
        if !self.redraw_pending {
            return false;
        }
        self.redraw_pending = false;
        self.skip_next = true;
        true
    }
}

impl Default for RecomputeScheduler {
    fn default() -> Self {
        RecomputeScheduler::new(Duration::from_millis(100))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Duration::from_millis(20), DrawAction::RecomputeNow)]
    #[case(Duration::from_millis(100), DrawAction::RecomputeNow)]
    #[case(Duration::from_millis(150), DrawAction::Deferred)]
    fn draw_action_follows_last_calc_time(#[case] last: Duration, #[case] expected: DrawAction) {
        let mut scheduler = RecomputeScheduler::default();
        scheduler.record_calc_time(last);
        assert_eq!(scheduler.on_draw(Instant::now()), expected);
    }

    #[test]
    fn repeated_draws_restart_the_timer() {
        let mut scheduler = RecomputeScheduler::default();
        scheduler.record_calc_time(Duration::from_millis(150));
        let start = Instant::now();

        scheduler.on_draw(start);
        scheduler.on_draw(start + Duration::from_millis(200));
        assert_eq!(scheduler.deadline(), Some(start + Duration::from_millis(500)));
        assert!(!scheduler.poll(start + Duration::from_millis(400)));
        assert!(scheduler.poll(start + Duration::from_millis(500)));
        assert!(!scheduler.poll(start + Duration::from_millis(600)));
    }

    #[test]
    fn forced_redraw_does_not_rearm() {
        let mut scheduler = RecomputeScheduler::default();
        scheduler.record_calc_time(Duration::from_millis(150));
        let start = Instant::now();

        scheduler.request_redraw();
        assert!(scheduler.take_redraw());
        assert!(!scheduler.take_redraw());
        assert_eq!(scheduler.on_draw(start), DrawAction::Deferred);
        assert_eq!(scheduler.deadline(), None);

        scheduler.on_draw(start);
        assert_eq!(scheduler.deadline(), Some(start + Duration::from_millis(300)));
    }
}

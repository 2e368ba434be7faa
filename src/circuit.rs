//! Draw-hook facade tying the router, the recompute scheduler and the stroke
//! output together.

use std::time::Instant;

use crate::host::HostGraph;
use crate::render::{link_strokes, LinkStroke};
use crate::routing::{LinkRouter, PassOutcome, PresentationMode, RoutingConfig};
use crate::scheduler::{DrawAction, RecomputeScheduler};

/// What the host draws in place of its default connections.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawOutput {
    pub layer: PresentationMode,
    pub strokes: Vec<LinkStroke>,
    /// Result of the recompute this draw ran, `None` when it was deferred.
    pub outcome: Option<PassOutcome>,
}

#[derive(Debug)]
pub struct CircuitLines {
    router: LinkRouter,
    scheduler: RecomputeScheduler,
    enabled: bool,
    mode: PresentationMode,
    hidden: bool,
}

impl Default for CircuitLines {
    fn default() -> Self {
        CircuitLines::new(RoutingConfig::default())
    }
}

impl CircuitLines {
    pub fn new(config: RoutingConfig) -> Self {
        CircuitLines {
            scheduler: RecomputeScheduler::new(config.immediate_recompute_limit),
            enabled: config.enabled,
            mode: config.mode,
            hidden: false,
            router: LinkRouter::new(config),
        }
    }

    pub fn router(&self) -> &LinkRouter {
        &self.router
    }

    /// Switching the lines off drops a debounced recompute that is still
    /// waiting on its timer.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.scheduler.cancel();
        }
    }

    pub fn set_mode(&mut self, mode: PresentationMode) {
        self.mode = mode;
    }

    /// Mirrors the host's show/hide toggle.
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn is_shown(&self) -> bool {
        self.enabled && !self.hidden && self.mode != PresentationMode::Off
    }

    /// Called from the host's connection drawing. Returns `None` when the
    /// host should draw its own connections instead.
    pub fn draw_connections<H: HostGraph + ?Sized>(&mut self, host: &H, now: Instant) -> Option<DrawOutput> {
        if !self.is_shown() {
            return None;
        }
        let outcome = match self.scheduler.on_draw(now) {
            DrawAction::RecomputeNow => Some(self.recompute(host)),
            DrawAction::Deferred => None,
        };
        Some(DrawOutput {
            layer: self.mode,
            strokes: link_strokes(host, self.router.paths(), self.router.config().corner_radius),
            outcome,
        })
    }

    /// Drives deferred work: continues a yielded pass, or runs the debounced
    /// recompute once its timer has expired. Returns true when the host
    /// should redraw.
    pub fn poll<H: HostGraph + ?Sized>(&mut self, host: &H, now: Instant) -> bool {
        if self.router.has_pending() {
            let budget = self.router.config().time_budget;
            let outcome = self.router.run_slice(host, budget);
            self.finish(outcome);
        } else if self.scheduler.poll(now) {
            let outcome = self.recompute(host);
            if outcome == PassOutcome::Unchanged {
                self.scheduler.request_redraw();
            }
        }
        self.scheduler.take_redraw()
    }

    fn recompute<H: HostGraph + ?Sized>(&mut self, host: &H) -> PassOutcome {
        let outcome = self.router.recompute(host);
        self.finish(outcome);
        outcome
    }

    fn finish(&mut self, outcome: PassOutcome) {
        if let PassOutcome::Complete { .. } = outcome {
            self.scheduler.record_calc_time(self.router.last_calc_time());
            self.scheduler.request_redraw();
        }
    }
}

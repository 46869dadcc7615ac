//! Frame metrics reported by the engine.
//!
//! The engine publishes timings and counters through a [`MetricsSink`]
//! handed in at construction. Hosts plug in whatever they like (a HUD, a
//! logger); [`NullMetrics`] drops everything and [`CountingMetrics`] keeps
//! the last values for tests.

use std::cell::RefCell;
use std::collections::HashMap;

/// Milliseconds spent in the last frame tick.
pub const FRAME_MS: &str = "frame_ms";

/// Current viewport zoom level.
pub const ZOOM: &str = "zoom";

/// Elements visited by the last scene-tree update walk.
pub const ELEMENTS_UPDATED: &str = "elements_updated";

/// Attractor hover checks performed so far.
pub const HOVER_CHECKS: &str = "hover_checks";

/// Receiver for engine metrics.
pub trait MetricsSink {
    /// Record the latest value of a named measurement.
    fn gauge(&self, name: &str, value: f64);

    /// Increment a named counter by one.
    fn incr(&self, name: &str);

    /// Called once at the end of every rendered frame.
    fn frame_finished(&self) {}
}

/// A sink that discards every report.
#[derive(Debug, Default)]
pub struct NullMetrics;

impl MetricsSink for NullMetrics {
    fn gauge(&self, _name: &str, _value: f64) {}
    fn incr(&self, _name: &str) {}
}

/// A sink that remembers gauges and counters, for tests and debug HUDs.
#[derive(Debug, Default)]
pub struct CountingMetrics {
    gauges: RefCell<HashMap<String, f64>>,
    counters: RefCell<HashMap<String, u64>>,
    frames: std::cell::Cell<u64>,
}

impl CountingMetrics {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last recorded value of `name`, if any.
    pub fn gauge_value(&self, name: &str) -> Option<f64> {
        self.gauges.borrow().get(name).copied()
    }

    /// Current count of `name`.
    pub fn counter_value(&self, name: &str) -> u64 {
        self.counters.borrow().get(name).copied().unwrap_or(0)
    }

    /// Number of finished frames.
    pub fn frames(&self) -> u64 {
        self.frames.get()
    }
}

impl MetricsSink for CountingMetrics {
    fn gauge(&self, name: &str, value: f64) {
        self.gauges.borrow_mut().insert(name.to_owned(), value);
    }

    fn incr(&self, name: &str) {
        *self.counters.borrow_mut().entry(name.to_owned()).or_insert(0) += 1;
    }

    fn frame_finished(&self) {
        self.frames.set(self.frames.get() + 1);
    }
}

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::meter::{Meter, Reading};

/// An instantaneous value, reported as-is (not rate-normalized) whenever
/// it is non-zero at read time.
#[derive(Debug, Default)]
pub struct Gauge {
    value: Mutex<f64>,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gauge's current value to `value`.
    pub fn change(&self, value: f64) {
        *self.value.lock() = value;
    }

    /// Sets the gauge's current value to `delta`, in seconds.
    pub fn change_duration(&self, delta: Duration) {
        self.change(delta.as_secs_f64());
    }

    /// Sets the gauge's current value to the elapsed time since `since`, in seconds.
    pub fn change_since(&self, since: Instant) {
        self.change_duration(since.elapsed());
    }
}

impl Meter for Gauge {
    fn read(&self, _delta: Duration) -> Reading {
        let value = *self.value.lock();
        if value == 0.0 {
            return Vec::new();
        }
        vec![(String::new(), value)]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_gauge_reports_nothing() {
        let g = Gauge::new();
        assert!(g.read(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn change_replaces_the_previous_value() {
        let g = Gauge::new();
        g.change(3.0);
        g.change(-1.5);
        assert_eq!(g.read(Duration::from_secs(1)), vec![(String::new(), -1.5)]);
    }

    #[test]
    fn read_does_not_reset() {
        let g = Gauge::new();
        g.change(2.0);
        let _ = g.read(Duration::from_secs(1));
        assert_eq!(g.read(Duration::from_secs(1)), vec![(String::new(), 2.0)]);
    }
}

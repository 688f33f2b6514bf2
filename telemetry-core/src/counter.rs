use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::meter::{Meter, Reading};

/// A monotonically-increasing count of events, reported as a per-second
/// rate over the polling window it was read with.
///
/// Hits and counts are wait-free: every writer does a single atomic
/// add, and `read` swaps the accumulator back to zero rather than taking
/// a lock.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a single occurrence.
    pub fn hit(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `n` occurrences at once.
    pub fn count(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }
}

impl Meter for Counter {
    fn read(&self, delta: Duration) -> Reading {
        let value = self.value.swap(0, Ordering::AcqRel);
        if value == 0 {
            return Vec::new();
        }
        let rate = value as f64 * (Duration::from_secs(1).as_secs_f64() / delta.as_secs_f64());
        vec![(String::new(), rate)]
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
    fn idle_counter_reports_nothing() {
        let c = Counter::new();
        assert!(c.read(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn hits_are_normalized_to_a_per_second_rate() {
        let c = Counter::new();
        for _ in 0..20 {
            c.hit();
        }
        let reading = c.read(Duration::from_millis(500));
        assert_eq!(reading, vec![(String::new(), 40.0)]);
    }

    #[test]
    fn read_resets_the_accumulator() {
        let c = Counter::new();
        c.count(5);
        let _ = c.read(Duration::from_secs(1));
        assert!(c.read(Duration::from_secs(1)).is_empty());
    }
}

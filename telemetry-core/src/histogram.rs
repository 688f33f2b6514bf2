use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::meter::{Meter, Reading};

/// Reservoir capacity used when a [`Histogram`] is constructed with
/// [`Histogram::new`] without an explicit size.
pub const DEFAULT_RESERVOIR_SIZE: usize = 1000;

struct Reservoir {
    items: Vec<f64>,
    count: u64,
    min: f64,
    max: f64,
    sum: f64,
    rng: Xoshiro256StarStar,
}

impl Reservoir {
    fn new(size: usize, seed: u64) -> Self {
        Self {
            items: vec![0.0; size],
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            rng: Xoshiro256StarStar::seed_from_u64(seed),
        }
    }

    /// Algorithm R: the first `items.len()` values fill the reservoir
    /// directly; every value after that replaces a uniformly-chosen slot
    /// with probability `items.len() / count`.
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }

        if self.count as usize <= self.items.len() {
            self.items[self.count as usize - 1] = value;
        } else {
            let i = self.rng.random_range(0..self.count);
            if (i as usize) < self.items.len() {
                self.items[i as usize] = value;
            }
        }
    }
}

/// A sampled distribution of observed values, reported as count, min, max,
/// average and p50/p90/p99 percentiles.
///
/// Samples beyond the reservoir's capacity are kept or discarded by
/// [reservoir sampling](https://en.wikipedia.org/wiki/Reservoir_sampling),
/// so memory use is bounded regardless of how many values are recorded
/// between reads. A single mutex guards the whole reservoir: unlike
/// [`Counter`](crate::Counter)'s wait-free increments, percentile
/// computation needs a consistent, sorted snapshot, so recording and
/// reading are serialized against each other.
///
/// The reservoir's PRNG is seeded deterministically from the seed the
/// histogram was constructed with (and re-seeded, one higher, each time
/// it is read), so two histograms built with the same size and seed and
/// fed the same sequence of values produce byte-identical samples.
pub struct Histogram {
    size: usize,
    next_seed: Mutex<u64>,
    reservoir: Mutex<Reservoir>,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new(DEFAULT_RESERVOIR_SIZE, 0)
    }
}

/// A point-in-time summary of a histogram's reservoir.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
}

impl Histogram {
    /// Creates a histogram with a reservoir of `size` samples, seeded from
    /// `seed`.
    pub fn new(size: usize, seed: u64) -> Self {
        Self {
            size,
            next_seed: Mutex::new(seed.wrapping_add(1)),
            reservoir: Mutex::new(Reservoir::new(size, seed)),
        }
    }

    /// Records a single observation.
    pub fn record(&self, value: f64) {
        self.reservoir.lock().record(value);
    }

    /// Records a duration, in seconds.
    pub fn record_duration(&self, value: Duration) {
        self.record(value.as_secs_f64());
    }

    /// Records the elapsed time since `since`, in seconds.
    pub fn record_since(&self, since: std::time::Instant) {
        self.record_duration(since.elapsed());
    }

    /// Drains the reservoir and returns a summary of what it held, or
    /// `None` if nothing was recorded since the last read.
    pub fn summary(&self) -> Option<HistogramSummary> {
        let mut seed_guard = self.next_seed.lock();
        let seed = *seed_guard;
        *seed_guard += 1;
        drop(seed_guard);

        let old = {
            let mut reservoir = self.reservoir.lock();
            std::mem::replace(&mut *reservoir, Reservoir::new(self.size, seed))
        };

        if old.count == 0 {
            return None;
        }

        let n = (old.count as usize).min(old.items.len());
        let mut sorted = old.items[..n].to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("histogram samples must be finite"));

        Some(HistogramSummary {
            count: old.count,
            min: old.min,
            max: old.max,
            avg: old.sum / old.count as f64,
            p50: percentile(&sorted, 50),
            p90: percentile(&sorted, 90),
            p99: percentile(&sorted, 99),
        })
    }
}

/// Matches the original implementation's single-precision index math
/// exactly, including its rounding behavior, so ported snapshots line up.
fn percentile(sorted: &[f64], p: u32) -> f64 {
    let n = sorted.len();
    let index = (n as f32 / 100.0 * p as f32) as usize;
    sorted[index.min(n - 1)]
}

impl Meter for Histogram {
    fn read(&self, _delta: Duration) -> Reading {
        let Some(summary) = self.summary() else {
            return Vec::new();
        };
        vec![
            ("count".to_string(), summary.count as f64),
            ("min".to_string(), summary.min),
            ("max".to_string(), summary.max),
            ("avg".to_string(), summary.avg),
            ("p50".to_string(), summary.p50),
            ("p90".to_string(), summary.p90),
            ("p99".to_string(), summary.p99),
        ]
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
    fn empty_histogram_reports_nothing() {
        let h = Histogram::new(10, 0);
        assert!(h.read(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn below_capacity_keeps_every_sample() {
        let h = Histogram::new(1000, 42);
        for i in 0..100 {
            h.record(i as f64);
        }
        let summary = h.summary().unwrap();
        assert_eq!(summary.count, 100);
        assert_eq!(summary.min, 0.0);
        assert_eq!(summary.max, 99.0);
        assert_eq!(summary.avg, 49.5);
        assert_eq!(summary.p50, 50.0);
        assert_eq!(summary.p90, 90.0);
        assert_eq!(summary.p99, 99.0);
    }

    #[test]
    fn min_max_track_all_observations_even_when_sampled_out() {
        let h = Histogram::new(4, 7);
        for i in 0..1000 {
            h.record(i as f64);
        }
        let summary = h.summary().unwrap();
        assert_eq!(summary.count, 1000);
        assert_eq!(summary.min, 0.0);
        assert_eq!(summary.max, 999.0);
    }

    #[test]
    fn read_drains_and_reseeds_the_reservoir() {
        let h = Histogram::new(10, 0);
        h.record(1.0);
        assert!(h.summary().is_some());
        assert!(h.summary().is_none());
    }

    #[test]
    fn same_seed_and_inputs_produce_identical_samples() {
        let a = Histogram::new(4, 99);
        let b = Histogram::new(4, 99);
        for i in 0..50 {
            a.record(i as f64);
            b.record(i as f64);
        }
        let sa = a.summary().unwrap();
        let sb = b.summary().unwrap();
        assert_eq!(sa, sb);
    }
}

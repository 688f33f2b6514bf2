use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::counter::Counter;
use crate::error::AggregateError;
use crate::histogram::Histogram;
use crate::key::join;
use crate::meter::{Meter, MeterKind, Reading};
use crate::multi::MultiCounter;

/// Implemented by `#[derive(Aggregate)]` for structs whose fields should
/// each become a meter reading: booleans and integers become counters,
/// floats and durations become histograms, strings become multi-counters
/// keyed by their own value, and nested types implementing `Aggregate`
/// (including `HashMap<String, String>`) recurse with their field name
/// appended to the path.
///
/// This is also implemented directly for every leaf type it supports, so
/// the derive macro can emit the same `self.field.aggregate(recorder,
/// &path)` call for every field regardless of whether that field is a
/// leaf value or another `Aggregate` struct.
pub trait Aggregate {
    fn aggregate(&self, recorder: &StructRecorder, prefix: &str);
}

macro_rules! impl_aggregate_int {
    ($($t:ty),+) => {
        $(
            impl Aggregate for $t {
                fn aggregate(&self, recorder: &StructRecorder, prefix: &str) {
                    recorder.record_int(prefix, *self as i64);
                }
            }
        )+
    };
}

impl_aggregate_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Aggregate for bool {
    fn aggregate(&self, recorder: &StructRecorder, prefix: &str) {
        recorder.record_bool(prefix, *self);
    }
}

impl Aggregate for f32 {
    fn aggregate(&self, recorder: &StructRecorder, prefix: &str) {
        recorder.record_float(prefix, *self as f64);
    }
}

impl Aggregate for f64 {
    fn aggregate(&self, recorder: &StructRecorder, prefix: &str) {
        recorder.record_float(prefix, *self);
    }
}

impl Aggregate for String {
    fn aggregate(&self, recorder: &StructRecorder, prefix: &str) {
        recorder.record_string(prefix, self);
    }
}

impl Aggregate for Duration {
    fn aggregate(&self, recorder: &StructRecorder, prefix: &str) {
        recorder.record_duration(prefix, *self);
    }
}

impl<T: Aggregate> Aggregate for Option<T> {
    fn aggregate(&self, recorder: &StructRecorder, prefix: &str) {
        if let Some(value) = self {
            value.aggregate(recorder, prefix);
        }
    }
}

impl Aggregate for HashMap<String, String> {
    fn aggregate(&self, recorder: &StructRecorder, prefix: &str) {
        for (key, value) in self {
            recorder.record_string(&join(prefix, key), value);
        }
    }
}

/// Accumulates readings from one or more `Aggregate` values under a single
/// internal registry, keyed by the path each field aggregated to.
///
/// Unlike the global default poller, a `StructRecorder` is always an
/// explicit value: two independently-constructed recorders never share
/// state, so there's no risk of two unrelated aggregations silently
/// colliding on the same paths the way a hidden global registry would
/// allow.
///
/// `StructRecorder` itself implements [`Meter`], so it can be registered
/// with a [`crate::Poller`] like any other meter and polled on the normal
/// schedule.
#[derive(Default)]
pub struct StructRecorder {
    meters: Mutex<HashMap<String, (MeterKind, Arc<dyn Meter>)>>,
    errors: Mutex<Vec<AggregateError>>,
}

impl StructRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregates `value` under `prefix`, returning any type-mismatch
    /// errors produced by this call. Fields that collide on an
    /// already-registered path of a different kind are skipped rather
    /// than recorded.
    pub fn record<T: Aggregate>(&self, value: &T, prefix: &str) -> Vec<AggregateError> {
        self.errors.lock().clear();
        value.aggregate(self, prefix);
        self.errors.lock().drain(..).collect()
    }

    pub fn record_bool(&self, path: &str, value: bool) {
        if !value {
            return;
        }
        self.with_meter::<Counter>(path, MeterKind::Counter, |c| c.hit());
    }

    pub fn record_int(&self, path: &str, value: i64) {
        if value == 0 {
            return;
        }
        self.with_meter::<Counter>(path, MeterKind::Counter, |c| c.count(value.unsigned_abs()));
    }

    pub fn record_float(&self, path: &str, value: f64) {
        self.with_meter::<Histogram>(path, MeterKind::Histogram, |h| h.record(value));
    }

    pub fn record_duration(&self, path: &str, value: Duration) {
        self.with_meter::<Histogram>(path, MeterKind::Histogram, |h| h.record_duration(value));
    }

    pub fn record_string(&self, path: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        self.with_meter::<MultiCounter>(path, MeterKind::MultiCounter, |m| m.hit(value));
    }

    fn with_meter<M: Meter + Default + 'static>(&self, path: &str, kind: MeterKind, f: impl FnOnce(&M)) {
        let mut meters = self.meters.lock();
        let entry = meters
            .entry(path.to_string())
            .or_insert_with(|| (kind, Arc::new(M::default()) as Arc<dyn Meter>));

        if entry.0 != kind {
            self.errors.lock().push(AggregateError {
                path: path.to_string(),
                expected: entry.0,
                found: kind,
            });
            return;
        }

        match entry.1.as_any().downcast_ref::<M>() {
            Some(typed) => f(typed),
            None => unreachable!("meter kind matched but concrete type did not"),
        }
    }
}

impl Meter for StructRecorder {
    fn read(&self, delta: Duration) -> Reading {
        let meters = self.meters.lock();
        let mut readings = Vec::new();
        for (path, (_, meter)) in meters.iter() {
            for (suffix, value) in meter.read(delta) {
                readings.push((join(path, &suffix), value));
            }
        }
        readings
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::counter::Counter;
use crate::gauge::Gauge;
use crate::histogram::Histogram;
use crate::key::join;
use crate::meter::{Meter, Reading};
use crate::state::State;

/// A dynamically-keyed family of child meters of type `M`, one per label
/// seen so far.
///
/// Reads are copy-on-write: the published map is an `Arc<HashMap<..>>`
/// behind a `RwLock`, so a read only ever takes a read lock and clones the
/// `Arc`. Registering a never-before-seen label is the slow path: it takes
/// a dedicated mutex, clones the whole map, inserts the new child, and
/// publishes the replacement. Established labels never pay that cost.
pub struct MultiMeter<M> {
    published: RwLock<Arc<HashMap<String, Arc<M>>>>,
    insert_lock: Mutex<()>,
}

impl<M> Default for MultiMeter<M> {
    fn default() -> Self {
        Self {
            published: RwLock::new(Arc::new(HashMap::new())),
            insert_lock: Mutex::new(()),
        }
    }
}

impl<M: Meter + Default> MultiMeter<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the child meter for `label`, creating it if this is the
    /// first time `label` has been seen.
    pub fn get_or_create(&self, label: &str) -> Arc<M> {
        if let Some(child) = self.published.read().get(label) {
            return child.clone();
        }

        let _guard = self.insert_lock.lock();
        let current = self.published.read().clone();
        if let Some(child) = current.get(label) {
            return child.clone();
        }

        tracing::trace!(label, "multi-meter registering new label");
        let mut next = HashMap::clone(&current);
        let child = Arc::new(M::default());
        next.insert(label.to_string(), child.clone());
        *self.published.write() = Arc::new(next);
        child
    }
}

impl<M: Meter> Meter for MultiMeter<M> {
    fn read(&self, delta: Duration) -> Reading {
        let snapshot = self.published.read().clone();
        let mut readings = Vec::new();
        for (label, child) in snapshot.iter() {
            for (suffix, value) in child.read(delta) {
                readings.push((join(label, &suffix), value));
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

/// A family of [`Counter`]s keyed by label.
pub type MultiCounter = MultiMeter<Counter>;

impl MultiCounter {
    pub fn hit(&self, label: &str) {
        self.get_or_create(label).hit();
    }

    pub fn count(&self, label: &str, n: u64) {
        self.get_or_create(label).count(n);
    }
}

/// A family of [`Gauge`]s keyed by label.
pub type MultiGauge = MultiMeter<Gauge>;

impl MultiGauge {
    pub fn change(&self, label: &str, value: f64) {
        self.get_or_create(label).change(value);
    }

    pub fn change_duration(&self, label: &str, delta: Duration) {
        self.get_or_create(label).change_duration(delta);
    }

    pub fn change_since(&self, label: &str, since: Instant) {
        self.get_or_create(label).change_since(since);
    }
}

/// A family of [`State`]s keyed by label.
pub type MultiState = MultiMeter<State>;

impl MultiState {
    pub fn change(&self, label: &str, value: impl Into<String>) {
        self.get_or_create(label).change(value);
    }

    pub fn reset(&self, label: &str) {
        self.get_or_create(label).reset();
    }
}

/// A family of [`Histogram`]s keyed by label.
pub type MultiHistogram = MultiMeter<Histogram>;

impl MultiHistogram {
    pub fn record(&self, label: &str, value: f64) {
        self.get_or_create(label).record(value);
    }

    pub fn record_duration(&self, label: &str, value: Duration) {
        self.get_or_create(label).record_duration(value);
    }

    pub fn record_since(&self, label: &str, since: Instant) {
        self.get_or_create(label).record_since(since);
    }
}

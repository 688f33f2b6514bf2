use std::collections::BTreeMap;
use std::fmt;

use parking_lot::Mutex;

/// A read-only, lexicographically-ordered view of one poller tick.
///
/// Ordering is part of the contract, not an implementation detail: sinks
/// that serialize a snapshot (to a log line, a file, a socket) get a
/// stable, diffable byte sequence across ticks without sorting themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot(BTreeMap<String, f64>);

impl Snapshot {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl From<BTreeMap<String, f64>> for Snapshot {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self(map)
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a str, f64);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, f64)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.iter() {
            writeln!(f, "{key} {value}")?;
        }
        Ok(())
    }
}

/// Something a [`crate::Poller`] hands each tick's [`Snapshot`] to.
///
/// Sinks run in registration order on the poller's own ticker thread and
/// are expected to return quickly; a panicking sink is caught and logged
/// so it can't take the ticker thread (or other sinks) down with it.
pub trait Sink: Send + Sync {
    fn handle(&self, snapshot: &Snapshot);
}

impl<F> Sink for F
where
    F: Fn(&Snapshot) + Send + Sync,
{
    fn handle(&self, snapshot: &Snapshot) {
        (self)(snapshot)
    }
}

/// A [`Sink`] that logs every snapshot at `info` level via `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn handle(&self, snapshot: &Snapshot) {
        for (key, value) in snapshot.iter() {
            tracing::info!(key, value, "telemetry");
        }
    }
}

/// A [`Sink`] that just remembers every snapshot it's handed; useful for
/// tests and for anything that wants to pull snapshots on its own schedule
/// instead of reacting to each tick.
#[derive(Default)]
pub struct VecSink {
    snapshots: Mutex<Vec<Snapshot>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.lock().clone()
    }

    pub fn last(&self) -> Option<Snapshot> {
        self.snapshots.lock().last().cloned()
    }
}

impl Sink for VecSink {
    fn handle(&self, snapshot: &Snapshot) {
        self.snapshots.lock().push(snapshot.clone());
    }
}

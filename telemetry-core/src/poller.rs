use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::key::join;
use crate::meter::Meter;
use crate::sink::{Sink, Snapshot};

/// The polling rate a [`Poller`] falls back to for the implicit read a
/// meter gets when it's first registered, before `poll` has ever been
/// called to establish a real rate.
pub const DEFAULT_POLLING_RATE: Duration = Duration::from_secs(1);

#[derive(Clone)]
struct Config {
    rate: Duration,
    prefix: String,
}

struct Inner {
    meters: Mutex<HashMap<String, Arc<dyn Meter>>>,
    sinks: Mutex<Vec<Arc<dyn Sink>>>,
    config: Mutex<Option<Config>>,
}

/// A registry of meters, polled on a background thread at a fixed rate and
/// fanned out to a set of registered sinks.
///
/// `Poller` is a thin, cloneable handle around a shared [`Inner`]; cloning
/// it (or the process-wide [`crate::default_poller`]) shares the same
/// registry and the same ticker thread. The ticker thread holds only a
/// [`Weak`] reference to that shared state, so it stops on its own once
/// every `Poller` handle pointing at it has been dropped — there is no
/// explicit `stop` method to forget to call.
#[derive(Clone)]
pub struct Poller(Arc<Inner>);

impl Default for Poller {
    fn default() -> Self {
        Self::new()
    }
}

impl Poller {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            meters: Mutex::new(HashMap::new()),
            sinks: Mutex::new(Vec::new()),
            config: Mutex::new(None),
        }))
    }

    fn discard_rate(&self) -> Duration {
        self.0
            .config
            .lock()
            .as_ref()
            .map(|c| c.rate)
            .unwrap_or(DEFAULT_POLLING_RATE)
    }

    /// Registers `meter` under `path`. Returns `false` without touching
    /// the registry if `path` is already taken.
    ///
    /// The meter's accumulated state as of registration is discarded by
    /// reading it once (at the poller's configured rate, or
    /// [`DEFAULT_POLLING_RATE`] if `poll` hasn't been called yet), so a
    /// meter built and warmed up before being registered doesn't leak a
    /// stale first reading into the next real tick.
    pub fn add(&self, path: impl Into<String>, meter: Arc<dyn Meter>) -> bool {
        let path = path.into();
        let mut meters = self.0.meters.lock();
        if meters.contains_key(&path) {
            return false;
        }
        let _ = meter.read(self.discard_rate());
        meters.insert(path, meter);
        true
    }

    /// Returns the meter registered at `path`, if any.
    pub fn get(&self, path: &str) -> Option<Arc<dyn Meter>> {
        self.0.meters.lock().get(path).cloned()
    }

    /// Returns the meter registered at `path`, registering `meter` there
    /// first if nothing was registered yet.
    pub fn get_or_add(&self, path: impl Into<String>, meter: Arc<dyn Meter>) -> Arc<dyn Meter> {
        let path = path.into();
        loop {
            if let Some(existing) = self.get(&path) {
                return existing;
            }
            if self.add(path.clone(), meter.clone()) {
                return meter;
            }
        }
    }

    /// Unregisters whatever meter is at `path`, if any.
    pub fn remove(&self, path: &str) {
        self.0.meters.lock().remove(path);
    }

    /// Registers `sink` to receive every future tick's snapshot. Sinks run
    /// in the order they were registered.
    pub fn handle(&self, sink: Arc<dyn Sink>) {
        self.0.sinks.lock().push(sink);
    }

    /// Starts polling every registered meter every `rate`, joining each
    /// meter's path onto `prefix` before handing the combined snapshot to
    /// every registered sink.
    ///
    /// # Panics
    ///
    /// Panics if called more than once on the same poller: a poller's
    /// rate and prefix are fixed for its lifetime, and a second call is a
    /// misconfiguration rather than something a caller should route
    /// around.
    pub fn poll(&self, prefix: impl Into<String>, rate: Duration) {
        let prefix = prefix.into();
        {
            let mut config = self.0.config.lock();
            assert!(config.is_none(), "poller is already polling; poll() may only be called once");
            *config = Some(Config { rate, prefix: prefix.clone() });
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.0);
        thread::spawn(move || loop {
            thread::sleep(rate);
            let Some(inner) = weak.upgrade() else {
                break;
            };
            tick(&inner, &prefix, rate);
        });
    }
}

fn tick(inner: &Inner, prefix: &str, rate: Duration) {
    let meters: Vec<(String, Arc<dyn Meter>)> =
        inner.meters.lock().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    let sinks: Vec<Arc<dyn Sink>> = inner.sinks.lock().clone();

    let mut values = BTreeMap::new();
    for (path, meter) in &meters {
        let readings = catch_unwind(AssertUnwindSafe(|| meter.read(rate)));
        let readings = match readings {
            Ok(readings) => readings,
            Err(_) => {
                tracing::warn!(path = path.as_str(), "meter panicked during read, skipping for this tick");
                continue;
            }
        };
        for (suffix, value) in readings {
            values.insert(join(&join(prefix, path), &suffix), value);
        }
    }

    let snapshot = Snapshot::from(values);
    tracing::debug!(meters = meters.len(), sinks = sinks.len(), entries = snapshot.len(), "poller tick");

    for sink in &sinks {
        let sink = sink.clone();
        let result = catch_unwind(AssertUnwindSafe(|| sink.handle(&snapshot)));
        if result.is_err() {
            tracing::warn!("sink panicked while handling snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::Counter;
    use crate::sink::VecSink;

    #[test]
    fn add_rejects_a_path_already_in_use() {
        let poller = Poller::new();
        assert!(poller.add("a", Arc::new(Counter::new())));
        assert!(!poller.add("a", Arc::new(Counter::new())));
    }

    #[test]
    fn get_or_add_returns_the_existing_meter_on_conflict() {
        let poller = Poller::new();
        let first: Arc<dyn Meter> = Arc::new(Counter::new());
        let returned = poller.get_or_add("a", first.clone());
        assert!(Arc::ptr_eq(&returned, &first));

        let second: Arc<dyn Meter> = Arc::new(Counter::new());
        let returned_again = poller.get_or_add("a", second);
        assert!(Arc::ptr_eq(&returned_again, &first));
    }

    #[test]
    fn remove_drops_the_meter() {
        let poller = Poller::new();
        poller.add("a", Arc::new(Counter::new()));
        poller.remove("a");
        assert!(poller.get("a").is_none());
    }

    #[test]
    #[should_panic(expected = "already polling")]
    fn poll_may_only_be_called_once() {
        let poller = Poller::new();
        poller.poll("svc", Duration::from_secs(60));
        poller.poll("svc", Duration::from_secs(60));
    }

    #[test]
    fn tick_joins_prefix_path_and_suffix() {
        let poller = Poller::new();
        let counter = Arc::new(Counter::new());
        counter.hit();
        poller.add("jobs.done", counter);
        let sink = Arc::new(VecSink::new());
        poller.handle(sink.clone());

        tick(&poller.0, "svc", Duration::from_secs(1));

        let snapshot = sink.last().unwrap();
        assert_eq!(snapshot.get("svc.jobs.done"), Some(1.0));
    }
}

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

/// A single reading produced by a meter: a suffix (joined onto the meter's
/// registration path by whoever is aggregating it) and its value.
///
/// An empty suffix means "report directly under this meter's own path";
/// multi-meters and the struct recorder produce several entries per read,
/// one per child label.
pub type Reading = Vec<(String, f64)>;

/// Anything that can be polled for a value and reset for the next window.
///
/// `read` is destructive: implementations drain whatever they've
/// accumulated since the last call (or since construction) and return it
/// relative to `delta`, the time elapsed since the previous read. Readings
/// with nothing to report return an empty `Reading` rather than a zero
/// entry, so idle meters don't pollute a snapshot.
pub trait Meter: Send + Sync + 'static {
    fn read(&self, delta: Duration) -> Reading;

    /// Enables downcasting a `&dyn Meter` back to its concrete type, used
    /// by the struct recorder to recover a `Counter`/`Histogram`/etc. from
    /// its internal registry without widening its own API.
    fn as_any(&self) -> &dyn Any;

    /// Enables downcasting an owned `Arc<dyn Meter>` back to its concrete
    /// type, used by [`crate::get_or_add_typed`] after a poller lookup.
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Kinds of meter a path in a registry can hold, used to report a type
/// mismatch without requiring the caller to know the concrete Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeterKind {
    Counter,
    Gauge,
    State,
    Histogram,
    MultiCounter,
    MultiGauge,
    MultiState,
    MultiHistogram,
}

impl std::fmt::Display for MeterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MeterKind::Counter => "counter",
            MeterKind::Gauge => "gauge",
            MeterKind::State => "state",
            MeterKind::Histogram => "histogram",
            MeterKind::MultiCounter => "multi-counter",
            MeterKind::MultiGauge => "multi-gauge",
            MeterKind::MultiState => "multi-state",
            MeterKind::MultiHistogram => "multi-histogram",
        };
        f.write_str(name)
    }
}

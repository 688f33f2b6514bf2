//! In-process telemetry primitives.
//!
//! A handful of meter types (`Counter`, `Gauge`, `State`, `Histogram`, and
//! their label-keyed `Multi*` counterparts) accumulate values as your
//! program runs. A [`Poller`] periodically reads them all, joins their
//! registration paths with the reading's own suffix, and hands the
//! combined [`Snapshot`] to every registered [`Sink`]. [`MeterGroup`] and
//! [`Aggregate`] derive macros cut down on the boilerplate of registering
//! a struct's worth of meters, or of recording a struct's fields as one-off
//! observations, by hand.
//!
//! A process-wide default poller is available via [`default_poller`] and
//! the free functions [`add`], [`get`], [`get_or_add`], [`remove`],
//! [`handle`] and [`poll`], mirroring the methods on [`Poller`] itself for
//! code that doesn't need to manage its own poller instance.

mod aggregate;
mod counter;
mod error;
mod gauge;
mod group;
mod histogram;
mod key;
mod meter;
mod multi;
mod poller;
mod sink;
mod state;

pub use aggregate::{Aggregate, StructRecorder};
pub use counter::Counter;
pub use error::AggregateError;
pub use gauge::Gauge;
pub use group::{
    get_counter, get_gauge, get_histogram, get_multi_counter, get_multi_gauge, get_multi_histogram, get_multi_state,
    get_or_add_typed, get_state, group_path, load, unload, MeterGroup,
};
pub use histogram::{Histogram, HistogramSummary, DEFAULT_RESERVOIR_SIZE};
pub use key::join;
pub use meter::{Meter, MeterKind, Reading};
pub use multi::{MultiCounter, MultiGauge, MultiHistogram, MultiMeter, MultiState};
pub use poller::{Poller, DEFAULT_POLLING_RATE};
pub use sink::{Sink, Snapshot, TracingSink, VecSink};
pub use state::State;

#[cfg(feature = "derive")]
pub use telemetry_core_macros::{Aggregate, MeterGroup};

use std::sync::{Arc, OnceLock};
use std::time::Duration;

static DEFAULT_POLLER: OnceLock<Poller> = OnceLock::new();

/// The process-wide [`Poller`] backing the free functions in this module.
pub fn default_poller() -> &'static Poller {
    DEFAULT_POLLER.get_or_init(Poller::new)
}

/// Registers `meter` with the default poller. See [`Poller::add`].
pub fn add(path: impl Into<String>, meter: Arc<dyn Meter>) -> bool {
    default_poller().add(path, meter)
}

/// Looks up a meter on the default poller. See [`Poller::get`].
pub fn get(path: &str) -> Option<Arc<dyn Meter>> {
    default_poller().get(path)
}

/// Looks up or registers a meter on the default poller. See
/// [`Poller::get_or_add`].
pub fn get_or_add(path: impl Into<String>, meter: Arc<dyn Meter>) -> Arc<dyn Meter> {
    default_poller().get_or_add(path, meter)
}

/// Unregisters a meter from the default poller. See [`Poller::remove`].
pub fn remove(path: &str) {
    default_poller().remove(path)
}

/// Registers a sink with the default poller. See [`Poller::handle`].
pub fn handle(sink: Arc<dyn Sink>) {
    default_poller().handle(sink)
}

/// Starts the default poller ticking. See [`Poller::poll`].
pub fn poll(prefix: impl Into<String>, rate: Duration) {
    default_poller().poll(prefix, rate)
}

use std::any::Any;
use std::sync::Arc;

use crate::key::join;
use crate::meter::Meter;
use crate::poller::Poller;

/// Implemented by `#[derive(MeterGroup)]` for structs whose fields are
/// meters (`Arc<Counter>`, `Arc<MultiHistogram>`, ...) or nested types that
/// themselves derive `MeterGroup`.
///
/// `load` walks the struct, registering one meter per field under
/// `prefix` joined with the field's name (recursing into nested groups
/// with their own name appended to the path), and returns the populated
/// struct. `unload` walks the same shape and removes every path it would
/// have registered. Both are generated by the derive macro; there's
/// nothing to implement by hand.
pub trait MeterGroup: Sized {
    fn load(poller: &Poller, prefix: &str) -> Self;
    fn unload(poller: &Poller, prefix: &str);
}

/// Loads a `T` by registering its meters on `poller` under `prefix`.
pub fn load<T: MeterGroup>(poller: &Poller, prefix: impl Into<String>) -> T {
    T::load(poller, &prefix.into())
}

/// Removes every meter a [`load`]ed `T` would have registered under
/// `prefix`. Takes a type parameter rather than the loaded value itself,
/// since unloading doesn't need to touch the struct's fields, only know
/// their shape.
pub fn unload<T: MeterGroup>(poller: &Poller, prefix: impl Into<String>) {
    T::unload(poller, &prefix.into())
}

/// Registers (or looks up) a meter of type `M` at `path`, downcasting the
/// poller's `Arc<dyn Meter>` back to `Arc<M>`.
///
/// Used by `#[derive(MeterGroup)]`-generated code; public so meters can
/// also be fetched this way without the derive macro.
///
/// # Panics
///
/// Panics if `path` is already registered with a different meter type.
/// That can only happen if two different `MeterGroup` fields (or a
/// hand-written registration) collide on the same path, which is a
/// programming error with no sensible recovery.
pub fn get_or_add_typed<M: Meter + Default + 'static>(poller: &Poller, path: impl Into<String>) -> Arc<M> {
    let path = path.into();
    let meter = poller.get_or_add(path.clone(), Arc::new(M::default()));
    downcast_meter(meter).unwrap_or_else(|| panic!("telemetry path `{path}` is already registered with a different meter type"))
}

fn downcast_meter<M: Meter + 'static>(meter: Arc<dyn Meter>) -> Option<Arc<M>> {
    let any: Arc<dyn Any + Send + Sync> = meter.as_any_arc();
    any.downcast::<M>().ok()
}

/// Convenience constructors mirroring [`get_or_add_typed`] for each
/// built-in meter kind, for code that wants a meter registered on a
/// poller without writing out the derive macro machinery.
pub fn get_counter(poller: &Poller, path: impl Into<String>) -> Arc<crate::Counter> {
    get_or_add_typed(poller, path)
}

pub fn get_gauge(poller: &Poller, path: impl Into<String>) -> Arc<crate::Gauge> {
    get_or_add_typed(poller, path)
}

pub fn get_state(poller: &Poller, path: impl Into<String>) -> Arc<crate::State> {
    get_or_add_typed(poller, path)
}

pub fn get_histogram(poller: &Poller, path: impl Into<String>) -> Arc<crate::Histogram> {
    get_or_add_typed(poller, path)
}

pub fn get_multi_counter(poller: &Poller, path: impl Into<String>) -> Arc<crate::MultiCounter> {
    get_or_add_typed(poller, path)
}

pub fn get_multi_gauge(poller: &Poller, path: impl Into<String>) -> Arc<crate::MultiGauge> {
    get_or_add_typed(poller, path)
}

pub fn get_multi_state(poller: &Poller, path: impl Into<String>) -> Arc<crate::MultiState> {
    get_or_add_typed(poller, path)
}

pub fn get_multi_histogram(poller: &Poller, path: impl Into<String>) -> Arc<crate::MultiHistogram> {
    get_or_add_typed(poller, path)
}

/// Helper the derive macro emits calls to for nested `MeterGroup` fields,
/// so the generated code doesn't need to spell out `join` at every call
/// site.
pub fn group_path(prefix: &str, field: &str) -> String {
    join(prefix, field)
}

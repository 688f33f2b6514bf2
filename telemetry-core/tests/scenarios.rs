use std::sync::Arc;
use std::time::Duration;

use telemetry_core::{
    join, Aggregate, Counter, Gauge, Histogram, Meter, MeterGroup, MultiCounter, Poller, Sink, Snapshot, State,
    StructRecorder, VecSink,
};

// These scenarios record directly against meters and drive a single drain
// pass by hand (mirroring what `Poller::poll`'s background thread does
// every tick), since each test asserts on one specific snapshot rather
// than waiting on a real timer. `scenario_tick_isolation_across_panicking_sinks`
// is the exception: it runs a real poller end to end.

#[test]
fn scenario_single_counter_one_second_tick() {
    let poller = Poller::new();
    let counter = Arc::new(Counter::new());
    poller.add("meters.hits", counter.clone());
    counter.hit();
    counter.count(10);

    let sink = Arc::new(VecSink::new());
    poller.handle(sink.clone());

    let mut values = std::collections::BTreeMap::new();
    for (suffix, value) in counter.read(Duration::from_secs(1)) {
        values.insert(join("meters.hits", &suffix), value);
    }
    sink.handle(&Snapshot::from(values));

    let snapshot = sink.last().unwrap();
    assert_eq!(snapshot.get("meters.hits"), Some(11.0));
}

#[test]
fn scenario_histogram_of_0_through_99() {
    let histogram = Histogram::new(1000, 0);
    for i in 0..100 {
        histogram.record(i as f64);
    }
    let summary = histogram.summary().unwrap();
    assert_eq!(summary.count, 100);
    assert_eq!(summary.min, 0.0);
    assert_eq!(summary.max, 99.0);
    assert_eq!(summary.avg, 49.5);
    assert_eq!(summary.p50, 50.0);
    assert_eq!(summary.p90, 90.0);
    assert_eq!(summary.p99, 99.0);
}

#[test]
fn scenario_gauge_persists_across_ticks() {
    let gauge = Gauge::new();
    gauge.change(5.0);
    assert_eq!(gauge.read(Duration::from_secs(1)), vec![(String::new(), 5.0)]);
    assert_eq!(gauge.read(Duration::from_secs(1)), vec![(String::new(), 5.0)]);
}

#[test]
fn scenario_multi_counter_two_labels() {
    let multi = MultiCounter::new();
    multi.hit("err");
    multi.count("ok", 10);

    let mut reading: Vec<_> = multi
        .read(Duration::from_secs(1))
        .into_iter()
        .map(|(suffix, value)| (join("meters.result", &suffix), value))
        .collect();
    reading.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(
        reading,
        vec![("meters.result.err".to_string(), 1.0), ("meters.result.ok".to_string(), 10.0)]
    );
}

#[test]
fn scenario_state_reports_then_clears() {
    let state = State::new();
    state.change("happy");
    let reading = state.read(Duration::from_secs(1));
    assert_eq!(reading, vec![("happy".to_string(), 1.0)]);

    state.reset();
    assert!(state.read(Duration::from_secs(1)).is_empty());
}

#[derive(Default, MeterGroup)]
struct MultiSlot {
    counter: Arc<MultiCounter>,
}

#[test]
fn scenario_loader_round_trip() {
    let poller = Poller::new();
    let slot: MultiSlot = telemetry_core::load(&poller, "myComponent.Multi");
    slot.counter.hit("success");

    let meter = poller.get("myComponent.Multi.counter").expect("loader must register the field");
    let mut reading: Vec<_> = meter
        .read(Duration::from_secs(1))
        .into_iter()
        .map(|(suffix, value)| (join("myProcess.myComponent.Multi.counter", &suffix), value))
        .collect();
    reading.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(reading, vec![("myProcess.myComponent.Multi.counter.success".to_string(), 1.0)]);
}

#[derive(Aggregate)]
struct JobFields {
    enabled: bool,
    retries: i64,
    region: String,
}

#[test]
fn scenario_struct_aggregator_round_trip() {
    let recorder = Arc::new(StructRecorder::new());
    let errors = recorder.record(&JobFields { enabled: true, retries: 3, region: "us-east-1".to_string() }, "job");
    assert!(errors.is_empty());

    let poller = Poller::new();
    poller.add("job", recorder);

    // A one-second tick, so the normalized counter-backed fields (enabled,
    // retries) and the multi-counter-backed string field (region) all read
    // back at their raw recorded values.
    let rate = Duration::from_secs(1);
    let meter = poller.get("job").unwrap();
    let mut reading: Vec<_> =
        meter.read(rate).into_iter().map(|(suffix, value)| (join("job", &suffix), value)).collect();
    reading.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(
        reading,
        vec![
            ("job.enabled".to_string(), 1.0),
            ("job.region.us-east-1".to_string(), 1.0),
            ("job.retries".to_string(), 3.0),
        ]
    );
}

#[test]
fn scenario_tick_isolation_across_panicking_sinks() {
    struct PanicOnce {
        fired: std::sync::atomic::AtomicBool,
    }
    impl Sink for PanicOnce {
        fn handle(&self, _snapshot: &Snapshot) {
            if !self.fired.swap(true, std::sync::atomic::Ordering::SeqCst) {
                panic!("boom");
            }
        }
    }

    let poller = Poller::new();
    let counter = Arc::new(Counter::new());
    poller.add("a", counter.clone());
    counter.hit();

    poller.handle(Arc::new(PanicOnce { fired: std::sync::atomic::AtomicBool::new(false) }));
    let sink = Arc::new(VecSink::new());
    poller.handle(sink.clone());

    poller.poll("svc", Duration::from_millis(30));
    std::thread::sleep(Duration::from_millis(150));

    assert!(!sink.snapshots().is_empty(), "a sink after a panicking one must still receive ticks");
}

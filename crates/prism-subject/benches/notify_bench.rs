//! Benchmarks for notification fan-out and slot bookkeeping.
//!
//! Run with: cargo bench -p prism-subject --bench notify_bench

use std::cell::Cell;
use std::hint::black_box;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use prism_subject::{Observer, Payload, Signal, Slot, SlotResult, Subject};

struct Counter {
    hits: Cell<u64>,
}

impl Observer for Counter {}

impl Counter {
    fn new() -> Rc<Self> {
        Rc::new(Self { hits: Cell::new(0) })
    }

    fn on_event(&self, _subject: &Subject, _signal: &str, payload: &Payload) -> SlotResult {
        self.hits.set(self.hits.get() + u64::from(*payload.get::<u32>()?));
        Ok(())
    }
}

/// A subject with `fan_out` observers on one signal. Returns the observers
/// too, since slots hold them only weakly.
fn make_subject(signal: &str, fan_out: usize) -> (Subject, Vec<Rc<Counter>>) {
    let subject = Subject::new();
    let observers: Vec<_> = (0..fan_out).map(|_| Counter::new()).collect();
    for observer in &observers {
        subject.attach(signal, Slot::new(observer, Counter::on_event));
    }
    (subject, observers)
}

fn bench_notify_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("notify/fan_out");

    for fan_out in [1usize, 8, 64, 512] {
        group.throughput(Throughput::Elements(fan_out as u64));
        let (subject, _observers) = make_subject("FrameLoaded", fan_out);
        let payload = Payload::new(1u32);
        group.bench_with_input(
            BenchmarkId::new("exact", fan_out),
            &(),
            |b, _| b.iter(|| subject.notify(black_box("FrameLoaded"), &payload)),
        );
    }

    group.finish();
}

fn bench_notify_wildcard(c: &mut Criterion) {
    let mut group = c.benchmark_group("notify/wildcard");

    for fan_out in [8usize, 64] {
        group.throughput(Throughput::Elements(fan_out as u64 * 2));
        let (subject, _exact) = make_subject("FrameLoaded", fan_out);
        let wildcards: Vec<_> = (0..fan_out).map(|_| Counter::new()).collect();
        for observer in &wildcards {
            subject.attach(Subject::MODIFIED, Slot::new(observer, Counter::on_event));
        }
        let payload = Payload::new(1u32);
        group.bench_with_input(
            BenchmarkId::new("exact_plus_modified", fan_out),
            &(),
            |b, _| b.iter(|| subject.notify(black_box("FrameLoaded"), &payload)),
        );
    }

    group.finish();
}

fn bench_notify_unsubscribed(c: &mut Criterion) {
    let mut group = c.benchmark_group("notify/unsubscribed");

    let (subject, _observers) = make_subject("FrameLoaded", 64);
    let payload = Payload::new(1u32);
    group.bench_function("no_such_signal_64_others", |b| {
        b.iter(|| subject.notify(black_box("NeverAttached"), &payload));
    });

    group.finish();
}

fn bench_attach_detach(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry/attach_detach");

    for existing in [0usize, 64, 512] {
        let (subject, _observers) = make_subject("FrameLoaded", existing);
        let churn = Counter::new();
        group.bench_with_input(
            BenchmarkId::new("cycle", existing),
            &(),
            |b, _| {
                b.iter(|| {
                    subject.attach("FrameLoaded", Slot::new(&churn, Counter::on_event));
                    subject.detach("FrameLoaded", Slot::new(&churn, Counter::on_event));
                })
            },
        );
    }

    group.finish();
}

fn bench_forwarding_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("notify/forwarding");

    for depth in [1usize, 4, 16] {
        let subjects: Vec<_> = (0..=depth).map(|_| Subject::new()).collect();
        for pair in subjects.windows(2) {
            pair[0].attach("FrameLoaded", Signal::new(&pair[1]));
        }
        let sink = Counter::new();
        subjects[depth].attach("FrameLoaded", Slot::new(&sink, Counter::on_event));
        let payload = Payload::new(1u32);
        group.bench_with_input(
            BenchmarkId::new("depth", depth),
            &(),
            |b, _| b.iter(|| subjects[0].notify(black_box("FrameLoaded"), &payload)),
        );
    }

    group.finish();
}

fn bench_slot_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("slot/construct");

    let observer = Counter::new();
    group.bench_function("bind", |b| {
        b.iter(|| black_box(Slot::new(&observer, Counter::on_event)))
    });

    let probe = Slot::new(&observer, Counter::on_event);
    let same = Slot::new(&observer, Counter::on_event);
    group.bench_function("compare_equal", |b| {
        b.iter(|| black_box(probe == same))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_notify_fan_out,
    bench_notify_wildcard,
    bench_notify_unsubscribed,
    bench_attach_detach,
    bench_forwarding_chain,
    bench_slot_construction,
);

criterion_main!(benches);

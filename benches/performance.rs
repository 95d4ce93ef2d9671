//! Performance benchmarks for message buffering.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use livebuffer::{
    ChannelObserver, Destination, Message, MessageBuffer, MessageId, SubscriptionManager,
};

/// Benchmark steady-state insert (one eviction per insert) at varying capacity
fn bench_insert_at_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_at_capacity");

    for capacity in [50, 500, 5000] {
        group.bench_with_input(
            BenchmarkId::new("capacity", capacity),
            &capacity,
            |b, &capacity| {
                let buffer = MessageBuffer::with_capacity(capacity).unwrap();
                for i in 0..capacity as u64 {
                    buffer.insert(Message::empty(MessageId(i)));
                }

                let mut next = capacity as u64;
                b.iter(|| {
                    next += 1;
                    buffer.insert(black_box(Message::empty(MessageId(next))));
                });
            },
        );
    }

    group.finish();
}

/// Benchmark eviction when most of the buffer is pinned
fn bench_insert_mostly_pinned(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_mostly_pinned");

    for pinned in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("pinned", pinned), &pinned, |b, &pinned| {
            let buffer = MessageBuffer::with_capacity(pinned + 10).unwrap();
            for i in 0..pinned as u64 {
                let message = Message::empty(MessageId(i));
                buffer.insert(message.clone());
                buffer.pin(&message);
            }

            // Eviction has to skip every pinned entry to find a victim
            let mut next = pinned as u64;
            b.iter(|| {
                next += 1;
                buffer.insert(black_box(Message::empty(MessageId(next))));
            });
        });
    }

    group.finish();
}

/// Benchmark snapshot of a full buffer
fn bench_snapshot(c: &mut Criterion) {
    let buffer = MessageBuffer::with_capacity(1000).unwrap();
    for i in 0..1000 {
        buffer.insert(Message::new(MessageId(i), vec![0u8; 256]));
    }

    c.bench_function("snapshot_1000", |b| {
        b.iter(|| {
            black_box(buffer.snapshot());
        });
    });
}

/// Benchmark delivery through a subscription with a channel observer
fn bench_subscription_delivery(c: &mut Criterion) {
    let manager = SubscriptionManager::new();
    let destination = Destination::queue("bench");
    let subscription = manager.subscribe(destination.clone()).unwrap();
    let (observer, handle) = ChannelObserver::unbounded();
    subscription.add_observer(observer).unwrap();

    let mut next = 0u64;
    c.bench_function("subscription_delivery", |b| {
        b.iter(|| {
            next += 1;
            manager.deliver(&destination, Message::empty(MessageId(next)));
            black_box(handle.drain());
        });
    });
}

criterion_group!(
    benches,
    bench_insert_at_capacity,
    bench_insert_mostly_pinned,
    bench_snapshot,
    bench_subscription_delivery,
);

criterion_main!(benches);

//! SPSC pipe benchmarks: bucket write/drain throughput, same-thread and
//! cross-thread.

#![allow(clippy::unwrap_used)]

// Layer 1: Standard library imports
use std::hint::black_box;
use std::thread;

// Layer 2: Third-party crate imports
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

// Layer 3: Internal module imports
use coreactor::event::envelope::{EventHeader, FLAG_ALIVE, HEADER_BYTES};
use coreactor::event::{type_id_of, Event};
use coreactor::pipe;
use coreactor::util::ActorId;

#[derive(Debug, Clone, Copy)]
struct Payload(u64);
impl Event for Payload {
    const NAME: &'static str = "bench_payload";
}

fn bucket(value: u64) -> Vec<u8> {
    let header = EventHeader {
        type_id: type_id_of::<Payload>(),
        bucket_size: 3,
        flags: FLAG_ALIVE,
        dest: ActorId::new(1, 1),
        source: ActorId::new(1, 0),
    };
    let mut out = Vec::with_capacity(24);
    out.extend_from_slice(unsafe {
        std::slice::from_raw_parts(&header as *const EventHeader as *const u8, HEADER_BYTES)
    });
    out.extend_from_slice(&value.to_ne_bytes());
    out
}

fn same_thread_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipe_same_thread");
    group.throughput(Throughput::Elements(1));
    group.bench_function("write_publish_drain", |b| {
        let (mut tx, mut rx) = pipe::channel(1 << 16, 1 << 20);
        let bucket = bucket(42);
        b.iter(|| {
            tx.write_bucket(black_box(&bucket)).unwrap();
            tx.publish();
            let drained = rx.drain(16, usize::MAX, &mut |b| {
                black_box(b);
            });
            assert_eq!(drained, 1);
        });
    });
    group.finish();
}

fn cross_thread_throughput(c: &mut Criterion) {
    const BATCH: u64 = 100_000;
    let mut group = c.benchmark_group("pipe_cross_thread");
    group.throughput(Throughput::Elements(BATCH));
    group.sample_size(10);
    group.bench_function("stream_100k", |b| {
        b.iter(|| {
            let (mut tx, mut rx) = pipe::channel(1 << 16, 1 << 20);
            let producer = thread::spawn(move || {
                let bucket = bucket(7);
                let mut sent = 0u64;
                while sent < BATCH {
                    match tx.write_bucket(&bucket) {
                        Ok(()) => {
                            sent += 1;
                            if sent % 256 == 0 {
                                tx.publish();
                            }
                        }
                        Err(_) => {
                            tx.publish();
                            std::hint::spin_loop();
                        }
                    }
                }
                tx.publish();
            });
            let mut seen = 0u64;
            while seen < BATCH {
                seen += rx.drain(1024, usize::MAX, &mut |b| {
                    black_box(b);
                }) as u64;
            }
            producer.join().unwrap();
        });
    });
    group.finish();
}

criterion_group!(benches, same_thread_roundtrip, cross_thread_throughput);
criterion_main!(benches);

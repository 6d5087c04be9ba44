//! Cross-shard ping-pong: two actors on different shards bouncing a
//! counter until it reaches zero, with exact send/receive accounting.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use coreactor::prelude::*;

const ROUNDS: u64 = 100_000;

#[derive(Debug, Clone)]
struct Ping(u64);
impl Event for Ping {
    const NAME: &'static str = "ping";
}

#[derive(Debug, Clone)]
struct Pong(u64);
impl Event for Pong {
    const NAME: &'static str = "pong";
}

struct Initiator {
    peer: ActorId,
    sent: Arc<AtomicU64>,
    received: Arc<AtomicU64>,
    done: Arc<AtomicBool>,
}

impl Actor for Initiator {
    fn on_init(&mut self, ctx: &mut ActorContext<'_>) -> bool {
        ctx.register_event::<Pong, Self>();
        ctx.push(self.peer, Ping(ROUNDS));
        self.sent.fetch_add(1, Ordering::Relaxed);
        true
    }
}

impl Handle<Pong> for Initiator {
    fn on(&mut self, ctx: &mut ActorContext<'_>, event: Pong) {
        self.received.fetch_add(1, Ordering::Relaxed);
        if event.0 == 0 {
            self.done.store(true, Ordering::Release);
            return;
        }
        ctx.push(self.peer, Ping(event.0 - 1));
        self.sent.fetch_add(1, Ordering::Relaxed);
    }
}

struct Responder {
    sent: Arc<AtomicU64>,
    received: Arc<AtomicU64>,
}

impl Actor for Responder {
    fn on_init(&mut self, ctx: &mut ActorContext<'_>) -> bool {
        ctx.register_event::<Ping, Self>();
        true
    }
}

impl Handle<Ping> for Responder {
    fn on(&mut self, ctx: &mut ActorContext<'_>, event: Ping) {
        self.received.fetch_add(1, Ordering::Relaxed);
        ctx.reply(Pong(event.0));
        self.sent.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn ping_pong_round_trips_and_accounting() {
    let a_sent = Arc::new(AtomicU64::new(0));
    let a_recv = Arc::new(AtomicU64::new(0));
    let b_sent = Arc::new(AtomicU64::new(0));
    let b_recv = Arc::new(AtomicU64::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let mut rt = Runtime::with_config(
        RuntimeConfig::builder()
            .with_shards(2)
            .with_thread_pinning(false)
            .build()
            .unwrap(),
    )
    .unwrap();

    let responder = rt
        .add_actor(
            1,
            Responder {
                sent: Arc::clone(&b_sent),
                received: Arc::clone(&b_recv),
            },
        )
        .unwrap();
    rt.add_actor(
        0,
        Initiator {
            peer: responder,
            sent: Arc::clone(&a_sent),
            received: Arc::clone(&a_recv),
            done: Arc::clone(&done),
        },
    )
    .unwrap();

    let started = Instant::now();
    rt.start(false).unwrap();
    while !done.load(Ordering::Acquire) {
        assert!(
            started.elapsed() < Duration::from_secs(120),
            "ping-pong did not converge; a_recv={} b_recv={}",
            a_recv.load(Ordering::Relaxed),
            b_recv.load(Ordering::Relaxed),
        );
        std::thread::sleep(Duration::from_millis(1));
    }
    rt.stop();
    rt.join();
    assert!(!rt.has_error());

    // Every ping produced exactly one pong; both directions account for
    // ROUNDS + 1 messages (the counter runs ROUNDS..=0).
    assert_eq!(a_sent.load(Ordering::Relaxed), ROUNDS + 1);
    assert_eq!(b_recv.load(Ordering::Relaxed), ROUNDS + 1);
    assert_eq!(b_sent.load(Ordering::Relaxed), ROUNDS + 1);
    assert_eq!(a_recv.load(Ordering::Relaxed), ROUNDS + 1);

    let s0 = rt.stats(0);
    let s1 = rt.stats(1);
    assert!(s0.sent_remote >= ROUNDS + 1);
    assert!(s1.sent_remote >= ROUNDS + 1);
}

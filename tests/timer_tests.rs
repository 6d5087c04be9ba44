//! Timer precision: periodic firings land on the registering shard, never
//! early, and track the requested cadence.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use coreactor::prelude::*;
use parking_lot::Mutex;

const PERIOD: Duration = Duration::from_millis(10);
const FIRINGS: usize = 100;

struct Metronome {
    started: Option<Instant>,
    fires: Arc<Mutex<Vec<Duration>>>,
    done: Arc<AtomicBool>,
}

impl Actor for Metronome {
    fn on_init(&mut self, ctx: &mut ActorContext<'_>) -> bool {
        assert_eq!(ctx.shard(), 0, "timers fire on the registering shard");
        ctx.register_event::<TimerFired, Self>();
        self.started = Some(Instant::now());
        ctx.set_timer(PERIOD, Some(PERIOD));
        true
    }
}

impl Handle<TimerFired> for Metronome {
    fn on(&mut self, ctx: &mut ActorContext<'_>, _event: TimerFired) {
        assert_eq!(ctx.shard(), 0);
        let mut fires = self.fires.lock();
        if fires.len() >= FIRINGS {
            return;
        }
        let elapsed = self.started.unwrap().elapsed();
        fires.push(elapsed);
        if fires.len() == FIRINGS {
            self.done.store(true, Ordering::Release);
        }
    }
}

#[test]
fn periodic_timer_cadence() {
    let fires = Arc::new(Mutex::new(Vec::new()));
    let done = Arc::new(AtomicBool::new(false));

    let mut rt = Runtime::with_config(
        RuntimeConfig::builder()
            .with_shards(2)
            .with_timer_granularity(PERIOD)
            .with_thread_pinning(false)
            .build()
            .unwrap(),
    )
    .unwrap();
    rt.add_actor(
        0,
        Metronome {
            started: None,
            fires: Arc::clone(&fires),
            done: Arc::clone(&done),
        },
    )
    .unwrap();

    rt.start(false).unwrap();
    let wall = Instant::now();
    while !done.load(Ordering::Acquire) {
        assert!(wall.elapsed() < Duration::from_secs(30), "timer stalled");
        std::thread::sleep(Duration::from_millis(5));
    }
    rt.stop();
    rt.join();
    assert!(!rt.has_error());

    let fires = fires.lock();
    assert_eq!(fires.len(), FIRINGS);

    // Never early: the i-th firing cannot precede i periods from the
    // start (granule rounding only ever delays). A small allowance covers
    // clock-read skew between the actor and the wheel.
    let slop = Duration::from_millis(2);
    for (i, &elapsed) in fires.iter().enumerate() {
        let floor = PERIOD * (i as u32 + 1);
        assert!(
            elapsed + slop >= floor,
            "firing {i} at {elapsed:?}, before {floor:?}"
        );
    }

    // And not unboundedly late: the whole run should take roughly
    // FIRINGS periods, with generous headroom for a loaded machine.
    let total = *fires.last().unwrap();
    assert!(total >= PERIOD * (FIRINGS as u32) - slop);
    assert!(
        total < PERIOD * (FIRINGS as u32) * 4,
        "cadence drifted: {total:?}"
    );
}

struct OneShot {
    cancelled_fired: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
    keep: Option<TimerId>,
    gone: Option<TimerId>,
}

impl Actor for OneShot {
    fn on_init(&mut self, ctx: &mut ActorContext<'_>) -> bool {
        ctx.register_event::<TimerFired, Self>();
        self.gone = Some(ctx.set_timer(Duration::from_millis(20), None));
        self.keep = Some(ctx.set_timer(Duration::from_millis(40), None));
        let gone = self.gone.unwrap();
        ctx.cancel_timer(gone);
        true
    }
}

impl Handle<TimerFired> for OneShot {
    fn on(&mut self, _ctx: &mut ActorContext<'_>, event: TimerFired) {
        if Some(event.timer) == self.gone {
            self.cancelled_fired.store(true, Ordering::Release);
        }
        if Some(event.timer) == self.keep {
            self.done.store(true, Ordering::Release);
        }
    }
}

#[test]
fn cancelled_timer_never_fires() {
    let cancelled_fired = Arc::new(AtomicBool::new(false));
    let done = Arc::new(AtomicBool::new(false));

    let mut rt = Runtime::with_config(
        RuntimeConfig::builder()
            .with_shards(1)
            .with_thread_pinning(false)
            .build()
            .unwrap(),
    )
    .unwrap();
    rt.add_actor(
        0,
        OneShot {
            cancelled_fired: Arc::clone(&cancelled_fired),
            done: Arc::clone(&done),
            keep: None,
            gone: None,
        },
    )
    .unwrap();

    rt.start(false).unwrap();
    let wall = Instant::now();
    while !done.load(Ordering::Acquire) {
        assert!(wall.elapsed() < Duration::from_secs(10));
        std::thread::sleep(Duration::from_millis(5));
    }
    rt.stop();
    rt.join();
    assert!(!cancelled_fired.load(Ordering::Acquire));
}

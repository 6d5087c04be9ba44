//! Two actors on two shards bouncing a counter, with throughput stats.
//!
//! ```text
//! cargo run --release --example ping_pong
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use coreactor::prelude::*;

const ROUNDS: u64 = 1_000_000;

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

struct Pinger {
    peer: ActorId,
    done: Arc<AtomicBool>,
}

impl Actor for Pinger {
    fn on_init(&mut self, ctx: &mut ActorContext<'_>) -> bool {
        ctx.register_event::<Pong, Self>();
        ctx.push(self.peer, Ping(ROUNDS));
        true
    }
}

impl Handle<Pong> for Pinger {
    fn on(&mut self, ctx: &mut ActorContext<'_>, event: Pong) {
        if event.0 == 0 {
            self.done.store(true, Ordering::Release);
        } else {
            ctx.push(self.peer, Ping(event.0 - 1));
        }
    }
}

struct Ponger;

impl Actor for Ponger {
    fn on_init(&mut self, ctx: &mut ActorContext<'_>) -> bool {
        ctx.register_event::<Ping, Self>();
        true
    }
}

impl Handle<Ping> for Ponger {
    fn on(&mut self, ctx: &mut ActorContext<'_>, event: Ping) {
        ctx.reply(Pong(event.0));
    }
}

fn main() -> Result<(), SystemError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let done = Arc::new(AtomicBool::new(false));
    let mut rt = Runtime::new(2);
    let ponger = rt.add_actor(1, Ponger)?;
    rt.add_actor(
        0,
        Pinger {
            peer: ponger,
            done: Arc::clone(&done),
        },
    )?;

    let started = Instant::now();
    rt.start(false)?;
    while !done.load(Ordering::Acquire) {
        std::thread::yield_now();
    }
    let elapsed = started.elapsed();
    rt.stop();
    rt.join();

    let events = (ROUNDS + 1) * 2;
    println!(
        "{events} events in {elapsed:?} ({:.0} events/s, {:.0} ns round trip)",
        events as f64 / elapsed.as_secs_f64(),
        elapsed.as_nanos() as f64 / (ROUNDS + 1) as f64,
    );
    println!("shard 0: {:?}", rt.stats(0));
    println!("shard 1: {:?}", rt.stats(1));
    Ok(())
}

//! The process-wide supervisor: shard spawn, synchronised start, stop,
//! join.

// Layer 1: Standard library imports
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread::JoinHandle;
use std::time::Instant;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::builder::ShardBuilder;
use super::config::RuntimeConfig;
use super::errors::SystemError;
use super::signal;
use crate::actor::{Actor, AnyActor};
use crate::pipe::{self, LocalPipe, PipeConsumer, PipeProducer};
use crate::reactor::Reactor;
use crate::shard::core::ShardCore;
use crate::shard::engine::Shard;
use crate::stats::{ShardStats, StatsSnapshot};
use crate::util::ActorId;

/// The runtime: N shards, their pipes, and the process-wide lifecycle.
///
/// # Examples
///
/// ```rust,no_run
/// use coreactor::prelude::*;
///
/// struct Worker;
/// impl Actor for Worker {}
///
/// fn main() -> Result<(), coreactor::system::SystemError> {
///     let mut rt = Runtime::new(2);
///     let _worker = rt.add_actor(0, Worker)?;
///     rt.start(false)?;
///     rt.stop();
///     rt.join();
///     assert!(!rt.has_error());
///     Ok(())
/// }
/// ```
pub struct Runtime {
    config: RuntimeConfig,
    /// Actors staged per shard before start.
    pending: Vec<Vec<(u16, Box<dyn AnyActor>)>>,
    next_sid: Vec<u16>,
    stop: Arc<AtomicBool>,
    error: Arc<AtomicBool>,
    stats: Vec<Arc<ShardStats>>,
    handles: Vec<JoinHandle<()>>,
    started: bool,
}

impl Runtime {
    /// Create a runtime with `shards` shards and default configuration.
    /// A zero count is clamped to one.
    pub fn new(shards: usize) -> Self {
        let mut config = RuntimeConfig::default();
        config.shards = shards.max(1).min(u16::MAX as usize);
        // The default configuration validates by construction.
        Self::from_config(config)
    }

    /// Create a runtime from a validated configuration.
    pub fn with_config(config: RuntimeConfig) -> Result<Self, SystemError> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: RuntimeConfig) -> Self {
        let n = config.shards;
        Self {
            config,
            pending: (0..n).map(|_| Vec::new()).collect(),
            next_sid: vec![1; n],
            stop: Arc::new(AtomicBool::new(false)),
            error: Arc::new(AtomicBool::new(false)),
            stats: (0..n).map(|_| Arc::new(ShardStats::new())).collect(),
            handles: Vec::new(),
            started: false,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Number of shards.
    pub fn shard_count(&self) -> u16 {
        self.config.shards as u16
    }

    /// Stage an actor on `shard`. Its `on_init` runs on the shard thread
    /// during [`start`](Runtime::start), before the start barrier
    /// releases; a `false` return is logged and the actor dropped.
    ///
    /// After start, actors are constructed shard-locally with
    /// [`ActorContext::spawn`](crate::actor::ActorContext::spawn).
    pub fn add_actor<A: Actor>(&mut self, shard: u16, actor: A) -> Result<ActorId, SystemError> {
        if self.started {
            return Err(SystemError::AlreadyStarted);
        }
        let shards = self.shard_count();
        if shard >= shards {
            return Err(SystemError::InvalidShard { shard, shards });
        }
        let idx = shard as usize;
        let sid = self.next_sid[idx];
        self.next_sid[idx] = sid
            .checked_add(1)
            .ok_or(SystemError::ShardFull { shard })?;
        self.pending[idx].push((sid, Box::new(actor)));
        Ok(ActorId::new(sid, shard))
    }

    /// Fluent staging of several actors on one shard.
    ///
    /// ```rust,ignore
    /// let ids = rt.shard(0)
    ///     .with_actor(RoomActor::new())
    ///     .with_actor(LogActor::new())
    ///     .ids()?;
    /// ```
    pub fn shard(&mut self, index: u16) -> ShardBuilder<'_> {
        ShardBuilder::new(self, index)
    }

    /// Spawn the shard threads and block until every shard has finished
    /// initialising its staged actors. With `blocking`, also wait until
    /// the runtime stops.
    pub fn start(&mut self, blocking: bool) -> Result<(), SystemError> {
        if self.started {
            return Err(SystemError::AlreadyStarted);
        }
        if self.config.install_signals {
            signal::reset();
            signal::install()?;
        }

        let n = self.config.shards;
        let max_inline = self.config.max_inline_payload();

        // One SPSC ring per ordered shard pair.
        let mut producers: Vec<Vec<Option<PipeProducer>>> =
            (0..n).map(|_| (0..n).map(|_| None).collect()).collect();
        let mut consumers: Vec<Vec<Option<PipeConsumer>>> =
            (0..n).map(|_| (0..n).map(|_| None).collect()).collect();
        for src in 0..n {
            for dst in 0..n {
                if src == dst {
                    continue;
                }
                let (p, c) = pipe::channel(self.config.pipe_initial, self.config.pipe_ceiling);
                producers[src][dst] = Some(p);
                consumers[dst][src] = Some(c);
            }
        }

        let mut shards = Vec::with_capacity(n);
        for index in 0..n {
            let reactor = Reactor::new(self.config.timer_granularity, max_inline).map_err(
                |e| {
                    self.error.store(true, Ordering::Relaxed);
                    SystemError::from(e)
                },
            )?;
            let core = ShardCore {
                index: index as u16,
                shard_count: n as u16,
                inbox: LocalPipe::with_capacity(64 * 1024),
                staging: (0..n).map(|_| LocalPipe::new()).collect(),
                producers: mem::take(&mut producers[index]),
                consumers: mem::take(&mut consumers[index]),
                reactor,
                stats: Arc::clone(&self.stats[index]),
                tick_period: self.config.tick_period,
                max_inline,
                drain_max_events: self.config.drain_max_events,
                drain_max_bytes: self.config.drain_max_bytes,
                now: Instant::now(),
                next_sid: self.next_sid[index],
            };
            shards.push(Shard::new(
                core,
                mem::take(&mut self.pending[index]),
                Arc::clone(&self.stop),
                Arc::clone(&self.error),
                self.config.install_signals,
            ));
        }

        let barrier = Arc::new(Barrier::new(n + 1));
        let core_ids = if self.config.pin_threads {
            core_affinity::get_core_ids().filter(|ids| !ids.is_empty())
        } else {
            None
        };
        for (index, mut shard) in shards.into_iter().enumerate() {
            let barrier = Arc::clone(&barrier);
            let core_id = core_ids
                .as_ref()
                .and_then(|ids| ids.get(index % ids.len()).copied());
            let handle = std::thread::Builder::new()
                .name(format!("shard-{index}"))
                .spawn(move || shard.run(&barrier, core_id))
                .map_err(|e| SystemError::SpawnFailed(e.to_string()))?;
            self.handles.push(handle);
        }
        barrier.wait();
        self.started = true;
        tracing::info!(shards = n, "runtime started");

        if blocking {
            self.join();
        }
        Ok(())
    }

    /// Request a stop: every shard exits its tick loop after the current
    /// tick. Idempotent and callable from any thread holding a
    /// [`StopHandle`].
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// A cloneable handle that can stop the runtime from other threads.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: Arc::clone(&self.stop),
        }
    }

    /// Wait for every shard thread to exit.
    pub fn join(&mut self) {
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                self.error.store(true, Ordering::Relaxed);
            }
        }
    }

    /// True if any shard reported an unrecoverable error.
    pub fn has_error(&self) -> bool {
        self.error.load(Ordering::Relaxed)
    }

    /// Counter snapshot for one shard.
    pub fn stats(&self, shard: u16) -> StatsSnapshot {
        self.stats
            .get(shard as usize)
            .map(|s| s.snapshot())
            .unwrap_or_default()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

/// Stops the runtime from any thread; the underlying flag is lock-free.
#[derive(Clone)]
pub struct StopHandle {
    stop: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

//! Runtime configuration with sensible defaults.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::errors::SystemError;
use crate::event::envelope::HEADER_BYTES;
use crate::pipe::MIN_CAPACITY;

/// Default shard tick period: the idle sleep cap and the outbound flush
/// budget.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Default initial capacity of each cross-shard ring (bytes).
pub const DEFAULT_PIPE_INITIAL: usize = 1 << 16;

/// Default growth ceiling of each cross-shard ring (bytes).
pub const DEFAULT_PIPE_CEILING: usize = 1 << 22;

/// Default timer wheel granularity.
pub const DEFAULT_TIMER_GRANULARITY: Duration = Duration::from_millis(10);

/// Default bound on events drained from one peer ring per tick.
pub const DEFAULT_DRAIN_MAX_EVENTS: usize = 1024;

/// Default bound on bytes drained from one peer ring per tick.
pub const DEFAULT_DRAIN_MAX_BYTES: usize = 256 * 1024;

/// Whole-runtime configuration.
///
/// # Examples
///
/// ```rust
/// use coreactor::system::RuntimeConfig;
/// use std::time::Duration;
///
/// let config = RuntimeConfig::builder()
///     .with_shards(4)
///     .with_tick_period(Duration::from_micros(500))
///     .build()
///     .unwrap();
/// assert_eq!(config.shards, 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Number of shards (defaults to the machine's available parallelism).
    pub shards: usize,

    /// Idle sleep cap and outbound flush/backpressure budget.
    pub tick_period: Duration,

    /// Initial capacity of each cross-shard ring, in bytes.
    pub pipe_initial: usize,

    /// Growth ceiling of each cross-shard ring, in bytes.
    pub pipe_ceiling: usize,

    /// Timer wheel granularity.
    pub timer_granularity: Duration,

    /// Per-peer inbound drain bound, in events per tick.
    pub drain_max_events: usize,

    /// Per-peer inbound drain bound, in bytes per tick.
    pub drain_max_bytes: usize,

    /// Install SIGINT/SIGTERM handlers that request a runtime stop.
    pub install_signals: bool,

    /// Pin each shard thread to a core when the platform reports core ids.
    pub pin_threads: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            shards: std::thread::available_parallelism().map_or(1, |n| n.get()),
            tick_period: DEFAULT_TICK_PERIOD,
            pipe_initial: DEFAULT_PIPE_INITIAL,
            pipe_ceiling: DEFAULT_PIPE_CEILING,
            timer_granularity: DEFAULT_TIMER_GRANULARITY,
            drain_max_events: DEFAULT_DRAIN_MAX_EVENTS,
            drain_max_bytes: DEFAULT_DRAIN_MAX_BYTES,
            install_signals: false,
            pin_threads: true,
        }
    }
}

impl RuntimeConfig {
    /// Create a configuration builder.
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), SystemError> {
        if self.shards == 0 || self.shards > u16::MAX as usize {
            return Err(SystemError::Config(format!(
                "shards must be in 1..={}, got {}",
                u16::MAX,
                self.shards
            )));
        }
        if self.tick_period.is_zero() {
            return Err(SystemError::Config("tick_period must be > 0".into()));
        }
        if self.timer_granularity.is_zero() {
            return Err(SystemError::Config("timer_granularity must be > 0".into()));
        }
        if self.pipe_initial < MIN_CAPACITY {
            return Err(SystemError::Config(format!(
                "pipe_initial must be at least {MIN_CAPACITY} bytes"
            )));
        }
        if self.pipe_ceiling < self.pipe_initial {
            return Err(SystemError::Config(
                "pipe_ceiling must be >= pipe_initial".into(),
            ));
        }
        if self.drain_max_events == 0 || self.drain_max_bytes == 0 {
            return Err(SystemError::Config("drain bounds must be > 0".into()));
        }
        Ok(())
    }

    /// Largest payload constructed inline in a bucket; anything bigger
    /// takes the heap path so a single event can never occupy more than
    /// half a ring.
    pub(crate) fn max_inline_payload(&self) -> usize {
        let bucket_cap = (self.pipe_ceiling / 2).min(u16::MAX as usize * 8);
        bucket_cap.saturating_sub(HEADER_BYTES)
    }
}

/// Fluent builder for [`RuntimeConfig`].
#[derive(Debug, Default)]
pub struct RuntimeConfigBuilder {
    config: RuntimeConfig,
}

impl RuntimeConfigBuilder {
    /// Set the shard count.
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.config.shards = shards;
        self
    }

    /// Set the tick period.
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.config.tick_period = period;
        self
    }

    /// Set the initial and ceiling sizes of the cross-shard rings.
    pub fn with_pipe_capacity(mut self, initial: usize, ceiling: usize) -> Self {
        self.config.pipe_initial = initial;
        self.config.pipe_ceiling = ceiling;
        self
    }

    /// Set the timer wheel granularity.
    pub fn with_timer_granularity(mut self, granularity: Duration) -> Self {
        self.config.timer_granularity = granularity;
        self
    }

    /// Set the per-peer inbound drain bounds.
    pub fn with_drain_bounds(mut self, max_events: usize, max_bytes: usize) -> Self {
        self.config.drain_max_events = max_events;
        self.config.drain_max_bytes = max_bytes;
        self
    }

    /// Install SIGINT/SIGTERM handlers on start.
    pub fn with_signals(mut self, install: bool) -> Self {
        self.config.install_signals = install;
        self
    }

    /// Pin shard threads to cores.
    pub fn with_thread_pinning(mut self, pin: bool) -> Self {
        self.config.pin_threads = pin;
        self
    }

    /// Build and validate.
    pub fn build(self) -> Result<RuntimeConfig, SystemError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(RuntimeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = RuntimeConfig::builder()
            .with_shards(2)
            .with_tick_period(Duration::from_micros(200))
            .with_pipe_capacity(4096, 1 << 20)
            .with_drain_bounds(64, 4096)
            .with_signals(true)
            .with_thread_pinning(false)
            .build()
            .unwrap();
        assert_eq!(config.shards, 2);
        assert_eq!(config.tick_period, Duration::from_micros(200));
        assert_eq!(config.pipe_initial, 4096);
        assert_eq!(config.pipe_ceiling, 1 << 20);
        assert_eq!(config.drain_max_events, 64);
        assert!(config.install_signals);
        assert!(!config.pin_threads);
    }

    #[test]
    fn test_zero_shards_rejected() {
        assert!(RuntimeConfig::builder().with_shards(0).build().is_err());
    }

    #[test]
    fn test_ceiling_below_initial_rejected() {
        let result = RuntimeConfig::builder()
            .with_pipe_capacity(1 << 16, 1 << 10)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_tick_period_rejected() {
        let result = RuntimeConfig::builder()
            .with_tick_period(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_max_inline_payload_respects_u16_bucket() {
        let config = RuntimeConfig::default();
        // Ceiling/2 is 2 MiB but the bucket size field caps earlier.
        assert_eq!(config.max_inline_payload(), u16::MAX as usize * 8 - 16);

        let small = RuntimeConfig::builder()
            .with_pipe_capacity(4096, 4096)
            .build()
            .unwrap();
        assert_eq!(small.max_inline_payload(), 2048 - 16);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = RuntimeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: RuntimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.shards, config.shards);
        assert_eq!(back.pipe_ceiling, config.pipe_ceiling);
    }
}

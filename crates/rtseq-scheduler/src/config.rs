//! Service and sequencer configuration.

use crate::error::ConfigError;
use crate::release::ReleaseMode;
use rtseq_platform::{RtCapability, ThreadSetup};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default shared tick resolution (1 ms).
pub const DEFAULT_TICK_RESOLUTION_US: u64 = 1_000;

/// Parameters of one periodic service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Unique service name; also the thread name.
    pub name: String,
    /// Nominal period in milliseconds. Must be positive.
    pub period_ms: u64,
    /// FIFO priority; `None` runs under the default policy.
    #[serde(default)]
    pub priority: Option<i32>,
    /// Logical core to pin to; `None` keeps the inherited affinity.
    #[serde(default)]
    pub affinity: Option<usize>,
}

impl ServiceSpec {
    /// Service with default priority and affinity.
    #[must_use]
    pub fn new(name: impl Into<String>, period_ms: u64) -> Self {
        Self {
            name: name.into(),
            period_ms,
            priority: None,
            affinity: None,
        }
    }

    /// Request a FIFO priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Request pinning to `core`.
    #[must_use]
    pub fn with_affinity(mut self, core: usize) -> Self {
        self.affinity = Some(core);
        self
    }

    /// Nominal period.
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Real-time request for the service thread.
    #[must_use]
    pub fn thread_setup(&self) -> ThreadSetup {
        ThreadSetup {
            priority: self.priority,
            affinity: self.affinity,
        }
    }

    /// Check the parameters against the platform.
    ///
    /// # Errors
    ///
    /// Returns the first invalid parameter found.
    pub fn validate(&self, capability: &dyn RtCapability) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.period_ms == 0 {
            return Err(ConfigError::ZeroPeriod {
                service: self.name.clone(),
            });
        }
        validate_setup(&self.name, self.thread_setup(), capability)
    }
}

pub(crate) fn validate_setup(
    thread: &str,
    setup: ThreadSetup,
    capability: &dyn RtCapability,
) -> Result<(), ConfigError> {
    if let Some(priority) = setup.priority {
        let range = capability.priority_range();
        if !range.contains(&priority) {
            return Err(ConfigError::PriorityOutOfRange {
                service: thread.to_owned(),
                priority,
                min: *range.start(),
                max: *range.end(),
            });
        }
    }
    if let Some(core) = setup.affinity {
        let available = capability.core_count();
        if core >= available {
            return Err(ConfigError::AffinityOutOfRange {
                service: thread.to_owned(),
                core,
                available,
            });
        }
    }
    Ok(())
}

/// Strategy used to produce releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReleaseDriverKind {
    /// One thread ticks at `resolution_us` and releases each service on the
    /// first tick at or after each multiple of its period.
    SharedTick {
        /// Tick resolution in microseconds.
        resolution_us: u64,
    },
    /// One timer thread per service, each at the service's exact period.
    PerServiceTimer,
}

impl ReleaseDriverKind {
    /// Shared tick at the default 1 ms resolution.
    #[must_use]
    pub const fn shared_tick() -> Self {
        Self::SharedTick {
            resolution_us: DEFAULT_TICK_RESOLUTION_US,
        }
    }
}

impl Default for ReleaseDriverKind {
    fn default() -> Self {
        Self::shared_tick()
    }
}

/// Sequencer-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Release driver strategy.
    pub driver: ReleaseDriverKind,
    /// Release credit semantics for every service.
    pub release_mode: ReleaseMode,
    /// Lock process memory when the driver is armed.
    pub lock_memory: bool,
    /// FIFO priority for the release driver thread(s).
    pub driver_priority: Option<i32>,
    /// Core for the release driver thread(s).
    pub driver_affinity: Option<usize>,
}

impl SequencerConfig {
    /// Start a builder.
    #[must_use]
    pub fn builder() -> SequencerConfigBuilder {
        SequencerConfigBuilder::default()
    }

    /// Check values that do not depend on the platform.
    ///
    /// # Errors
    ///
    /// Returns an error if the tick resolution is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let ReleaseDriverKind::SharedTick { resolution_us: 0 } = self.driver {
            return Err(ConfigError::ZeroResolution);
        }
        Ok(())
    }

    /// Real-time request for the driver thread(s).
    #[must_use]
    pub fn driver_setup(&self) -> ThreadSetup {
        ThreadSetup {
            priority: self.driver_priority,
            affinity: self.driver_affinity,
        }
    }
}

/// Builder for [`SequencerConfig`].
#[derive(Debug, Default)]
pub struct SequencerConfigBuilder {
    config: SequencerConfig,
}

impl SequencerConfigBuilder {
    /// Use the shared tick driver at `resolution`.
    #[must_use]
    pub fn shared_tick(mut self, resolution: Duration) -> Self {
        self.config.driver = ReleaseDriverKind::SharedTick {
            resolution_us: u64::try_from(resolution.as_micros()).unwrap_or(u64::MAX),
        };
        self
    }

    /// Use one timer thread per service.
    #[must_use]
    pub fn per_service_timer(mut self) -> Self {
        self.config.driver = ReleaseDriverKind::PerServiceTimer;
        self
    }

    /// Set release credit semantics.
    #[must_use]
    pub fn release_mode(mut self, mode: ReleaseMode) -> Self {
        self.config.release_mode = mode;
        self
    }

    /// Lock process memory on start.
    #[must_use]
    pub fn lock_memory(mut self, enabled: bool) -> Self {
        self.config.lock_memory = enabled;
        self
    }

    /// FIFO priority for the driver thread(s).
    #[must_use]
    pub fn driver_priority(mut self, priority: i32) -> Self {
        self.config.driver_priority = Some(priority);
        self
    }

    /// Core for the driver thread(s).
    #[must_use]
    pub fn driver_affinity(mut self, core: usize) -> Self {
        self.config.driver_affinity = Some(core);
        self
    }

    /// Finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<SequencerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

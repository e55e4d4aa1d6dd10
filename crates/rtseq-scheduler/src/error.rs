//! Error types for the sequencer.
//!
//! Configuration and driver failures are returned synchronously to the caller
//! of `add_service` / `start_services`. Scheduling warnings and task faults are
//! never returned: they are logged and counted where they happen.

use rtseq_platform::PlatformError;
use std::time::Duration;
use thiserror::Error;

/// Invalid service or sequencer parameters. Raised before any thread exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Service name is empty.
    #[error("service name must not be empty")]
    EmptyName,

    /// Period is zero.
    #[error("service '{service}': period must be greater than 0")]
    ZeroPeriod {
        /// Offending service.
        service: String,
    },

    /// Priority outside the platform real-time range.
    #[error("service '{service}': priority {priority} outside {min}..={max}")]
    PriorityOutOfRange {
        /// Offending service (or the release driver).
        service: String,
        /// Requested priority.
        priority: i32,
        /// Lowest real-time priority.
        min: i32,
        /// Highest real-time priority.
        max: i32,
    },

    /// Affinity names a core that does not exist.
    #[error("service '{service}': core {core} not available ({available} logical cores)")]
    AffinityOutOfRange {
        /// Offending service (or the release driver).
        service: String,
        /// Requested core.
        core: usize,
        /// Logical core count.
        available: usize,
    },

    /// Another service already uses this name.
    #[error("service '{service}' already registered")]
    DuplicateName {
        /// Offending service.
        service: String,
    },

    /// Shared tick resolution is zero.
    #[error("tick resolution must be greater than 0")]
    ZeroResolution,
}

/// The release driver could not be armed.
#[derive(Debug, Error)]
pub enum ReleaseDriverError {
    /// A driver thread could not be spawned.
    #[error("failed to spawn release thread '{thread}': {source}")]
    Spawn {
        /// Thread name.
        thread: String,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// The shared tick is coarser than a service period.
    #[error("tick resolution {resolution:?} exceeds period {period:?} of service '{service}'")]
    ResolutionExceedsPeriod {
        /// Offending service.
        service: String,
        /// Configured resolution.
        resolution: Duration,
        /// Service period.
        period: Duration,
    },
}

/// A real-time request that could not be honoured. The thread keeps running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingWarning {
    /// FIFO priority not applied.
    #[error("'{thread}': real-time priority {priority} not applied: {source}")]
    PriorityNotApplied {
        /// Service or driver thread name.
        thread: String,
        /// Requested priority.
        priority: i32,
        /// Platform refusal.
        #[source]
        source: PlatformError,
    },

    /// Core pinning not applied.
    #[error("'{thread}': pinning to core {core} not applied: {source}")]
    AffinityNotApplied {
        /// Service or driver thread name.
        thread: String,
        /// Requested core.
        core: usize,
        /// Platform refusal.
        #[source]
        source: PlatformError,
    },

    /// Process memory could not be locked.
    #[error("memory locking not applied: {source}")]
    MemoryLockNotApplied {
        /// Platform refusal.
        #[source]
        source: PlatformError,
    },
}

/// A task body panicked. Contained to its service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task of service '{service}' faulted: {message}")]
pub struct TaskFault {
    /// Service whose task faulted.
    pub service: String,
    /// Panic payload rendered as text.
    pub message: String,
}

impl TaskFault {
    /// Build from a `catch_unwind` payload.
    #[must_use]
    pub fn from_panic(service: &str, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        Self {
            service: service.to_owned(),
            message,
        }
    }
}

/// Errors returned by [`Service`](crate::Service) and [`Sequencer`](crate::Sequencer).
#[derive(Debug, Error)]
pub enum SequencerError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Release driver could not be armed.
    #[error(transparent)]
    ReleaseDriver(#[from] ReleaseDriverError),

    /// Services can only be added before `start_services`.
    #[error("sequencer already started")]
    AlreadyStarted,

    /// The sequencer has been stopped and cannot be reused.
    #[error("sequencer stopped")]
    Stopped,

    /// The service thread could not be spawned.
    #[error("failed to spawn thread for service '{service}': {source}")]
    Spawn {
        /// Service name.
        service: String,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// The service thread exited before reaching its wait loop.
    #[error("service '{service}' thread exited during startup")]
    StartupFailed {
        /// Service name.
        service: String,
    },
}

impl SequencerError {
    /// Whether the error is a configuration problem.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result alias for sequencer operations.
pub type SequencerResult<T> = std::result::Result<T, SequencerError>;

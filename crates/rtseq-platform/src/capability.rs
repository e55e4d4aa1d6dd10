//! Capability interface for real-time thread configuration.

use crate::error::{PlatformError, PlatformResult};
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Priority range assumed when the platform cannot report one (POSIX `SCHED_FIFO`).
pub const DEFAULT_RT_PRIORITY_RANGE: RangeInclusive<i32> = 1..=99;

/// Real-time operations applied to the *calling* thread.
///
/// Implementations must be cheap to share across threads: the sequencer hands
/// one instance to every service thread and to the release driver.
pub trait RtCapability: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Inclusive range of valid real-time FIFO priorities.
    fn priority_range(&self) -> RangeInclusive<i32>;

    /// Number of logical cores a thread may be pinned to.
    fn core_count(&self) -> usize;

    /// Switch the calling thread to the FIFO policy at `priority`.
    ///
    /// # Errors
    ///
    /// Returns an error when the priority is out of range or the OS refuses.
    fn apply_real_time_priority(&self, priority: i32) -> PlatformResult;

    /// Restrict the calling thread to a single logical core.
    ///
    /// # Errors
    ///
    /// Returns an error when the core does not exist or the OS refuses.
    fn pin_to_core(&self, core: usize) -> PlatformResult;

    /// Lock current and future process memory into RAM.
    ///
    /// # Errors
    ///
    /// Returns an error when the OS refuses.
    fn lock_memory(&self) -> PlatformResult;
}

/// Capability backend for the platform this binary was built for.
#[must_use]
pub fn native() -> Arc<dyn RtCapability> {
    #[cfg(target_os = "linux")]
    {
        Arc::new(crate::linux::LinuxCapability::new())
    }
    #[cfg(not(target_os = "linux"))]
    {
        Arc::new(crate::fallback::FallbackCapability::new())
    }
}

/// Outcome of one requested setup step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SetupOutcome {
    /// Nothing was requested.
    #[default]
    NotRequested,
    /// Applied successfully.
    Applied,
    /// Requested but refused; the thread runs with the default.
    Failed(PlatformError),
}

impl SetupOutcome {
    fn from_result(result: PlatformResult) -> Self {
        match result {
            Ok(()) => Self::Applied,
            Err(err) => Self::Failed(err),
        }
    }

    /// The error, if the step was refused.
    #[must_use]
    pub fn error(&self) -> Option<&PlatformError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the step was applied.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Per-thread real-time request: priority and core binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreadSetup {
    /// FIFO priority; `None` keeps the default policy.
    pub priority: Option<i32>,
    /// Logical core; `None` keeps the inherited affinity.
    pub affinity: Option<usize>,
}

impl ThreadSetup {
    /// Request nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            priority: None,
            affinity: None,
        }
    }

    /// Set the FIFO priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the core binding.
    #[must_use]
    pub const fn with_affinity(mut self, core: usize) -> Self {
        self.affinity = Some(core);
        self
    }

    /// Apply to the calling thread. Never fails; refusals are reported per step.
    ///
    /// Affinity is applied before priority so that a FIFO thread never runs on
    /// a core it is about to leave.
    pub fn apply(&self, capability: &dyn RtCapability) -> AppliedSetup {
        let affinity = self
            .affinity
            .map_or(SetupOutcome::NotRequested, |core| {
                SetupOutcome::from_result(capability.pin_to_core(core))
            });
        let priority = self
            .priority
            .map_or(SetupOutcome::NotRequested, |priority| {
                SetupOutcome::from_result(capability.apply_real_time_priority(priority))
            });
        AppliedSetup { priority, affinity }
    }
}

/// What [`ThreadSetup::apply`] managed to do.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppliedSetup {
    /// Priority step outcome.
    pub priority: SetupOutcome,
    /// Affinity step outcome.
    pub affinity: SetupOutcome,
}

impl AppliedSetup {
    /// True when every requested step was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !matches!(self.priority, SetupOutcome::Failed(_))
            && !matches!(self.affinity, SetupOutcome::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Refusing;

    impl RtCapability for Refusing {
        fn name(&self) -> &'static str {
            "refusing"
        }
        fn priority_range(&self) -> RangeInclusive<i32> {
            DEFAULT_RT_PRIORITY_RANGE
        }
        fn core_count(&self) -> usize {
            4
        }
        fn apply_real_time_priority(&self, _priority: i32) -> PlatformResult {
            Err(PlatformError::from_os_code("pthread_setschedparam", 1))
        }
        fn pin_to_core(&self, _core: usize) -> PlatformResult {
            Ok(())
        }
        fn lock_memory(&self) -> PlatformResult {
            Err(PlatformError::Unsupported("mlockall"))
        }
    }

    #[test]
    fn test_empty_setup_requests_nothing() {
        let applied = ThreadSetup::none().apply(&Refusing);
        assert_eq!(applied.priority, SetupOutcome::NotRequested);
        assert_eq!(applied.affinity, SetupOutcome::NotRequested);
        assert!(applied.is_complete());
    }

    #[test]
    fn test_partial_failure_is_reported_per_step() {
        let applied = ThreadSetup::none()
            .with_priority(80)
            .with_affinity(1)
            .apply(&Refusing);

        assert!(applied.affinity.is_applied());
        assert!(
            applied
                .priority
                .error()
                .is_some_and(PlatformError::is_permission_denied)
        );
        assert!(!applied.is_complete());
    }

    #[test]
    fn test_native_reports_sane_limits() {
        let cap = native();
        assert!(cap.core_count() >= 1);
        assert!(!cap.priority_range().is_empty());
    }
}

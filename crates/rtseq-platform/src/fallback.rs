//! Fallback backend for platforms without a native real-time API.

use crate::capability::{DEFAULT_RT_PRIORITY_RANGE, RtCapability};
use crate::error::{PlatformError, PlatformResult};
use std::ops::RangeInclusive;

/// No-op capability: validates arguments, then leaves the thread untouched.
#[derive(Debug, Clone)]
pub struct FallbackCapability {
    cores: usize,
}

impl FallbackCapability {
    /// Probe the core count once.
    pub fn new() -> Self {
        Self {
            cores: logical_cores(),
        }
    }
}

#[cfg(target_os = "linux")]
fn logical_cores() -> usize {
    crate::linux::configured_cores()
}

#[cfg(not(target_os = "linux"))]
fn logical_cores() -> usize {
    num_cpus::get()
}

impl Default for FallbackCapability {
    fn default() -> Self {
        Self::new()
    }
}

impl RtCapability for FallbackCapability {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn priority_range(&self) -> RangeInclusive<i32> {
        DEFAULT_RT_PRIORITY_RANGE
    }

    fn core_count(&self) -> usize {
        self.cores
    }

    fn apply_real_time_priority(&self, priority: i32) -> PlatformResult {
        let range = self.priority_range();
        if !range.contains(&priority) {
            return Err(PlatformError::PriorityOutOfRange {
                priority,
                min: *range.start(),
                max: *range.end(),
            });
        }
        tracing::debug!(priority, "real-time priority is a no-op on this platform");
        Ok(())
    }

    fn pin_to_core(&self, core: usize) -> PlatformResult {
        if core >= self.cores {
            return Err(PlatformError::CoreOutOfRange {
                core,
                available: self.cores,
            });
        }
        tracing::debug!(core, "core pinning is a no-op on this platform");
        Ok(())
    }

    fn lock_memory(&self) -> PlatformResult {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_requests_are_accepted() {
        let cap = FallbackCapability::new();
        assert_eq!(cap.apply_real_time_priority(99), Ok(()));
        assert_eq!(cap.pin_to_core(0), Ok(()));
        assert_eq!(cap.lock_memory(), Ok(()));
    }

    #[test]
    fn test_invalid_requests_are_still_rejected() {
        let cap = FallbackCapability::new();
        assert!(matches!(
            cap.apply_real_time_priority(0),
            Err(PlatformError::PriorityOutOfRange { min: 1, max: 99, .. })
        ));
        assert!(matches!(
            cap.pin_to_core(usize::MAX),
            Err(PlatformError::CoreOutOfRange { .. })
        ));
    }

    #[test]
    fn test_core_count_covers_every_allowed_core() {
        let cap = FallbackCapability::new();
        assert!(cap.core_count() >= num_cpus::get());
        assert_eq!(cap.pin_to_core(cap.core_count().saturating_sub(1)), Ok(()));
    }
}

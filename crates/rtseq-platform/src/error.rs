//! Error types for platform real-time operations.

use thiserror::Error;

/// Failure to apply a real-time capability to the calling thread or process.
///
/// None of these are fatal to the caller: a thread that cannot be promoted or
/// pinned keeps running under the default policy and affinity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The process lacks the privilege for the operation (e.g. no `CAP_SYS_NICE`).
    #[error("insufficient privilege for {operation} (os error {code})")]
    PermissionDenied {
        /// The system call that was refused.
        operation: &'static str,
        /// Raw OS error code.
        code: i32,
    },

    /// The operating system rejected the operation.
    #[error("{operation} failed (os error {code})")]
    Os {
        /// The system call that failed.
        operation: &'static str,
        /// Raw OS error code.
        code: i32,
    },

    /// Requested priority lies outside the platform real-time range.
    #[error("priority {priority} outside supported range {min}..={max}")]
    PriorityOutOfRange {
        /// Requested priority.
        priority: i32,
        /// Lowest real-time priority.
        min: i32,
        /// Highest real-time priority.
        max: i32,
    },

    /// Requested core does not exist on this machine.
    #[error("core {core} not available ({available} logical cores)")]
    CoreOutOfRange {
        /// Requested logical core index.
        core: usize,
        /// Number of logical cores.
        available: usize,
    },

    /// The capability does not exist on this platform.
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

impl PlatformError {
    /// Classify a raw OS error code returned by `operation`.
    #[must_use]
    pub fn from_os_code(operation: &'static str, code: i32) -> Self {
        // EPERM is 1 on every platform this crate builds the native backend for.
        const EPERM: i32 = 1;
        if code == EPERM {
            Self::PermissionDenied { operation, code }
        } else {
            Self::Os { operation, code }
        }
    }

    /// Whether the failure is a privilege problem the operator can fix.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Result alias for platform operations.
pub type PlatformResult<T = ()> = Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eperm_is_permission_denied() {
        let err = PlatformError::from_os_code("pthread_setschedparam", 1);
        assert!(err.is_permission_denied());
        assert!(err.to_string().contains("pthread_setschedparam"));
    }

    #[test]
    fn test_other_codes_are_os_errors() {
        let err = PlatformError::from_os_code("sched_setaffinity", 22);
        assert_eq!(
            err,
            PlatformError::Os {
                operation: "sched_setaffinity",
                code: 22
            }
        );
        assert!(!err.is_permission_denied());
    }
}

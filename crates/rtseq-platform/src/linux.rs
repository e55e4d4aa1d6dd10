//! Linux backend: `SCHED_FIFO`, `sched_setaffinity` and `mlockall`.
//!
//! Every call targets pid 0, which Linux resolves to the calling *thread*, so
//! each service thread configures itself after it has been spawned.

#![expect(unsafe_code, reason = "libc scheduling calls have no safe wrapper in the dependency set")]

use crate::capability::{DEFAULT_RT_PRIORITY_RANGE, RtCapability};
use crate::error::{PlatformError, PlatformResult};
use libc::{MCL_CURRENT, MCL_FUTURE, SCHED_FIFO, cpu_set_t, sched_param};
use std::ops::RangeInclusive;

/// Native Linux capability backend.
#[derive(Debug, Clone)]
pub struct LinuxCapability {
    cores: usize,
}

impl LinuxCapability {
    /// Probe the machine once.
    pub fn new() -> Self {
        Self {
            cores: configured_cores(),
        }
    }
}

/// Logical cores the kernel knows about, including those outside this
/// process's cpuset.
pub(crate) fn configured_cores() -> usize {
    // SAFETY: pure query with a valid name constant.
    let configured = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_CONF) };
    usize::try_from(configured)
        .ok()
        .filter(|&n| n > 0)
        .map_or_else(num_cpus::get, |n| n.max(num_cpus::get()))
}

impl Default for LinuxCapability {
    fn default() -> Self {
        Self::new()
    }
}

fn last_os_error(operation: &'static str) -> PlatformError {
    let code = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
    PlatformError::from_os_code(operation, code)
}

impl RtCapability for LinuxCapability {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn priority_range(&self) -> RangeInclusive<i32> {
        // SAFETY: pure query with a valid policy constant.
        let min = unsafe { libc::sched_get_priority_min(SCHED_FIFO) };
        // SAFETY: pure query with a valid policy constant.
        let max = unsafe { libc::sched_get_priority_max(SCHED_FIFO) };
        if min < 0 || max < min {
            DEFAULT_RT_PRIORITY_RANGE
        } else {
            min..=max
        }
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

        // SAFETY: sched_param is plain old data; all-zero is a valid value.
        let mut param: sched_param = unsafe { std::mem::zeroed() };
        param.sched_priority = priority;

        // SAFETY: `param` is initialised and outlives the call.
        let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
        if rc != 0 {
            return Err(last_os_error("sched_setscheduler"));
        }
        Ok(())
    }

    fn pin_to_core(&self, core: usize) -> PlatformResult {
        let set_size = usize::try_from(libc::CPU_SETSIZE).unwrap_or(0);
        if core >= self.cores || core >= set_size {
            return Err(PlatformError::CoreOutOfRange {
                core,
                available: self.cores,
            });
        }

        // SAFETY: cpu_set_t is a plain bit array; all-zero is the empty set.
        let mut set: cpu_set_t = unsafe { std::mem::zeroed() };
        // SAFETY: `core` was bounds-checked against CPU_SETSIZE above.
        unsafe { libc::CPU_SET(core, &mut set) };

        // SAFETY: `set` is initialised and its size is passed alongside.
        let rc = unsafe { libc::sched_setaffinity(0, std::mem::size_of::<cpu_set_t>(), &set) };
        if rc != 0 {
            return Err(last_os_error("sched_setaffinity"));
        }
        Ok(())
    }

    fn lock_memory(&self) -> PlatformResult {
        // SAFETY: flags are valid constants; no pointers involved.
        let rc = unsafe { libc::mlockall(MCL_CURRENT | MCL_FUTURE) };
        if rc != 0 {
            return Err(last_os_error("mlockall"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_range_matches_posix() {
        let cap = LinuxCapability::new();
        let range = cap.priority_range();
        assert!(*range.start() >= 1);
        assert!(*range.end() <= 99);
    }

    #[test]
    fn test_out_of_range_priority_rejected_before_syscall() {
        let cap = LinuxCapability::new();
        let result = cap.apply_real_time_priority(1_000);
        assert!(matches!(
            result,
            Err(PlatformError::PriorityOutOfRange { priority: 1_000, .. })
        ));
    }

    #[test]
    fn test_core_count_includes_cores_outside_affinity_mask() {
        let cap = LinuxCapability::new();
        assert!(cap.core_count() >= num_cpus::get());
        assert_eq!(cap.core_count(), configured_cores());
    }

    #[test]
    fn test_pin_to_missing_core_rejected() {
        let cap = LinuxCapability::new();
        let result = cap.pin_to_core(cap.core_count());
        assert!(matches!(result, Err(PlatformError::CoreOutOfRange { .. })));
    }

    #[test]
    fn test_pin_to_core_zero_in_worker_thread() {
        // Scratch thread so the harness thread keeps its affinity. Restricted
        // cpusets may still refuse core 0, but never as out of range.
        let handle = std::thread::spawn(|| LinuxCapability::new().pin_to_core(0));
        let outcome = handle.join();
        assert!(matches!(outcome, Ok(_)), "pin thread panicked");
        assert!(!matches!(outcome, Ok(Err(PlatformError::CoreOutOfRange { .. }))));
    }
}

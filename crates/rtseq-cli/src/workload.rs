//! Synthetic task bodies and the context they share.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// What a configured service does on each release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Workload {
    /// Return immediately.
    #[default]
    Noop,
    /// Spin on the CPU for `ms` milliseconds.
    Busy { ms: u64 },
    /// Block for `ms` milliseconds.
    Sleep { ms: u64 },
    /// Panic on every `n`th execution.
    FaultEvery { n: u64 },
}

impl Workload {
    /// Reject parameters that cannot run.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::FaultEvery { n: 0 } => Err("fault_every.n must be greater than 0".into()),
            _ => Ok(()),
        }
    }

    /// Build the task body. Every body reports into `context`.
    pub fn into_task(self, context: Arc<RunContext>) -> impl FnMut() + Send + 'static {
        let mut executions: u64 = 0;
        move || {
            executions = executions.wrapping_add(1);
            context.executions.fetch_add(1, Ordering::Relaxed);
            match self {
                Self::Noop => {}
                Self::Busy { ms } => spin_for(Duration::from_millis(ms)),
                Self::Sleep { ms } => std::thread::sleep(Duration::from_millis(ms)),
                Self::FaultEvery { n } => {
                    if n > 0 && executions.is_multiple_of(n) {
                        context.injected_faults.fetch_add(1, Ordering::Relaxed);
                        std::panic::panic_any(format!("injected fault at execution {executions}"));
                    }
                }
            }
        }
    }
}

impl std::fmt::Display for Workload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Noop => write!(f, "noop"),
            Self::Busy { ms } => write!(f, "busy {ms} ms"),
            Self::Sleep { ms } => write!(f, "sleep {ms} ms"),
            Self::FaultEvery { n } => write!(f, "fault every {n}"),
        }
    }
}

fn spin_for(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}

/// State shared by the run loop, the Ctrl-C handler and every task body.
#[derive(Debug)]
pub struct RunContext {
    stop: AtomicBool,
    executions: AtomicU64,
    injected_faults: AtomicU64,
    started: Instant,
}

impl RunContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            stop: AtomicBool::new(false),
            executions: AtomicU64::new(0),
            injected_faults: AtomicU64::new(0),
            started: Instant::now(),
        })
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    pub fn injected_faults(&self) -> u64 {
        self.injected_faults.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_counts_executions() {
        let context = RunContext::new();
        let mut task = Workload::Noop.into_task(Arc::clone(&context));
        for _ in 0..3 {
            task();
        }
        assert_eq!(context.executions(), 3);
        assert_eq!(context.injected_faults(), 0);
    }

    #[test]
    fn busy_spins_at_least_the_requested_time() {
        let context = RunContext::new();
        let mut task = Workload::Busy { ms: 5 }.into_task(context);
        let start = Instant::now();
        task();
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn fault_every_panics_on_schedule() {
        let context = RunContext::new();
        let mut task = Workload::FaultEvery { n: 3 }.into_task(Arc::clone(&context));
        let outcomes: Vec<bool> = (0..6)
            .map(|_| std::panic::catch_unwind(std::panic::AssertUnwindSafe(&mut task)).is_err())
            .collect();
        assert_eq!(outcomes, vec![false, false, true, false, false, true]);
        assert_eq!(context.injected_faults(), 2);
        assert_eq!(context.executions(), 6);
    }

    #[test]
    fn zero_fault_interval_rejected() {
        assert!(Workload::FaultEvery { n: 0 }.validate().is_err_and(|e| e.contains("fault_every")));
        assert_eq!(Workload::Sleep { ms: 0 }.validate(), Ok(()));
    }

    #[test]
    fn workload_from_yaml() -> Result<(), Box<dyn std::error::Error>> {
        let busy: Workload = serde_yaml::from_str("kind: busy\nms: 20\n")?;
        assert_eq!(busy, Workload::Busy { ms: 20 });
        let noop: Workload = serde_yaml::from_str("kind: noop\n")?;
        assert_eq!(noop, Workload::Noop);
        Ok(())
    }

    #[test]
    fn stop_flag_is_shared() {
        let context = RunContext::new();
        let handler = Arc::clone(&context);
        assert!(!context.stop_requested());
        handler.request_stop();
        assert!(context.stop_requested());
    }
}

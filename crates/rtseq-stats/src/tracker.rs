//! Running timing aggregates for one service.
//!
//! The tracker is mutated only by its service thread. Each execution costs a
//! handful of comparisons and additions and never allocates.

use crate::report::ServiceReport;
use std::time::{Duration, Instant};

/// Execution time, start jitter and deadline-miss aggregates.
///
/// Start jitter is `|interval between consecutive starts - period|`; it needs
/// two starts, so the first execution contributes no jitter sample.
///
/// Before the first execution every accessor returns zero.
#[derive(Debug, Clone)]
pub struct StatisticsTracker {
    period: Duration,
    count: u64,
    min_exec: Option<Duration>,
    max_exec: Duration,
    total_exec: Duration,
    last_exec: Duration,
    min_start_jitter: Option<Duration>,
    max_start_jitter: Duration,
    missed_deadlines: u64,
    faults: u64,
    last_start: Option<Instant>,
}

impl StatisticsTracker {
    /// Empty tracker for a service with the given nominal period.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            count: 0,
            min_exec: None,
            max_exec: Duration::ZERO,
            total_exec: Duration::ZERO,
            last_exec: Duration::ZERO,
            min_start_jitter: None,
            max_start_jitter: Duration::ZERO,
            missed_deadlines: 0,
            faults: 0,
            last_start: None,
        }
    }

    /// Record the start of an execution.
    ///
    /// Returns the start jitter relative to the previous start, if any.
    pub fn record_start(&mut self, start: Instant) -> Option<Duration> {
        let jitter = self.last_start.map(|previous| {
            start
                .saturating_duration_since(previous)
                .abs_diff(self.period)
        });
        self.last_start = Some(start);

        if let Some(jitter) = jitter {
            self.min_start_jitter = Some(self.min_start_jitter.map_or(jitter, |m| m.min(jitter)));
            self.max_start_jitter = self.max_start_jitter.max(jitter);
        }
        jitter
    }

    /// Record a completed execution. Returns `true` when it missed its deadline.
    pub fn record_execution(&mut self, elapsed: Duration) -> bool {
        self.count = self.count.saturating_add(1);
        self.total_exec = self.total_exec.saturating_add(elapsed);
        self.last_exec = elapsed;
        self.min_exec = Some(self.min_exec.map_or(elapsed, |m| m.min(elapsed)));
        self.max_exec = self.max_exec.max(elapsed);

        let missed = elapsed > self.period;
        if missed {
            self.missed_deadlines = self.missed_deadlines.saturating_add(1);
        }
        missed
    }

    /// Record that the task body faulted. The execution itself is still
    /// recorded through [`record_execution`](Self::record_execution).
    pub fn record_fault(&mut self) {
        self.faults = self.faults.saturating_add(1);
    }

    /// Nominal period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Completed executions.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Executions whose duration exceeded the period.
    #[must_use]
    pub fn missed_deadlines(&self) -> u64 {
        self.missed_deadlines
    }

    /// Executions whose task body faulted.
    #[must_use]
    pub fn faults(&self) -> u64 {
        self.faults
    }

    /// Shortest execution, zero before the first.
    #[must_use]
    pub fn min_exec(&self) -> Duration {
        self.min_exec.unwrap_or(Duration::ZERO)
    }

    /// Longest execution.
    #[must_use]
    pub fn max_exec(&self) -> Duration {
        self.max_exec
    }

    /// Most recent execution.
    #[must_use]
    pub fn last_exec(&self) -> Duration {
        self.last_exec
    }

    /// Mean execution time, truncated to whole nanoseconds.
    #[must_use]
    pub fn avg_exec(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let avg_ns = self.total_exec.as_nanos() / u128::from(self.count);
        Duration::from_nanos(u64::try_from(avg_ns).unwrap_or(u64::MAX))
    }

    /// `max_exec - min_exec`.
    #[must_use]
    pub fn exec_time_spread(&self) -> Duration {
        self.max_exec.saturating_sub(self.min_exec())
    }

    /// `max_start_jitter - min_start_jitter`.
    #[must_use]
    pub fn start_jitter_spread(&self) -> Duration {
        self.min_start_jitter
            .map_or(Duration::ZERO, |min| self.max_start_jitter.saturating_sub(min))
    }

    /// Largest observed start jitter.
    #[must_use]
    pub fn max_start_jitter(&self) -> Duration {
        self.max_start_jitter
    }

    /// Snapshot as a report tagged with the service name.
    #[must_use]
    pub fn report(&self, name: &str) -> ServiceReport {
        ServiceReport {
            name: name.to_owned(),
            period: self.period,
            count: self.count,
            min_exec: self.min_exec(),
            max_exec: self.max_exec,
            avg_exec: self.avg_exec(),
            exec_time_spread: self.exec_time_spread(),
            start_jitter_spread: self.start_jitter_spread(),
            max_start_jitter: self.max_start_jitter,
            missed_deadline_count: self.missed_deadlines,
            fault_count: self.faults,
        }
    }
}

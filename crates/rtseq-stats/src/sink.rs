//! Pluggable destinations for service reports.

use crate::report::ServiceReport;
use parking_lot::Mutex;

/// Receives the final report of each service when it stops.
///
/// Called from the thread that stops the service, never from the service
/// thread itself, so implementations may block briefly.
pub trait ReportSink: Send + Sync {
    /// Deliver one report.
    fn deliver(&self, report: &ServiceReport);
}

impl<F> ReportSink for F
where
    F: Fn(&ServiceReport) + Send + Sync,
{
    fn deliver(&self, report: &ServiceReport) {
        self(report);
    }
}

/// Logs each report as one structured `tracing` event at INFO.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReportSink;

impl ReportSink for TracingReportSink {
    fn deliver(&self, report: &ServiceReport) {
        tracing::info!(
            service = %report.name,
            period_ms = report.period.as_millis(),
            count = report.count,
            min_exec_us = report.min_exec.as_micros(),
            max_exec_us = report.max_exec.as_micros(),
            avg_exec_us = report.avg_exec.as_micros(),
            exec_spread_us = report.exec_time_spread.as_micros(),
            start_jitter_spread_us = report.start_jitter_spread.as_micros(),
            missed_deadlines = report.missed_deadline_count,
            faults = report.fault_count,
            "service statistics"
        );
    }
}

/// Keeps every delivered report in memory.
#[derive(Debug, Default)]
pub struct CollectingReportSink {
    reports: Mutex<Vec<ServiceReport>>,
}

impl CollectingReportSink {
    /// Empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the reports delivered so far, in delivery order.
    #[must_use]
    pub fn reports(&self) -> Vec<ServiceReport> {
        self.reports.lock().clone()
    }

    /// Remove and return the reports delivered so far.
    #[must_use]
    pub fn take(&self) -> Vec<ServiceReport> {
        std::mem::take(&mut *self.reports.lock())
    }

    /// Number of reports delivered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    /// Whether nothing was delivered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

impl ReportSink for CollectingReportSink {
    fn deliver(&self, report: &ServiceReport) {
        self.reports.lock().push(report.clone());
    }
}

/// Forwards each report to several sinks in order.
pub struct FanoutReportSink {
    sinks: Vec<std::sync::Arc<dyn ReportSink>>,
}

impl FanoutReportSink {
    /// Fan out to `sinks`.
    #[must_use]
    pub fn new(sinks: Vec<std::sync::Arc<dyn ReportSink>>) -> Self {
        Self { sinks }
    }
}

impl std::fmt::Debug for FanoutReportSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutReportSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl ReportSink for FanoutReportSink {
    fn deliver(&self, report: &ServiceReport) {
        for sink in &self.sinks {
            sink.deliver(report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::StatisticsTracker;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn report(name: &str) -> ServiceReport {
        StatisticsTracker::new(Duration::from_millis(5)).report(name)
    }

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingReportSink::new();
        sink.deliver(&report("a"));
        sink.deliver(&report("b"));

        let names: Vec<_> = sink.reports().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_closure_is_a_sink() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sink = move |_: &ServiceReport| {
            counter.fetch_add(1, Ordering::Relaxed);
        };
        sink.deliver(&report("a"));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = Arc::new(CollectingReportSink::new());
        let second = Arc::new(CollectingReportSink::new());
        let fanout = FanoutReportSink::new(vec![
            first.clone() as Arc<dyn ReportSink>,
            second.clone() as Arc<dyn ReportSink>,
            Arc::new(TracingReportSink),
        ]);

        fanout.deliver(&report("a"));

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }
}

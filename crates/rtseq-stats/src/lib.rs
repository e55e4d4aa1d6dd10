//! # rtseq-stats
//!
//! Timing statistics for periodic services.
//!
//! - [`tracker`] - [`StatisticsTracker`], running aggregates owned by one service thread
//! - [`report`] - [`ServiceReport`], the snapshot/final record
//! - [`sink`] - [`ReportSink`] and the stock sinks
//!
//! ## Usage
//!
//! ```rust
//! use rtseq_stats::{ReportSink, StatisticsTracker, TracingReportSink};
//! use std::time::{Duration, Instant};
//!
//! let mut tracker = StatisticsTracker::new(Duration::from_millis(100));
//!
//! let start = Instant::now();
//! tracker.record_start(start);
//! // ... run the task ...
//! let missed = tracker.record_execution(start.elapsed());
//! assert!(!missed);
//!
//! TracingReportSink.deliver(&tracker.report("camera"));
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]

pub mod report;
pub mod sink;
pub mod tracker;

pub use report::ServiceReport;
pub use sink::{CollectingReportSink, FanoutReportSink, ReportSink, TracingReportSink};
pub use tracker::StatisticsTracker;

//! Final and live statistics records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Timing summary of one service.
///
/// Durations serialize as fractional milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReport {
    /// Service name.
    pub name: String,
    /// Nominal period.
    #[serde(rename = "period_ms", with = "duration_ms")]
    pub period: Duration,
    /// Completed executions.
    pub count: u64,
    /// Shortest execution.
    #[serde(rename = "min_exec_ms", with = "duration_ms")]
    pub min_exec: Duration,
    /// Longest execution.
    #[serde(rename = "max_exec_ms", with = "duration_ms")]
    pub max_exec: Duration,
    /// Mean execution.
    #[serde(rename = "avg_exec_ms", with = "duration_ms")]
    pub avg_exec: Duration,
    /// `max_exec - min_exec`.
    #[serde(rename = "exec_time_spread_ms", with = "duration_ms")]
    pub exec_time_spread: Duration,
    /// Spread between the smallest and largest start jitter.
    #[serde(rename = "start_jitter_spread_ms", with = "duration_ms")]
    pub start_jitter_spread: Duration,
    /// Largest start jitter.
    #[serde(rename = "max_start_jitter_ms", with = "duration_ms")]
    pub max_start_jitter: Duration,
    /// Executions that took longer than the period.
    pub missed_deadline_count: u64,
    /// Executions whose task body faulted.
    pub fault_count: u64,
}

impl ServiceReport {
    /// Fraction of executions that missed their deadline (0.0 to 1.0).
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "ratio of counters, precision irrelevant")]
    pub fn missed_deadline_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.missed_deadline_count as f64 / self.count as f64
        }
    }

    /// Execution time as a fraction of the period (mean utilisation).
    #[must_use]
    pub fn utilisation(&self) -> f64 {
        if self.period.is_zero() {
            return 0.0;
        }
        self.avg_exec.as_secs_f64() / self.period.as_secs_f64()
    }
}

fn ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

impl fmt::Display for ServiceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Service] {}", self.name)?;
        writeln!(f, "  Period        : {:.3} ms", ms(self.period))?;
        writeln!(f, "  Executions    : {}", self.count)?;
        writeln!(f, "  Min Exec Time : {:.3} ms", ms(self.min_exec))?;
        writeln!(f, "  Max Exec Time : {:.3} ms", ms(self.max_exec))?;
        writeln!(f, "  Avg Exec Time : {:.3} ms", ms(self.avg_exec))?;
        writeln!(f, "  Exec Jitter   : {:.3} ms", ms(self.exec_time_spread))?;
        writeln!(f, "  Start Jitter  : {:.3} ms", ms(self.start_jitter_spread))?;
        writeln!(f, "  Missed        : {}", self.missed_deadline_count)?;
        write!(f, "  Faults        : {}", self.fault_count)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(super::ms(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(millis / 1_000.0).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ServiceReport {
        ServiceReport {
            name: "inference".to_owned(),
            period: Duration::from_millis(300),
            count: 4,
            min_exec: Duration::from_millis(100),
            max_exec: Duration::from_millis(400),
            avg_exec: Duration::from_millis(150),
            exec_time_spread: Duration::from_millis(300),
            start_jitter_spread: Duration::from_micros(250),
            max_start_jitter: Duration::from_micros(300),
            missed_deadline_count: 1,
            fault_count: 0,
        }
    }

    #[test]
    fn test_rates() {
        let report = sample();
        assert!((report.missed_deadline_rate() - 0.25).abs() < 1e-12);
        assert!((report.utilisation() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_display_lists_every_aggregate() {
        let text = sample().to_string();
        assert!(text.starts_with("[Service] inference"));
        assert!(text.contains("Period        : 300.000 ms"));
        assert!(text.contains("Start Jitter  : 0.250 ms"));
        assert!(text.contains("Missed        : 1"));
    }
}

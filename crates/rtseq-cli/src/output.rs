//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use rtseq_scheduler::{SchedulingWarning, ServiceInfo, ServiceReport};
use serde_json::json;
use std::time::Duration;

use crate::config::RunConfig;

/// Totals gathered by the shared run context.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub executions: u64,
    pub injected_faults: u64,
    pub interrupted: bool,
}

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "chain": error.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
        }
    });
    print_json(&error_json);
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    for cause in error.chain().skip(1) {
        eprintln!("  {} {}", "Caused by:".yellow(), cause);
    }
}

/// Print the final reports of a run
pub fn print_run(
    reports: &[ServiceReport],
    warnings: &[SchedulingWarning],
    summary: &RunSummary,
    json: bool,
) {
    if json {
        print_json(&json!({
            "success": true,
            "elapsed_ms": summary.elapsed.as_secs_f64() * 1_000.0,
            "interrupted": summary.interrupted,
            "executions": summary.executions,
            "injected_faults": summary.injected_faults,
            "warnings": warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "services": reports,
        }));
        return;
    }

    for warning in warnings {
        println!("{} {}", "Warning:".yellow().bold(), warning);
    }

    for report in reports {
        print_report_human(report);
    }

    let stopped_by = if summary.interrupted { " (interrupted)" } else { "" };
    println!(
        "{} {} executions in {:.1} ms, {} injected faults{}",
        "Run complete:".bold(),
        summary.executions,
        summary.elapsed.as_secs_f64() * 1_000.0,
        summary.injected_faults,
        stopped_by
    );
}

fn print_report_human(report: &ServiceReport) {
    let marker = if report.missed_deadline_count > 0 || report.fault_count > 0 {
        "●".red()
    } else {
        "●".green()
    };
    println!("{} {}", marker, report.name.bold());
    println!("    Period:          {:>10.3} ms", ms(report.period));
    println!("    Executions:      {:>10}", report.count);
    println!("    Min Exec Time:   {:>10.3} ms", ms(report.min_exec));
    println!("    Max Exec Time:   {:>10.3} ms", ms(report.max_exec));
    println!("    Avg Exec Time:   {:>10.3} ms", ms(report.avg_exec));
    println!("    Exec Jitter:     {:>10.3} ms", ms(report.exec_time_spread));
    println!("    Start Jitter:    {:>10.3} ms", ms(report.start_jitter_spread));
    println!("    Missed Deadlines:{:>10}", report.missed_deadline_count);
    if report.fault_count > 0 {
        println!("    Faults:          {:>10}", report.fault_count.to_string().red());
    }
}

/// Print a validated configuration and its period-sorted listing
pub fn print_check(config: &RunConfig, listing: &[ServiceInfo], json: bool) {
    if json {
        print_json(&json!({
            "success": true,
            "sequencer": config.sequencer,
            "services": listing,
        }));
        return;
    }

    println!("{}", "Configuration OK".green().bold());
    println!(
        "  Driver: {:?}, release mode: {:?}",
        config.sequencer.driver, config.sequencer.release_mode
    );
    println!("{}", "Services by period:".bold());
    for info in listing {
        let workload = config
            .services
            .iter()
            .find(|entry| entry.spec.name == info.name)
            .map(|entry| entry.workload.to_string())
            .unwrap_or_default();
        println!(
            "  {:<16} {:>6} ms  priority {:<7} core {:<7} {}",
            info.name.cyan(),
            info.period_ms,
            optional(info.priority),
            optional(info.affinity),
            workload.dimmed()
        );
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "default".to_owned(), |v| v.to_string())
}

fn ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format output as JSON: {e}"),
    }
}

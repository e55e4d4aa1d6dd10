//! `rtseq run`: run a configuration and print the final reports

use anyhow::{Context, Result};
use rtseq_stats::TracingReportSink;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::commands::build_sequencer;
use crate::config::RunConfig;
use crate::error::CliError;
use crate::output::{self, RunSummary};
use crate::workload::RunContext;

/// Poll interval of the run loop.
const POLL: Duration = Duration::from_millis(10);

pub fn execute(config_path: &Path, duration_ms: Option<u64>, json: bool) -> Result<()> {
    let config = RunConfig::load(config_path)
        .with_context(|| format!("failed to load '{}'", config_path.display()))?;

    let context = RunContext::new();
    {
        let handler_context = Arc::clone(&context);
        ctrlc::set_handler(move || handler_context.request_stop())
            .context("failed to install Ctrl-C handler")?;
    }

    let mut sequencer = build_sequencer(
        &config,
        rtseq_platform::native(),
        Arc::new(TracingReportSink),
        &context,
    )?;
    sequencer.log_services();
    sequencer
        .start_services()
        .map_err(CliError::from)
        .context("failed to start services")?;

    let deadline = duration_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
    info!(?duration_ms, "running; Ctrl-C to stop");
    while !context.stop_requested() && deadline.is_none_or(|d| Instant::now() < d) {
        std::thread::sleep(POLL);
    }

    let warnings = sequencer.scheduling_warnings();
    let reports = sequencer.stop_services();
    let summary = RunSummary {
        elapsed: context.elapsed(),
        executions: context.executions(),
        injected_faults: context.injected_faults(),
        interrupted: context.stop_requested(),
    };
    output::print_run(&reports, &warnings, &summary, json);
    Ok(())
}

//! `rtseq check`: validate a configuration without real-time side effects

use anyhow::{Context, Result};
use rtseq_platform::FallbackCapability;
use rtseq_scheduler::ServiceReport;
use std::path::Path;
use std::sync::Arc;

use crate::commands::build_sequencer;
use crate::config::RunConfig;
use crate::error::CliError;
use crate::output;
use crate::workload::RunContext;

pub fn execute(config_path: &Path, json: bool) -> Result<()> {
    let config = RunConfig::load(config_path)
        .with_context(|| format!("failed to load '{}'", config_path.display()))?;

    // The fallback backend validates the same ranges but changes nothing,
    // and arming then disarming the driver checks the tick plan. Reports of
    // a run that never executed are discarded.
    let context = RunContext::new();
    let mut sequencer = build_sequencer(
        &config,
        Arc::new(FallbackCapability::new()),
        Arc::new(|_: &ServiceReport| {}),
        &context,
    )?;
    sequencer
        .start_services()
        .map_err(CliError::from)
        .context("release driver rejected the configuration")?;
    sequencer.stop_services();

    output::print_check(&config, &sequencer.services_by_period(), json);
    Ok(())
}

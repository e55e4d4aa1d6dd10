//! Command implementations

pub mod check;
pub mod run;

use anyhow::{Context, Result};
use rtseq_platform::RtCapability;
use rtseq_scheduler::{ReportSink, Sequencer};
use std::sync::Arc;

use crate::config::RunConfig;
use crate::error::CliError;
use crate::workload::RunContext;

/// Build a sequencer for `config` with every service added, not yet started.
pub(crate) fn build_sequencer(
    config: &RunConfig,
    capability: Arc<dyn RtCapability>,
    sink: Arc<dyn ReportSink>,
    context: &Arc<RunContext>,
) -> Result<Sequencer> {
    let mut sequencer = Sequencer::new(config.sequencer.clone())
        .map_err(CliError::from)?
        .with_capability(capability)
        .with_sink(sink);

    for entry in &config.services {
        let task = entry.workload.into_task(Arc::clone(context));
        sequencer
            .add_service(entry.spec.clone(), task)
            .map_err(CliError::from)
            .with_context(|| format!("failed to add service '{}'", entry.spec.name))?;
    }
    Ok(sequencer)
}

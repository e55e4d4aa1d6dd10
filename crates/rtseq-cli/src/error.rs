//! Error types for the rtseq CLI

use rtseq_scheduler::{ReleaseDriverError, SequencerError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unsupported configuration format: {} (expected .yaml, .yml or .json)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    Sequencer(#[from] SequencerError),
}

impl CliError {
    /// Process exit code: 2 configuration, 3 release driver, 1 anything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidConfiguration(_)
            | Self::UnsupportedFormat(_)
            | Self::JsonError(_)
            | Self::YamlError(_) => 2,
            Self::Sequencer(err) => sequencer_exit_code(err),
            Self::Read { .. } => 1,
        }
    }
}

pub fn sequencer_exit_code(err: &SequencerError) -> u8 {
    match err {
        SequencerError::Config(_) => 2,
        SequencerError::ReleaseDriver(ReleaseDriverError::ResolutionExceedsPeriod { .. }) => 2,
        SequencerError::ReleaseDriver(_) => 3,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtseq_scheduler::ConfigError;
    use std::time::Duration;

    #[test]
    fn config_errors_exit_with_2() {
        let err = CliError::from(SequencerError::from(ConfigError::ZeroResolution));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(CliError::InvalidConfiguration("x".into()).exit_code(), 2);
    }

    #[test]
    fn driver_spawn_failure_exits_with_3() {
        let err = SequencerError::from(ReleaseDriverError::Spawn {
            thread: "rtseq-tick".into(),
            source: std::io::Error::other("no threads left"),
        });
        assert_eq!(sequencer_exit_code(&err), 3);
    }

    #[test]
    fn coarse_tick_is_a_configuration_problem() {
        let err = SequencerError::from(ReleaseDriverError::ResolutionExceedsPeriod {
            service: "fast".into(),
            resolution: Duration::from_millis(10),
            period: Duration::from_millis(5),
        });
        assert_eq!(sequencer_exit_code(&err), 2);
    }

    #[test]
    fn lifecycle_misuse_exits_with_1() {
        assert_eq!(sequencer_exit_code(&SequencerError::AlreadyStarted), 1);
    }
}

//! Prelude module for common sequencer types.
//!
//! This module provides a convenient way to import the most commonly used
//! types from the scheduler crate.

pub use crate::config::{ReleaseDriverKind, SequencerConfig, ServiceSpec};
pub use crate::error::{ConfigError, SequencerError, SequencerResult};
pub use crate::release::ReleaseMode;
pub use crate::sequencer::{Sequencer, SequencerState};
pub use crate::service::{Service, ServiceOptions};
pub use rtseq_stats::{ReportSink, ServiceReport};

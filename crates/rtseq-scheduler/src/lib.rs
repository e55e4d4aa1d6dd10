//! Periodic release of real-time services.
//!
//! Each [`Service`] owns one task and one dedicated thread. A [`Sequencer`]
//! owns an ordered set of services and a release driver that signals them at
//! their periods:
//!
//! - **Shared tick**: one thread wakes at a fixed resolution (1 ms by default)
//!   and releases each service on the first tick at or after its next deadline
//! - **Per-service timer**: one timer thread per service at its exact period
//!
//! Both drivers sleep to absolute deadlines, so timing error never accumulates.
//! Every execution is measured into a [`StatisticsTracker`]; on shutdown each
//! service emits a [`ServiceReport`] to the configured [`ReportSink`].
//!
//! # Guarantees
//!
//! - A task never runs concurrently with itself
//! - No release is produced after [`Sequencer::stop_services`] returns
//! - A panicking task is contained to its own service and counted as a fault
//! - Refused real-time requests are warnings, never errors
//!
//! # Example
//!
//! ```no_run
//! use rtseq_scheduler::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> SequencerResult<()> {
//! let config = SequencerConfig::builder()
//!     .shared_tick(Duration::from_millis(1))
//!     .release_mode(ReleaseMode::Accumulate)
//!     .build()?;
//!
//! let mut sequencer = Sequencer::new(config)?;
//! sequencer.add_service(ServiceSpec::new("camera", 100).with_priority(80), || {})?;
//! sequencer.start_services()?;
//! std::thread::sleep(Duration::from_secs(1));
//! for report in sequencer.stop_services() {
//!     println!("{report}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod config;
pub mod error;
pub mod release;
pub mod sequencer;
pub mod service;

mod driver;

pub mod prelude;

pub use config::{
    DEFAULT_TICK_RESOLUTION_US, ReleaseDriverKind, SequencerConfig, SequencerConfigBuilder,
    ServiceSpec,
};
pub use error::{
    ConfigError, ReleaseDriverError, SchedulingWarning, SequencerError, SequencerResult, TaskFault,
};
pub use release::{ReleaseMode, ReleaseSignal, ReleaseWaiter, release_channel};
pub use sequencer::{Sequencer, SequencerState, ServiceInfo};
pub use service::{Service, ServiceOptions, Task};

pub use rtseq_platform::{AppliedSetup as SchedulingStatus, RtCapability, SetupOutcome};
pub use rtseq_stats::{ReportSink, ServiceReport, StatisticsTracker};

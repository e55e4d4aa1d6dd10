//! Real-time thread capabilities for `rtseq`.
//!
//! Service threads configure themselves through the [`RtCapability`] trait:
//!
//! - **FIFO priority**: `SCHED_FIFO` on Linux
//! - **Core pinning**: `sched_setaffinity` on Linux
//! - **Memory locking**: `mlockall` on Linux
//!
//! Other platforms get [`FallbackCapability`], which validates arguments and
//! otherwise does nothing, so the scheduling core stays portable.
//!
//! # Example
//!
//! ```no_run
//! use rtseq_platform::{ThreadSetup, native};
//!
//! let capability = native();
//! let applied = ThreadSetup::none()
//!     .with_priority(80)
//!     .with_affinity(0)
//!     .apply(capability.as_ref());
//!
//! if !applied.is_complete() {
//!     eprintln!("running without full real-time guarantees: {applied:?}");
//! }
//! ```

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

pub mod capability;
pub mod error;
pub mod fallback;
pub mod sleep;

#[cfg(target_os = "linux")]
pub mod linux;

pub use capability::{
    AppliedSetup, DEFAULT_RT_PRIORITY_RANGE, RtCapability, SetupOutcome, ThreadSetup, native,
};
pub use error::{PlatformError, PlatformResult};
pub use fallback::FallbackCapability;
pub use sleep::PreciseSleep;

#[cfg(target_os = "linux")]
pub use linux::LinuxCapability;

//! A periodic service: one task, one dedicated thread, one release signal.
//!
//! ```text
//! Constructed -> Idle -> Executing -> Idle -> ... -> Stopping -> Joined
//! ```
//!
//! The thread applies its real-time setup, reports back, then loops: wait for
//! a release, and if still running execute the task once and record timing.
//! `stop()` clears the running flag and issues one extra release so a waiting
//! thread wakes up; a thread mid-execution finishes the current run first.
//! A task that never returns keeps its service from stopping.

use crate::config::ServiceSpec;
use crate::error::{SchedulingWarning, SequencerError, SequencerResult, TaskFault};
use crate::release::{ReleaseMode, ReleaseSignal, ReleaseWaiter, release_channel};
use crossbeam::channel;
use parking_lot::Mutex;
use rtseq_platform::{AppliedSetup, RtCapability, SetupOutcome};
use rtseq_stats::{ReportSink, ServiceReport, StatisticsTracker, TracingReportSink};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// A unit of periodic work.
pub type Task = Box<dyn FnMut() + Send + 'static>;

/// Collaborators shared by every service of a sequencer.
#[derive(Clone)]
pub struct ServiceOptions {
    /// Release credit semantics.
    pub release_mode: ReleaseMode,
    /// Real-time backend used by the service thread.
    pub capability: Arc<dyn RtCapability>,
    /// Destination of the final report.
    pub sink: Arc<dyn ReportSink>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            release_mode: ReleaseMode::default(),
            capability: rtseq_platform::native(),
            sink: Arc::new(TracingReportSink),
        }
    }
}

impl std::fmt::Debug for ServiceOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceOptions")
            .field("release_mode", &self.release_mode)
            .field("capability", &self.capability.name())
            .finish_non_exhaustive()
    }
}

/// Build the warnings for a partially applied thread setup.
pub(crate) fn setup_warnings(
    thread: &str,
    setup: &rtseq_platform::ThreadSetup,
    applied: &AppliedSetup,
) -> Vec<SchedulingWarning> {
    let mut warnings = Vec::new();
    if let (Some(priority), SetupOutcome::Failed(source)) = (setup.priority, &applied.priority) {
        warnings.push(SchedulingWarning::PriorityNotApplied {
            thread: thread.to_owned(),
            priority,
            source: source.clone(),
        });
    }
    if let (Some(core), SetupOutcome::Failed(source)) = (setup.affinity, &applied.affinity) {
        warnings.push(SchedulingWarning::AffinityNotApplied {
            thread: thread.to_owned(),
            core,
            source: source.clone(),
        });
    }
    warnings
}

/// Periodic service bound to its own thread.
pub struct Service {
    spec: ServiceSpec,
    running: Arc<AtomicBool>,
    signal: ReleaseSignal,
    tracker: Arc<Mutex<StatisticsTracker>>,
    applied: AppliedSetup,
    sink: Arc<dyn ReportSink>,
    thread: Option<JoinHandle<()>>,
}

impl Service {
    /// Validate `spec`, spawn the service thread and wait until it is idle.
    ///
    /// # Errors
    ///
    /// - [`SequencerError::Config`] if `spec` is invalid; no thread is spawned.
    /// - [`SequencerError::Spawn`] if the OS refuses the thread.
    pub fn spawn<F>(spec: ServiceSpec, task: F, options: &ServiceOptions) -> SequencerResult<Self>
    where
        F: FnMut() + Send + 'static,
    {
        spec.validate(options.capability.as_ref())?;

        let running = Arc::new(AtomicBool::new(true));
        let (signal, waiter) = release_channel(options.release_mode);
        let tracker = Arc::new(Mutex::new(StatisticsTracker::new(spec.period())));
        let (ready_tx, ready_rx) = channel::bounded(1);

        let worker = Worker {
            name: spec.name.clone(),
            task: Box::new(task),
            waiter,
            running: Arc::clone(&running),
            tracker: Arc::clone(&tracker),
        };
        let setup = spec.thread_setup();
        let capability = Arc::clone(&options.capability);

        let thread = std::thread::Builder::new()
            .name(spec.name.clone())
            .spawn(move || {
                let applied = setup.apply(capability.as_ref());
                if ready_tx.send(applied).is_err() {
                    return;
                }
                worker.run();
            })
            .map_err(|source| SequencerError::Spawn {
                service: spec.name.clone(),
                source,
            })?;

        let Ok(applied) = ready_rx.recv() else {
            if thread.join().is_err() {
                error!(service = %spec.name, "service thread panicked during setup");
            }
            return Err(SequencerError::StartupFailed { service: spec.name });
        };

        for warning in setup_warnings(&spec.name, &setup, &applied) {
            warn!(service = %spec.name, %warning, "scheduling warning");
        }
        debug!(
            service = %spec.name,
            period_ms = spec.period_ms,
            priority = ?spec.priority,
            affinity = ?spec.affinity,
            "service thread idle"
        );

        Ok(Self {
            spec,
            running,
            signal,
            tracker,
            applied,
            sink: Arc::clone(&options.sink),
            thread: Some(thread),
        })
    }

    /// Signal one execution.
    ///
    /// Returns `false` when the release was coalesced or the service stopped.
    pub fn release(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.signal.release()
    }

    /// Producer handle for a release driver.
    #[must_use]
    pub fn release_signal(&self) -> ReleaseSignal {
        self.signal.clone()
    }

    /// Stop the thread and emit the final report.
    ///
    /// Returns the report on the first call and `None` afterwards.
    pub fn stop(&mut self) -> Option<ServiceReport> {
        let thread = self.thread.take()?;

        self.running.store(false, Ordering::Release);
        self.signal.release();

        if thread.join().is_err() {
            error!(service = %self.spec.name, "service thread panicked outside the task boundary");
        }

        let report = self.snapshot();
        self.sink.deliver(&report);
        info!(
            service = %self.spec.name,
            executions = report.count,
            missed_deadlines = report.missed_deadline_count,
            "service stopped"
        );
        Some(report)
    }

    /// Live statistics.
    #[must_use]
    pub fn snapshot(&self) -> ServiceReport {
        self.tracker.lock().report(&self.spec.name)
    }

    /// Service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Nominal period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.spec.period()
    }

    /// Construction parameters.
    #[must_use]
    pub fn spec(&self) -> &ServiceSpec {
        &self.spec
    }

    /// What the thread managed to apply at startup.
    #[must_use]
    pub fn applied_setup(&self) -> &AppliedSetup {
        &self.applied
    }

    /// Real-time requests that were refused.
    #[must_use]
    pub fn scheduling_warnings(&self) -> Vec<SchedulingWarning> {
        setup_warnings(&self.spec.name, &self.spec.thread_setup(), &self.applied)
    }

    /// Whether `stop()` has not been called yet.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Releases produced but not yet consumed.
    #[must_use]
    pub fn pending_releases(&self) -> u64 {
        self.signal.pending()
    }

    /// Releases dropped by [`ReleaseMode::Coalesce`].
    #[must_use]
    pub fn coalesced_releases(&self) -> u64 {
        self.signal.coalesced()
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("spec", &self.spec)
            .field("running", &self.is_running())
            .field("applied", &self.applied)
            .finish_non_exhaustive()
    }
}

/// State moved into the service thread.
struct Worker {
    name: String,
    task: Task,
    waiter: ReleaseWaiter,
    running: Arc<AtomicBool>,
    tracker: Arc<Mutex<StatisticsTracker>>,
}

impl Worker {
    fn run(mut self) {
        loop {
            self.waiter.acquire();
            if !self.running.load(Ordering::Acquire) {
                break;
            }
            self.execute_once();
        }
        debug!(service = %self.name, "service thread exiting");
    }

    fn execute_once(&mut self) {
        let start = Instant::now();
        let jitter = self.tracker.lock().record_start(start);

        let task = &mut self.task;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| task()));
        let elapsed = start.elapsed();

        let missed = {
            let mut tracker = self.tracker.lock();
            if outcome.is_err() {
                tracker.record_fault();
            }
            tracker.record_execution(elapsed)
        };

        if let Err(payload) = outcome {
            let fault = TaskFault::from_panic(&self.name, payload.as_ref());
            error!(service = %self.name, %fault, "task fault contained");
        }

        trace!(
            service = %self.name,
            exec_us = elapsed.as_micros(),
            start_jitter_us = jitter.map(|j| j.as_micros()),
            missed,
            "service executed"
        );
    }
}

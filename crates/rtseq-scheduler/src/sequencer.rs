//! The sequencer: owns services and the driver that releases them.

use crate::config::{SequencerConfig, ServiceSpec, validate_setup};
use crate::driver::{ArmedDriver, ReleaseTarget};
use crate::error::{ConfigError, SchedulingWarning, SequencerError, SequencerResult};
use crate::service::{Service, ServiceOptions};
use rtseq_platform::RtCapability;
use rtseq_stats::{ReportSink, ServiceReport};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Thread name used when validating and reporting driver setup.
const DRIVER_THREAD: &str = "release-driver";

/// Sequencer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencerState {
    /// Accepting services; no releases yet.
    Idle,
    /// Release driver armed.
    Running,
    /// Driver disarmed and every service joined. Terminal.
    Stopped,
}

/// Diagnostic line for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    /// Service name.
    pub name: String,
    /// Nominal period in milliseconds.
    pub period_ms: u64,
    /// Requested FIFO priority.
    pub priority: Option<i32>,
    /// Requested core.
    pub affinity: Option<usize>,
    /// Position in insertion order.
    pub index: usize,
}

/// Owns an ordered set of services and arms their periodic release.
///
/// Services are started in insertion order and stopped in insertion order,
/// after the release driver has been fully disarmed.
///
/// # Example
///
/// ```no_run
/// use rtseq_scheduler::{Sequencer, SequencerConfig, ServiceSpec};
/// use std::time::Duration;
///
/// # fn main() -> Result<(), rtseq_scheduler::SequencerError> {
/// let mut sequencer = Sequencer::new(SequencerConfig::default())?;
/// sequencer.add_service(ServiceSpec::new("camera", 100).with_affinity(0), || {})?;
/// sequencer.add_service(ServiceSpec::new("gas", 300), || {})?;
///
/// sequencer.start_services()?;
/// std::thread::sleep(Duration::from_millis(900));
/// for report in sequencer.stop_services() {
///     println!("{report}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Sequencer {
    config: SequencerConfig,
    options: ServiceOptions,
    services: Vec<Service>,
    driver: Option<ArmedDriver>,
    state: SequencerState,
    warnings: Vec<SchedulingWarning>,
}

impl Sequencer {
    /// Empty sequencer using the native capability and the tracing sink.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Config`] if `config` is invalid.
    pub fn new(config: SequencerConfig) -> SequencerResult<Self> {
        config.validate()?;
        let options = ServiceOptions {
            release_mode: config.release_mode,
            ..ServiceOptions::default()
        };
        Ok(Self {
            config,
            options,
            services: Vec::new(),
            driver: None,
            state: SequencerState::Idle,
            warnings: Vec::new(),
        })
    }

    /// Replace the real-time backend. Affects services added afterwards.
    #[must_use]
    pub fn with_capability(mut self, capability: Arc<dyn RtCapability>) -> Self {
        self.options.capability = capability;
        self
    }

    /// Replace the destination of final reports. Affects services added afterwards.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.options.sink = sink;
        self
    }

    /// Construct a service and append it.
    ///
    /// # Errors
    ///
    /// - [`SequencerError::AlreadyStarted`] / [`SequencerError::Stopped`] outside `Idle`
    /// - [`SequencerError::Config`] for invalid or duplicate parameters
    /// - [`SequencerError::Spawn`] if the thread cannot be created
    pub fn add_service<F>(&mut self, spec: ServiceSpec, task: F) -> SequencerResult<()>
    where
        F: FnMut() + Send + 'static,
    {
        self.ensure_idle()?;
        if self.services.iter().any(|s| s.name() == spec.name) {
            return Err(ConfigError::DuplicateName { service: spec.name }.into());
        }

        let service = Service::spawn(spec, task, &self.options)?;
        info!(
            service = service.name(),
            period_ms = service.spec().period_ms,
            index = self.services.len(),
            "service added"
        );
        self.services.push(service);
        Ok(())
    }

    /// Arm the release driver.
    ///
    /// # Errors
    ///
    /// - [`SequencerError::AlreadyStarted`] / [`SequencerError::Stopped`] outside `Idle`
    /// - [`SequencerError::Config`] if the driver priority or affinity is invalid
    /// - [`SequencerError::ReleaseDriver`] if the driver cannot be armed; nothing is left running
    pub fn start_services(&mut self) -> SequencerResult<()> {
        self.ensure_idle()?;

        let capability = Arc::clone(&self.options.capability);
        let driver_setup = self.config.driver_setup();
        validate_setup(DRIVER_THREAD, driver_setup, capability.as_ref())?;

        if self.config.lock_memory {
            match capability.lock_memory() {
                Ok(()) => info!(backend = capability.name(), "process memory locked"),
                Err(source) => {
                    let warning = SchedulingWarning::MemoryLockNotApplied { source };
                    warn!(%warning, "scheduling warning");
                    self.warnings.push(warning);
                }
            }
        }

        let targets = self
            .services
            .iter()
            .map(|service| ReleaseTarget {
                name: service.name().to_owned(),
                period: service.period(),
                signal: service.release_signal(),
            })
            .collect();

        let driver = ArmedDriver::arm(self.config.driver, targets, driver_setup, capability)?;
        self.driver = Some(driver);
        self.state = SequencerState::Running;
        info!(
            services = self.services.len(),
            driver = ?self.config.driver,
            release_mode = ?self.config.release_mode,
            "sequencer started"
        );
        Ok(())
    }

    /// Disarm the driver, then stop every service in insertion order.
    ///
    /// Returns the final reports in insertion order; empty on repeated calls.
    pub fn stop_services(&mut self) -> Vec<ServiceReport> {
        if self.state == SequencerState::Stopped {
            return Vec::new();
        }

        if let Some(mut driver) = self.driver.take() {
            driver.disarm();
        }

        let reports: Vec<_> = self.services.iter_mut().filter_map(Service::stop).collect();
        self.state = SequencerState::Stopped;
        info!(services = reports.len(), "sequencer stopped");
        reports
    }

    /// Services sorted by ascending period. Registration order is unchanged.
    #[must_use]
    pub fn services_by_period(&self) -> Vec<ServiceInfo> {
        let mut listing: Vec<_> = self
            .services
            .iter()
            .enumerate()
            .map(|(index, service)| {
                let spec = service.spec();
                ServiceInfo {
                    name: spec.name.clone(),
                    period_ms: spec.period_ms,
                    priority: spec.priority,
                    affinity: spec.affinity,
                    index,
                }
            })
            .collect();
        listing.sort_by_key(|info| (info.period_ms, info.index));
        listing
    }

    /// Emit [`services_by_period`](Self::services_by_period) at info level.
    pub fn log_services(&self) {
        for info in self.services_by_period() {
            info!(
                service = %info.name,
                period_ms = info.period_ms,
                priority = ?info.priority,
                affinity = ?info.affinity,
                "registered service"
            );
        }
    }

    /// Live reports in insertion order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<ServiceReport> {
        self.services.iter().map(Service::snapshot).collect()
    }

    /// Look up a service by name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name() == name)
    }

    /// Every refused real-time request so far, services first.
    #[must_use]
    pub fn scheduling_warnings(&self) -> Vec<SchedulingWarning> {
        self.services
            .iter()
            .flat_map(Service::scheduling_warnings)
            .chain(self.warnings.iter().cloned())
            .collect()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Sequencer settings.
    #[must_use]
    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Number of services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether no service has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Smallest registered period, if any.
    #[must_use]
    pub fn shortest_period(&self) -> Option<Duration> {
        self.services.iter().map(Service::period).min()
    }

    fn ensure_idle(&self) -> SequencerResult<()> {
        match self.state {
            SequencerState::Idle => Ok(()),
            SequencerState::Running => Err(SequencerError::AlreadyStarted),
            SequencerState::Stopped => Err(SequencerError::Stopped),
        }
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.stop_services();
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("services", &self.services)
            .field("driver_armed", &self.driver.as_ref().is_some_and(ArmedDriver::is_armed))
            .finish_non_exhaustive()
    }
}

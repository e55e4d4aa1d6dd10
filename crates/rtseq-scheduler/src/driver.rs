//! Release drivers: the threads that turn wall-clock time into releases.
//!
//! Both strategies schedule against absolute deadlines (`start + k * period`),
//! so oversleeping one period never shifts later releases. A driver that wakes
//! late emits every release it owes, in order, before sleeping again.

use crate::config::ReleaseDriverKind;
use crate::error::{ReleaseDriverError, SequencerError, SequencerResult};
use crate::release::ReleaseSignal;
use crate::service::setup_warnings;
use parking_lot::{Condvar, Mutex};
use rtseq_platform::{PreciseSleep, RtCapability, ThreadSetup};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Spin tail of the shared tick; short so a 1 ms tick stays cheap.
const TICK_SPIN_TAIL: Duration = Duration::from_micros(50);

/// Where a driver delivers releases for one service.
#[derive(Debug, Clone)]
pub(crate) struct ReleaseTarget {
    pub(crate) name: String,
    pub(crate) period: Duration,
    pub(crate) signal: ReleaseSignal,
}

/// Armed flag shared by the driver threads; disarming wakes timed waits.
#[derive(Debug)]
struct DriverGate {
    armed: Mutex<bool>,
    changed: Condvar,
}

impl DriverGate {
    fn new() -> Self {
        Self {
            armed: Mutex::new(true),
            changed: Condvar::new(),
        }
    }

    fn is_armed(&self) -> bool {
        *self.armed.lock()
    }

    /// Wait for `deadline`. Returns `false` if disarmed first.
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut armed = self.armed.lock();
        while *armed {
            if self.changed.wait_until(&mut armed, deadline).timed_out() {
                return *armed;
            }
        }
        false
    }

    fn disarm(&self) {
        *self.armed.lock() = false;
        self.changed.notify_all();
    }
}

/// Running release driver. Dropping it disarms and joins.
#[derive(Debug)]
pub(crate) struct ArmedDriver {
    gate: Arc<DriverGate>,
    threads: Vec<JoinHandle<()>>,
}

impl ArmedDriver {
    /// Spawn the driver threads for `targets`.
    pub(crate) fn arm(
        kind: ReleaseDriverKind,
        targets: Vec<ReleaseTarget>,
        setup: ThreadSetup,
        capability: Arc<dyn RtCapability>,
    ) -> SequencerResult<Self> {
        let mut driver = Self {
            gate: Arc::new(DriverGate::new()),
            threads: Vec::new(),
        };

        match kind {
            ReleaseDriverKind::SharedTick { resolution_us } => {
                let resolution = Duration::from_micros(resolution_us);
                let ticks = tick_plan(&targets, resolution)?;
                let gate = Arc::clone(&driver.gate);
                driver.spawn("rtseq-tick".to_owned(), setup, capability, move || {
                    run_shared_tick(&gate, resolution, ticks);
                })?;
            }
            ReleaseDriverKind::PerServiceTimer => {
                for target in targets {
                    let gate = Arc::clone(&driver.gate);
                    let name = format!("rtseq-timer-{}", target.name);
                    driver.spawn(name, setup, Arc::clone(&capability), move || {
                        run_periodic_timer(&gate, &target);
                    })?;
                }
            }
        }

        info!(?kind, threads = driver.threads.len(), "release driver armed");
        Ok(driver)
    }

    fn spawn<F>(
        &mut self,
        name: String,
        setup: ThreadSetup,
        capability: Arc<dyn RtCapability>,
        body: F,
    ) -> SequencerResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let thread_name = name.clone();
        let spawned = std::thread::Builder::new().name(name.clone()).spawn(move || {
            let applied = setup.apply(capability.as_ref());
            for warning in setup_warnings(&thread_name, &setup, &applied) {
                warn!(%warning, "scheduling warning");
            }
            body();
        });

        match spawned {
            Ok(handle) => {
                self.threads.push(handle);
                Ok(())
            }
            Err(source) => {
                // Whatever was already armed must not outlive the failure.
                self.disarm();
                Err(SequencerError::from(ReleaseDriverError::Spawn {
                    thread: name,
                    source,
                }))
            }
        }
    }

    /// Stop producing releases. Returns once every driver thread has exited.
    pub(crate) fn disarm(&mut self) {
        self.gate.disarm();
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!("release driver thread panicked");
            }
        }
        debug!("release driver disarmed");
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.gate.is_armed()
    }
}

impl Drop for ArmedDriver {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// When a target is due, measured on the tick clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickCadence {
    /// Period is a whole number of ticks.
    Every(u64),
    /// Released on the first tick at or after each `k * period_ns`.
    Deadline { period_ns: u128, next_ns: u128 },
}

#[derive(Debug)]
struct TickTarget {
    cadence: TickCadence,
    signal: ReleaseSignal,
}

impl TickTarget {
    /// Whether tick number `tick` (elapsed `tick * resolution_ns`) releases this target.
    fn due(&mut self, tick: u64, resolution_ns: u128) -> bool {
        match &mut self.cadence {
            TickCadence::Every(period_ticks) => tick.is_multiple_of(*period_ticks),
            TickCadence::Deadline { period_ns, next_ns } => {
                let elapsed_ns = u128::from(tick).saturating_mul(resolution_ns);
                if elapsed_ns < *next_ns {
                    return false;
                }
                // period >= resolution, so at most one release falls due per tick.
                *next_ns = next_ns.saturating_add(*period_ns);
                true
            }
        }
    }
}

fn tick_plan(targets: &[ReleaseTarget], resolution: Duration) -> SequencerResult<Vec<TickTarget>> {
    let resolution_ns = resolution.as_nanos();
    if resolution_ns == 0 {
        return Err(crate::error::ConfigError::ZeroResolution.into());
    }

    targets
        .iter()
        .map(|target| {
            if target.period < resolution {
                return Err(SequencerError::from(
                    ReleaseDriverError::ResolutionExceedsPeriod {
                        service: target.name.clone(),
                        resolution,
                        period: target.period,
                    },
                ));
            }
            let period_ns = target.period.as_nanos();
            let cadence = match u64::try_from(period_ns / resolution_ns) {
                Ok(period_ticks) if period_ns % resolution_ns == 0 => {
                    TickCadence::Every(period_ticks)
                }
                _ => {
                    debug!(
                        service = %target.name,
                        period = ?target.period,
                        ?resolution,
                        "period is not a multiple of the tick resolution; releasing on the next tick"
                    );
                    TickCadence::Deadline {
                        period_ns,
                        next_ns: period_ns,
                    }
                }
            };
            Ok(TickTarget {
                cadence,
                signal: target.signal.clone(),
            })
        })
        .collect()
}

fn run_shared_tick(gate: &DriverGate, resolution: Duration, mut targets: Vec<TickTarget>) {
    let sleeper = PreciseSleep::with_spin_tail(TICK_SPIN_TAIL);
    let resolution_ns = resolution.as_nanos();
    let mut deadline = Instant::now();
    let mut tick: u64 = 0;

    loop {
        deadline += resolution;
        sleeper.sleep_until(deadline);
        if !gate.is_armed() {
            break;
        }

        tick = tick.wrapping_add(1);
        for target in &mut targets {
            if target.due(tick, resolution_ns) {
                target.signal.release();
            }
        }
    }
    debug!(ticks = tick, "shared tick stopped");
}

fn run_periodic_timer(gate: &DriverGate, target: &ReleaseTarget) {
    let mut deadline = Instant::now();
    let mut releases: u64 = 0;

    loop {
        deadline += target.period;
        if !gate.wait_until(deadline) {
            break;
        }
        target.signal.release();
        releases = releases.wrapping_add(1);
    }
    debug!(service = %target.name, releases, "service timer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{ReleaseMode, release_channel};
    use rtseq_platform::FallbackCapability;

    fn target(name: &str, period_ms: u64) -> (ReleaseTarget, crate::release::ReleaseWaiter) {
        let (signal, waiter) = release_channel(ReleaseMode::Accumulate);
        (
            ReleaseTarget {
                name: name.to_owned(),
                period: Duration::from_millis(period_ms),
                signal,
            },
            waiter,
        )
    }

    fn releases_over(target: &mut TickTarget, ticks: u64, resolution: Duration) -> u64 {
        let resolution_ns = resolution.as_nanos();
        let due = (1..=ticks).filter(|&tick| target.due(tick, resolution_ns)).count();
        u64::try_from(due).unwrap_or(u64::MAX)
    }

    #[test]
    fn test_tick_plan_divides_periods() -> SequencerResult<()> {
        let (a, _wa) = target("a", 100);
        let (b, _wb) = target("b", 300);
        let plan = tick_plan(&[a, b], Duration::from_millis(1))?;
        let cadences: Vec<_> = plan.iter().map(|t| t.cadence).collect();
        assert_eq!(cadences, vec![TickCadence::Every(100), TickCadence::Every(300)]);
        Ok(())
    }

    #[test]
    fn test_tick_plan_rejects_coarse_resolution() {
        let (a, _wa) = target("fast", 5);
        let result = tick_plan(&[a], Duration::from_millis(10));
        assert!(matches!(
            result,
            Err(SequencerError::ReleaseDriver(
                ReleaseDriverError::ResolutionExceedsPeriod { .. }
            ))
        ));
    }

    #[test]
    fn test_uneven_period_keeps_its_rate() -> SequencerResult<()> {
        let resolution = Duration::from_millis(10);
        let (a, _wa) = target("odd", 25);
        let mut plan = tick_plan(&[a], resolution)?;
        let odd = plan.first_mut();
        assert!(matches!(
            odd.as_ref().map(|t| t.cadence),
            Some(TickCadence::Deadline { .. })
        ));

        // 1000 ms at 10 ms per tick: due at 30, 50, 80, 100, ... ms.
        let released = odd.map(|t| releases_over(t, 100, resolution));
        assert_eq!(released, Some(40));
        Ok(())
    }

    #[test]
    fn test_uneven_period_released_on_first_tick_after_deadline() -> SequencerResult<()> {
        let resolution = Duration::from_millis(10);
        let resolution_ns = resolution.as_nanos();
        let (a, _wa) = target("odd", 25);
        let mut plan = tick_plan(&[a], resolution)?;

        let due: Vec<u64> = plan
            .first_mut()
            .map(|t| (1..=10).filter(|&tick| t.due(tick, resolution_ns)).collect())
            .unwrap_or_default();
        assert_eq!(due, vec![3, 5, 8, 10]);
        Ok(())
    }

    #[test]
    fn test_whole_tick_period_uses_modulo() -> SequencerResult<()> {
        let resolution = Duration::from_millis(1);
        let (a, _wa) = target("even", 100);
        let mut plan = tick_plan(&[a], resolution)?;
        let released = plan.first_mut().map(|t| releases_over(t, 1000, resolution));
        assert_eq!(released, Some(10));
        Ok(())
    }

    #[test]
    fn test_gate_disarm_wakes_waiter() {
        let gate = Arc::new(DriverGate::new());
        let waiter_gate = Arc::clone(&gate);
        let waiter = std::thread::spawn(move || {
            waiter_gate.wait_until(Instant::now() + Duration::from_secs(30))
        });

        std::thread::sleep(Duration::from_millis(10));
        let started = Instant::now();
        gate.disarm();

        assert!(matches!(waiter.join(), Ok(false)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_no_release_after_disarm() -> SequencerResult<()> {
        let (t, _waiter) = target("t", 2);
        let signal = t.signal.clone();
        let mut driver = ArmedDriver::arm(
            ReleaseDriverKind::PerServiceTimer,
            vec![t],
            ThreadSetup::none(),
            Arc::new(FallbackCapability::new()),
        )?;
        std::thread::sleep(Duration::from_millis(20));
        driver.disarm();
        assert!(!driver.is_armed());

        let after_disarm = signal.released();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(signal.released(), after_disarm);
        assert!(after_disarm > 0);
        Ok(())
    }
}

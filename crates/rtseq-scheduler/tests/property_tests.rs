//! Property-based tests for release credits and configuration.

use proptest::prelude::*;
use rtseq_platform::FallbackCapability;
use rtseq_scheduler::{
    ConfigError, ReleaseMode, Sequencer, SequencerConfig, ServiceSpec, release_channel,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum Op {
    Release,
    Acquire,
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(prop_oneof![Just(Op::Release), Just(Op::Acquire)], 0..200)
}

proptest! {
    #[test]
    fn test_accumulate_conserves_credits(ops in ops()) {
        let (signal, waiter) = release_channel(ReleaseMode::Accumulate);
        let mut consumed = 0u64;
        for op in &ops {
            match op {
                Op::Release => prop_assert!(signal.release()),
                Op::Acquire => {
                    if waiter.try_acquire() {
                        consumed += 1;
                    }
                }
            }
        }
        prop_assert_eq!(signal.released(), consumed + signal.pending());
        prop_assert_eq!(signal.coalesced(), 0);
    }

    #[test]
    fn test_coalesce_never_exceeds_one_pending(ops in ops()) {
        let (signal, waiter) = release_channel(ReleaseMode::Coalesce);
        let mut consumed = 0u64;
        for op in &ops {
            match op {
                Op::Release => {
                    signal.release();
                }
                Op::Acquire => {
                    if waiter.try_acquire() {
                        consumed += 1;
                    }
                }
            }
            prop_assert!(signal.pending() <= 1);
        }
        prop_assert_eq!(
            signal.released(),
            consumed + signal.pending() + signal.coalesced()
        );
    }

    #[test]
    fn test_priority_accepted_iff_in_range(priority in -10i32..120) {
        let cap = FallbackCapability::new();
        let result = ServiceSpec::new("svc", 10).with_priority(priority).validate(&cap);
        if (1..=99).contains(&priority) {
            prop_assert_eq!(result, Ok(()));
        } else {
            let out_of_range = matches!(result, Err(ConfigError::PriorityOutOfRange { .. }));
            prop_assert!(out_of_range);
        }
    }

    #[test]
    fn test_config_round_trips_through_yaml(
        resolution_us in 1u64..100_000,
        coalesce in any::<bool>(),
        lock in any::<bool>(),
        priority in proptest::option::of(1i32..=99),
    ) {
        let mode = if coalesce { ReleaseMode::Coalesce } else { ReleaseMode::Accumulate };
        let mut builder = SequencerConfig::builder()
            .shared_tick(Duration::from_micros(resolution_us))
            .release_mode(mode)
            .lock_memory(lock);
        if let Some(p) = priority {
            builder = builder.driver_priority(p);
        }
        let config = builder.build();
        prop_assert!(matches!(config, Ok(_)));
        if let Ok(config) = config {
            let yaml = serde_yaml::to_string(&config);
            prop_assert!(matches!(yaml, Ok(_)));
            if let Ok(yaml) = yaml {
                let parsed: Result<SequencerConfig, _> = serde_yaml::from_str(&yaml);
                prop_assert_eq!(parsed.ok(), Some(config));
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_listing_sorted_and_registration_kept(
        periods in prop::collection::vec(1u64..1_000, 1..6),
    ) {
        let seq = Sequencer::new(SequencerConfig::default())
            .map(|s| s.with_capability(Arc::new(FallbackCapability::new())));
        prop_assert!(matches!(seq, Ok(_)));
        let Ok(mut seq) = seq else { return Ok(()) };

        for (i, period) in periods.iter().enumerate() {
            let added = seq.add_service(ServiceSpec::new(format!("svc-{i}"), *period), || {});
            prop_assert!(matches!(added, Ok(())));
        }

        let listing = seq.services_by_period();
        prop_assert!(listing.windows(2).all(|w| matches!(w, [a, b] if a.period_ms <= b.period_ms)));

        let registered: Vec<u64> = seq
            .snapshots()
            .iter()
            .map(|r| u64::try_from(r.period.as_millis()).unwrap_or(u64::MAX))
            .collect();
        prop_assert_eq!(registered, periods);
    }
}

// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests
//!
//! These use proptest to verify that:
//! 1. Quota conversions round-trip within the stated tolerance
//! 2. Scaling intent derivation honors the storage monotonicity rule
//! 3. Validation rejects without panicking on arbitrary input
//! 4. Version sorting is deterministic and total

use proptest::prelude::*;

use db_orchestrator::adapter::InstanceQuota;
use db_orchestrator::engine::EngineType;
use db_orchestrator::orchestrator::{compute_scaling_intents, ScalingIntent};
use db_orchestrator::quota::{
    cpu_to_millicores, memory_to_native, parse_cpu_cores, parse_memory_gib, parse_storage_gib,
    storage_to_native,
};
use db_orchestrator::spec::{DatabaseSpec, QuotaDelta, QuotaSpec, TerminationPolicy, validate_spec};
use db_orchestrator::version::sort_versions;

// =============================================================================
// Quota round-trips
// =============================================================================

proptest! {
    #[test]
    fn cpu_round_trips_for_millicore_multiples(millicores in 1u32..=256_000) {
        let cores = millicores as f64 / 1000.0;
        // formatting floors to whole millicores, so the round trip is
        // exact to within one millicore
        let parsed = parse_cpu_cores(&cpu_to_millicores(cores));
        prop_assert!((parsed - cores).abs() <= 1e-3, "{cores} -> {parsed}");
    }

    #[test]
    fn memory_round_trips_for_mi_multiples(mi in 1u32..=1_048_576) {
        let gib = mi as f64 / 1024.0;
        let parsed = parse_memory_gib(&memory_to_native(gib));
        prop_assert!((parsed - gib).abs() < 1e-6, "{gib} -> {parsed}");
    }

    #[test]
    fn storage_round_trips_for_whole_gib(gib in 1u32..=65_536) {
        let parsed = parse_storage_gib(&storage_to_native(gib as f64));
        prop_assert!((parsed - gib as f64).abs() < 1e-9);
    }

    #[test]
    fn parsers_never_panic_on_garbage(s in ".{0,24}") {
        let _ = parse_cpu_cores(&s);
        let _ = parse_memory_gib(&s);
        let _ = parse_storage_gib(&s);
    }
}

// =============================================================================
// Scaling intents
// =============================================================================

fn arb_quota() -> impl Strategy<Value = InstanceQuota> {
    (1u32..=64, 1u32..=256, 1u32..=1000, 1i32..=16).prop_map(|(cpu, mem, storage, replicas)| {
        InstanceQuota {
            cpu: cpu as f64,
            memory: mem as f64,
            storage: storage as f64,
            replicas,
        }
    })
}

proptest! {
    #[test]
    fn identical_delta_is_always_a_noop(current in arb_quota()) {
        let delta = QuotaDelta {
            cpu: Some(current.cpu),
            memory: Some(current.memory),
            storage: Some(current.storage as u32),
            replicas: Some(current.replicas),
        };
        prop_assert!(compute_scaling_intents(&current, &delta).is_empty());
    }

    #[test]
    fn storage_expansion_requires_growth(current in arb_quota(), requested in 1u32..=1000) {
        let delta = QuotaDelta {
            storage: Some(requested),
            ..Default::default()
        };
        let intents = compute_scaling_intents(&current, &delta);
        let expanded = intents
            .iter()
            .any(|i| matches!(i, ScalingIntent::VolumeExpansion { .. }));
        prop_assert_eq!(expanded, (requested as f64) > current.storage);
    }

    #[test]
    fn at_most_one_intent_per_category(current in arb_quota(), delta_cpu in 1u32..=64, delta_replicas in 1i32..=16) {
        let delta = QuotaDelta {
            cpu: Some(delta_cpu as f64),
            replicas: Some(delta_replicas),
            ..Default::default()
        };
        let intents = compute_scaling_intents(&current, &delta);
        let vertical = intents
            .iter()
            .filter(|i| matches!(i, ScalingIntent::VerticalScaling { .. }))
            .count();
        let horizontal = intents
            .iter()
            .filter(|i| matches!(i, ScalingIntent::HorizontalScaling { .. }))
            .count();
        prop_assert!(vertical <= 1);
        prop_assert!(horizontal <= 1);
    }
}

// =============================================================================
// Validation
// =============================================================================

proptest! {
    #[test]
    fn validation_never_panics(name in ".{0,80}", cpu in -4.0f64..=64.0, replicas in -2i32..=16) {
        let spec = DatabaseSpec {
            name,
            engine: EngineType::Postgresql,
            version: None,
            quota: QuotaSpec {
                cpu,
                memory: 1.0,
                storage: 5,
                replicas,
            },
            termination_policy: TerminationPolicy::Delete,
            auto_backup: None,
            parameter_config: None,
        };
        let _ = validate_spec(&spec);
    }

    #[test]
    fn nonpositive_quota_is_rejected(cpu in -4.0f64..=0.0) {
        let spec = DatabaseSpec {
            name: "db".to_string(),
            engine: EngineType::Postgresql,
            version: None,
            quota: QuotaSpec {
                cpu,
                memory: 1.0,
                storage: 5,
                replicas: 1,
            },
            termination_policy: TerminationPolicy::Delete,
            auto_backup: None,
            parameter_config: None,
        };
        prop_assert!(validate_spec(&spec).is_err());
    }
}

// =============================================================================
// Version ordering
// =============================================================================

proptest! {
    #[test]
    fn sorting_is_deterministic(mut ids in prop::collection::vec("[a-z]{1,8}(-[0-9]{1,2}(\\.[0-9]{1,2}){0,2})?", 0..12)) {
        let mut again = ids.clone();
        sort_versions(&mut ids);
        sort_versions(&mut again);
        prop_assert_eq!(&ids, &again);

        // sorting twice is stable
        let once = ids.clone();
        sort_versions(&mut ids);
        prop_assert_eq!(once, ids);
    }
}

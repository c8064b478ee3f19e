//! Tests for scaling intent derivation and the operation documents it
//! produces.

use db_orchestrator::adapter::InstanceQuota;
use db_orchestrator::engine::EngineType;
use db_orchestrator::orchestrator::{compute_scaling_intents, ScalingIntent};
use db_orchestrator::resources::{horizontal_scaling_ops, vertical_scaling_ops, volume_expansion_ops};
use db_orchestrator::spec::QuotaDelta;

fn current() -> InstanceQuota {
    InstanceQuota {
        cpu: 1.0,
        memory: 1.0,
        storage: 5.0,
        replicas: 1,
    }
}

#[test]
fn test_equal_quota_is_reported_as_noop() {
    let delta = QuotaDelta {
        cpu: Some(1.0),
        memory: Some(1.0),
        storage: Some(5),
        replicas: Some(1),
    };
    assert!(compute_scaling_intents(&current(), &delta).is_empty());
}

#[test]
fn test_unreadable_memory_never_renders_a_zero_limit() {
    // A cluster whose memory limit could not be parsed reports 0;
    // scaling cpu alone must still emit a sane memory limit.
    let observed = InstanceQuota {
        cpu: 1.0,
        memory: 0.0,
        storage: 5.0,
        replicas: 1,
    };
    let delta = QuotaDelta {
        cpu: Some(2.0),
        ..Default::default()
    };
    let intents = compute_scaling_intents(&observed, &delta);
    let [ScalingIntent::VerticalScaling { cpu, memory }] = intents[..] else {
        panic!("expected a single vertical intent, got {intents:?}");
    };

    let ops = vertical_scaling_ops("pg-prod", EngineType::Postgresql, cpu, memory, "ns");
    let scaling = ops.spec.vertical_scaling.unwrap();
    let limits = scaling[0].resources.limits.as_ref().unwrap();
    assert_eq!(limits.cpu.as_deref(), Some("2000m"));
    assert_eq!(limits.memory.as_deref(), Some("1024Mi"));
}

#[test]
fn test_cpu_increase_yields_exactly_one_vertical_intent() {
    let delta = QuotaDelta {
        cpu: Some(2.0),
        ..Default::default()
    };
    let intents = compute_scaling_intents(&current(), &delta);
    assert_eq!(intents.len(), 1);
    assert!(matches!(intents[0], ScalingIntent::VerticalScaling { .. }));
}

#[test]
fn test_storage_shrink_is_silently_dropped() {
    let delta = QuotaDelta {
        storage: Some(3),
        ..Default::default()
    };
    assert!(compute_scaling_intents(&current(), &delta).is_empty());
}

#[test]
fn test_vertical_ops_covers_every_component() {
    let ops = vertical_scaling_ops("cache", EngineType::Redis, 2.0, 2.0, "ns");
    let scalings = ops.spec.vertical_scaling.unwrap();
    let components: Vec<&str> = scalings.iter().map(|s| s.component_name.as_str()).collect();
    assert_eq!(components, ["redis", "redis-sentinel"]);
}

#[test]
fn test_horizontal_ops_targets_primary_component_only() {
    let ops = horizontal_scaling_ops("cache", EngineType::Redis, 5, "ns");
    let scalings = ops.spec.horizontal_scaling.unwrap();
    assert_eq!(scalings.len(), 1);
    assert_eq!(scalings[0].component_name, "redis");
    assert_eq!(scalings[0].replicas, Some(5));
}

#[test]
fn test_volume_expansion_renders_native_storage() {
    let ops = volume_expansion_ops("pg-prod", EngineType::Postgresql, 20, "ns");
    let expansions = ops.spec.volume_expansion.unwrap();
    assert_eq!(expansions[0].volume_claim_templates[0].name, "data");
    assert_eq!(expansions[0].volume_claim_templates[0].storage, "20Gi");
}

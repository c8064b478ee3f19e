//! Tests for observed-state adaptation against complete cluster
//! documents produced by the generators, mimicking what a re-read from
//! the platform returns.

use db_orchestrator::adapter::{adapt, UNKNOWN};
use db_orchestrator::crd::{Cluster, ClusterPhase, ClusterStatus};
use db_orchestrator::engine::EngineType;
use db_orchestrator::resources::generate_cluster;
use db_orchestrator::spec::{DatabaseSpec, QuotaSpec, TerminationPolicy};

fn observed(engine: EngineType, quota: QuotaSpec, phase: ClusterPhase) -> Cluster {
    let spec = DatabaseSpec {
        name: "my-db".to_string(),
        engine,
        version: None,
        quota,
        termination_policy: TerminationPolicy::Delete,
        auto_backup: None,
        parameter_config: None,
    };
    let mut cluster = generate_cluster(&spec, "v1", "ns");
    cluster.status = Some(ClusterStatus {
        phase: Some(phase),
        components: None,
        observed_generation: Some(1),
    });
    cluster
}

#[test]
fn test_generated_cluster_round_trips_through_adapt() {
    let quota = QuotaSpec {
        cpu: 1.0,
        memory: 2.0,
        storage: 5,
        replicas: 1,
    };
    let instance = adapt(
        &observed(EngineType::Postgresql, quota, ClusterPhase::Creating),
        &[],
        None,
    );
    assert_eq!(instance.name, "my-db");
    assert_eq!(instance.engine, "postgresql");
    assert_eq!(instance.version, "v1");
    assert_eq!(instance.status, ClusterPhase::Creating);
    assert_eq!(instance.quota.cpu, 1.0);
    assert_eq!(instance.quota.memory, 2.0);
    assert_eq!(instance.quota.storage, 5.0);
    assert_eq!(instance.engine_type(), Some(EngineType::Postgresql));
}

#[test]
fn test_totals_differ_from_quota_for_multi_component_engines() {
    let quota = QuotaSpec {
        cpu: 1.0,
        memory: 1.0,
        storage: 4,
        replicas: 3,
    };
    let instance = adapt(
        &observed(EngineType::Redis, quota, ClusterPhase::Running),
        &[],
        None,
    );
    // per-replica quota covers the redis component alone
    assert_eq!(instance.quota.replicas, 3);
    // totals include the sentinel sidecar at its own replica count
    assert!(instance.total.cpu > instance.quota.cpu * 3.0);
    assert_eq!(instance.components.len(), 2);
}

#[test]
fn test_absent_status_is_unknown_phase() {
    let quota = QuotaSpec {
        cpu: 1.0,
        memory: 1.0,
        storage: 1,
        replicas: 1,
    };
    let mut cluster = observed(EngineType::Mysql, quota, ClusterPhase::Running);
    cluster.status = None;
    let instance = adapt(&cluster, &[], None);
    assert_eq!(instance.status, ClusterPhase::Unknown);
}

#[test]
fn test_stripped_labels_degrade_to_unknown() {
    let quota = QuotaSpec {
        cpu: 1.0,
        memory: 1.0,
        storage: 1,
        replicas: 1,
    };
    let mut cluster = observed(EngineType::Mongodb, quota, ClusterPhase::Running);
    cluster.metadata.labels = None;
    let instance = adapt(&cluster, &[], None);
    assert_eq!(instance.engine, UNKNOWN);
    assert_eq!(instance.version, UNKNOWN);
}

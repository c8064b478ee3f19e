//! Tests for the document generation pipeline, from a validated spec to
//! the multi-document YAML handed to the resource client.

use db_orchestrator::crd::{BackupSchedule, Cluster, OpsRequest, ParameterConfiguration};
use db_orchestrator::engine::EngineType;
use db_orchestrator::resources::{
    self, common::DOC_SEPARATOR, generate_account_docs, generate_backup_doc, generate_cluster_doc,
    generate_parameter_doc,
};
use db_orchestrator::spec::{
    AutoBackupSpec, DatabaseSpec, ParameterConfig, QuotaSpec, RetentionUnit, TerminationPolicy,
};

fn spec(name: &str, engine: EngineType) -> DatabaseSpec {
    DatabaseSpec {
        name: name.to_string(),
        engine,
        version: None,
        quota: QuotaSpec {
            cpu: 1.0,
            memory: 1.0,
            storage: 5,
            replicas: 1,
        },
        termination_policy: TerminationPolicy::Delete,
        auto_backup: None,
        parameter_config: None,
    }
}

fn yaml_docs(yaml: &str) -> Vec<serde_yaml::Value> {
    use serde::Deserialize;
    serde_yaml::Deserializer::from_str(yaml)
        .map(|d| serde_yaml::Value::deserialize(d).unwrap())
        .filter(|v| !v.is_null())
        .collect()
}

#[test]
fn test_create_pipeline_emits_account_cluster_and_parameter_docs() {
    let spec = spec("pg-prod", EngineType::Postgresql);
    let version = "postgresql-14.8.0";

    let mut docs = vec![
        generate_account_docs(&spec.name, "ns", None).unwrap(),
        generate_cluster_doc(&spec, version, "ns").unwrap(),
    ];
    if let Some(parameter) = generate_parameter_doc(&spec, version, "ns").unwrap() {
        docs.push(parameter);
    }
    let combined = docs.join(DOC_SEPARATOR);
    let parsed = yaml_docs(&combined);

    // ServiceAccount + Role + RoleBinding + Cluster + ParameterConfiguration
    assert_eq!(parsed.len(), 5);
    for doc in &parsed {
        assert!(doc.get("apiVersion").is_some(), "doc missing apiVersion");
        assert!(doc.get("kind").is_some(), "doc missing kind");
    }
}

#[test]
fn test_cluster_doc_round_trips_through_yaml() {
    let spec = spec("pg-prod", EngineType::Postgresql);
    let doc = generate_cluster_doc(&spec, "postgresql-14.8.0", "ns").unwrap();
    let cluster: Cluster = serde_yaml::from_str(&doc).unwrap();

    assert_eq!(cluster.spec.cluster_definition_ref, "postgresql");
    assert_eq!(
        cluster.spec.cluster_version_ref.as_deref(),
        Some("postgresql-14.8.0")
    );
    let component = &cluster.spec.component_specs[0];
    assert_eq!(component.replicas, 1);
    let limits = component.resources.limits.as_ref().unwrap();
    assert_eq!(limits.cpu.as_deref(), Some("1000m"));
    assert_eq!(limits.memory.as_deref(), Some("1024Mi"));
    // requests are a tenth of limits
    let requests = component.resources.requests.as_ref().unwrap();
    assert_eq!(requests.cpu.as_deref(), Some("100m"));
}

#[test]
fn test_account_docs_gain_owner_reference_on_second_pass() {
    let first = generate_account_docs("pg-prod", "ns", None).unwrap();
    assert!(!first.contains("ownerReferences"));

    let second = generate_account_docs("pg-prod", "ns", Some("uid-1234")).unwrap();
    assert!(second.contains("ownerReferences"));
    assert!(second.contains("uid-1234"));
}

#[test]
fn test_parameter_doc_omitted_for_incompatible_pair() {
    let spec = spec("mysql-prod", EngineType::ApecloudMysql);
    assert!(generate_parameter_doc(&spec, "ac-mysql-8.0.30", "ns")
        .unwrap()
        .is_none());
    assert!(generate_parameter_doc(&spec, "ac-mysql-8.0.33", "ns")
        .unwrap()
        .is_some());
}

#[test]
fn test_parameter_doc_scores_max_connections_from_quota() {
    let mut spec = spec("pg-prod", EngineType::Postgresql);
    spec.quota.cpu = 2.0;
    spec.quota.memory = 4.0;
    let doc = generate_parameter_doc(&spec, "postgresql-14.8.0", "ns")
        .unwrap()
        .unwrap();
    let config: ParameterConfiguration = serde_yaml::from_str(&doc).unwrap();
    let parameters = &config.spec.config_items[0].parameters;
    // 2 cores * 400 + 4 GiB * 300 = 2000
    assert_eq!(parameters.get("max_connections").map(String::as_str), Some("2000"));
}

#[test]
fn test_explicit_max_connections_wins_over_scoring() {
    let mut spec = spec("pg-prod", EngineType::Postgresql);
    spec.parameter_config = Some(ParameterConfig {
        max_connections: Some("512".to_string()),
        ..Default::default()
    });
    let doc = generate_parameter_doc(&spec, "postgresql-14.8.0", "ns")
        .unwrap()
        .unwrap();
    let config: ParameterConfiguration = serde_yaml::from_str(&doc).unwrap();
    assert_eq!(
        config.spec.config_items[0].parameters.get("max_connections").map(String::as_str),
        Some("512")
    );
}

#[test]
fn test_backup_doc_shifts_cron_to_utc() {
    let auto = AutoBackupSpec {
        enabled: true,
        hour: 3,
        minute: 0,
        week: Vec::new(),
        save_time: 2,
        save_type: RetentionUnit::Weeks,
    };
    let doc = generate_backup_doc("pg-prod", EngineType::Postgresql, &auto, "ns").unwrap();
    let schedule: BackupSchedule = serde_yaml::from_str(&doc).unwrap();
    let entry = &schedule.spec.schedules[0];
    // 03:00 local (+8) is 19:00 UTC the previous day
    assert_eq!(entry.cron_expression, "0 19 * * *");
    assert_eq!(entry.retention_period, "2w");
    assert_eq!(entry.backup_method, "pg-basebackup");
}

#[test]
fn test_redis_cluster_splits_sentinel_for_multiple_replicas() {
    let mut redis = spec("cache", EngineType::Redis);
    redis.quota.replicas = 3;
    let doc = generate_cluster_doc(&redis, "redis-7.0.6", "ns").unwrap();
    let cluster: Cluster = serde_yaml::from_str(&doc).unwrap();
    let names: Vec<&str> = cluster
        .spec
        .component_specs
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, ["redis", "redis-sentinel"]);
    assert_eq!(cluster.spec.component_specs[0].replicas, 3);
}

#[test]
fn test_ops_doc_names_carry_type_fragment() {
    let vertical = resources::vertical_scaling_ops("pg-prod", EngineType::Postgresql, 2.0, 2.0, "ns");
    let doc = resources::ops_docs(&[vertical]).unwrap();
    let ops: OpsRequest = serde_yaml::from_str(&doc).unwrap();
    let name = ops.metadata.name.unwrap();
    assert!(name.starts_with("pg-prod-verticalscaling-"));
    assert_eq!(ops.spec.cluster_ref, "pg-prod");
    assert!(ops.spec.vertical_scaling.is_some());
}

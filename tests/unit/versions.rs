//! Tests for version discovery, ordering and caching.

use std::time::Duration;

use db_orchestrator::crd::{
    ClusterVersion, ClusterVersionSpec, ComponentRelease, ComponentVersion, ComponentVersionSpec,
};
use db_orchestrator::engine::EngineType;
use db_orchestrator::version::{merge_candidates, sort_versions, VersionCache};

fn cluster_version(name: &str, def: &str) -> ClusterVersion {
    ClusterVersion::new(
        name,
        ClusterVersionSpec {
            cluster_definition_ref: def.to_string(),
        },
    )
}

#[test]
fn test_deny_listed_version_is_never_latest() {
    // the denied id is numerically newer than every other candidate
    let registry = vec![
        cluster_version("ac-mysql-8.0.30", "apecloud-mysql"),
        cluster_version("ac-mysql-8.0.30-1", "apecloud-mysql"),
    ];
    let merged = merge_candidates(EngineType::ApecloudMysql, &registry, &[]);
    assert_eq!(merged.first().map(String::as_str), Some("ac-mysql-8.0.30"));
    assert!(!merged.iter().any(|v| v == "ac-mysql-8.0.30-1"));
}

#[test]
fn test_numeric_sort_beats_registry_order() {
    let registry = vec![
        cluster_version("postgresql-12.14.1", "postgresql"),
        cluster_version("postgresql-14.8.0", "postgresql"),
        cluster_version("postgresql-9.6.24", "postgresql"),
    ];
    let merged = merge_candidates(EngineType::Postgresql, &registry, &[]);
    assert_eq!(
        merged,
        ["postgresql-14.8.0", "postgresql-12.14.1", "postgresql-9.6.24"]
    );
}

#[test]
fn test_component_registry_feeds_excluded_engines() {
    let components = vec![ComponentVersion::new(
        "kafka",
        ComponentVersionSpec {
            releases: Some(vec![
                ComponentRelease {
                    name: Some("kafka-3.3.2".to_string()),
                    service_version: "3.3.2".to_string(),
                },
                ComponentRelease {
                    name: Some("kafka-2.7.0".to_string()),
                    service_version: "2.7.0".to_string(),
                },
            ]),
            compatibility_rules: None,
        },
    )];
    // kafka never reads the cluster-version registry, even when it has
    // entries there
    let stale = vec![cluster_version("kafka-1.0.0", "kafka")];
    let merged = merge_candidates(EngineType::Kafka, &stale, &components);
    assert_eq!(merged, ["kafka-3.3.2", "kafka-2.7.0"]);
}

#[test]
fn test_duplicate_releases_are_deduped() {
    let components = vec![ComponentVersion::new(
        "milvus",
        ComponentVersionSpec {
            releases: Some(vec![ComponentRelease {
                name: None,
                service_version: "2.4.5".to_string(),
            }]),
            compatibility_rules: Some(vec![db_orchestrator::crd::CompatibilityRule {
                releases: vec!["2.4.5".to_string(), "2.3.2".to_string()],
            }]),
        },
    )];
    let merged = merge_candidates(EngineType::Milvus, &[], &components);
    assert_eq!(merged, ["milvus-2.4.5", "milvus-2.3.2"]);
}

#[test]
fn test_cached_reads_within_ttl_see_one_population() {
    let cache = VersionCache::new(Duration::from_secs(300));
    cache.insert("ns", EngineType::Postgresql, vec!["postgresql-14.8.0".to_string()]);

    // both callers inside the TTL window observe the same stored list
    let first = cache.get("ns", EngineType::Postgresql);
    let second = cache.get("ns", EngineType::Postgresql);
    assert_eq!(first, second);
    assert_eq!(first, Some(vec!["postgresql-14.8.0".to_string()]));

    // a different namespace is a different key
    assert!(cache.get("other", EngineType::Postgresql).is_none());
}

#[test]
fn test_sort_handles_mixed_ids() {
    let mut ids = vec![
        "nightly".to_string(),
        "redis-7.0.6".to_string(),
        "redis-7.2.4".to_string(),
        "beta".to_string(),
    ];
    sort_versions(&mut ids);
    assert_eq!(ids, ["redis-7.2.4", "redis-7.0.6", "nightly", "beta"]);
}

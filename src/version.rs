//! Engine version discovery
//!
//! Versions come from two registries: `ClusterVersion` objects carry
//! one concrete version each (engine derived from the cluster
//! definition ref), while `ComponentVersion` objects carry all releases
//! of one component family. Both are cluster-scoped. Results are
//! cached per (namespace, engine) with a short TTL so bursts of
//! requests do not hammer the registry.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::crd::{ClusterVersion, ComponentVersion};
use crate::engine::{component_family, EngineType};
use crate::error::{Error, Result};

/// Version ids known to be broken and never offered for selection.
const DENY_LISTED_VERSIONS: &[&str] = &["ac-mysql-8.0.30-1"];

const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// TTL cache for discovered version lists. Expiry is passive, checked
/// on read; concurrent refreshes race and the last write wins.
pub struct VersionCache {
    ttl: Duration,
    entries: Mutex<HashMap<(String, EngineType), (Instant, Vec<String>)>>,
}

impl VersionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, namespace: &str, engine: EngineType) -> Option<Vec<String>> {
        let entries = self.entries.lock().expect("version cache poisoned");
        let (stored_at, versions) = entries.get(&(namespace.to_string(), engine))?;
        if stored_at.elapsed() > self.ttl {
            return None;
        }
        Some(versions.clone())
    }

    pub fn insert(&self, namespace: &str, engine: EngineType, versions: Vec<String>) {
        let mut entries = self.entries.lock().expect("version cache poisoned");
        entries.insert((namespace.to_string(), engine), (Instant::now(), versions));
    }
}

impl Default for VersionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// First run of digits-and-dots embedded in a version id, parsed into
/// numeric segments. `ac-mysql-8.0.30` yields `[8, 0, 30]`.
fn numeric_run(id: &str) -> Option<Vec<u64>> {
    let bytes = id.as_bytes();
    let start = bytes.iter().position(|b| b.is_ascii_digit())?;
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    let run = id[start..end].trim_end_matches('.');
    let segments: Vec<u64> = run.split('.').filter_map(|s| s.parse().ok()).collect();
    if segments.is_empty() { None } else { Some(segments) }
}

/// Sort version ids newest-first: numeric runs compared segment by
/// segment, ids without one ordered lexicographically after them.
pub fn sort_versions(versions: &mut [String]) {
    versions.sort_by(|a, b| match (numeric_run(a), numeric_run(b)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => b.cmp(a),
    });
}

/// Merge both registries into the candidate list for one engine:
/// registry-scan order prepends cluster versions and appends deduped
/// component releases, then the deny list is dropped and the result
/// sorted newest-first.
pub fn merge_candidates(
    engine: EngineType,
    cluster_versions: &[ClusterVersion],
    component_versions: &[ComponentVersion],
) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();

    if !engine.uses_component_versions() {
        for cv in cluster_versions {
            if EngineType::from_cluster_def(&cv.spec.cluster_definition_ref)
                .is_ok_and(|e| e == engine)
            {
                candidates.insert(0, cv.name_any());
            }
        }
    }

    for cv in component_versions {
        let Some((family_engine, prefix)) = component_family(&cv.name_any()) else {
            continue;
        };
        if family_engine != engine {
            continue;
        }
        let mut releases: Vec<&str> = cv
            .spec
            .releases
            .iter()
            .flatten()
            .map(|r| r.service_version.as_str())
            .collect();
        for rule in cv.spec.compatibility_rules.iter().flatten() {
            releases.extend(rule.releases.iter().map(String::as_str));
        }
        for release in releases {
            let id = format!("{prefix}{release}");
            if !candidates.contains(&id) {
                candidates.push(id);
            }
        }
    }

    candidates.retain(|id| !DENY_LISTED_VERSIONS.contains(&id.as_str()));
    sort_versions(&mut candidates);
    candidates
}

pub struct VersionResolver {
    client: Client,
    namespace: String,
    cache: VersionCache,
}

impl VersionResolver {
    pub fn new(client: Client, settings: &Settings) -> Self {
        Self::with_cache(client, settings, VersionCache::default())
    }

    pub fn with_cache(client: Client, settings: &Settings, cache: VersionCache) -> Self {
        Self {
            client,
            namespace: settings.namespace.clone(),
            cache,
        }
    }

    /// Discovered versions for an engine, newest-first, cached.
    pub async fn list_versions(&self, engine: EngineType) -> Result<Vec<String>> {
        if let Some(cached) = self.cache.get(&self.namespace, engine) {
            debug!(%engine, "version cache hit");
            return Ok(cached);
        }
        let versions = self.fetch(engine).await?;
        self.cache
            .insert(&self.namespace, engine, versions.clone());
        Ok(versions)
    }

    /// Newest discovered version for an engine.
    pub async fn latest(&self, engine: EngineType) -> Result<String> {
        self.list_versions(engine)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("no versions registered for {engine}")))
    }

    async fn fetch(&self, engine: EngineType) -> Result<Vec<String>> {
        let lp = ListParams::default();

        let cluster_versions = Api::<ClusterVersion>::all(self.client.clone())
            .list(&lp)
            .await
            .map_err(|e| Error::from_kube(e, "clusterversions"))?
            .items;

        // The component-version registry is optional on older platform
        // installs; treat a missing CRD as an empty registry.
        let component_versions = match Api::<ComponentVersion>::all(self.client.clone())
            .list(&lp)
            .await
        {
            Ok(list) => list.items,
            Err(err) => {
                warn!(error = %err, "componentversion registry unavailable");
                Vec::new()
            }
        };

        Ok(merge_candidates(engine, &cluster_versions, &component_versions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        ClusterVersionSpec, CompatibilityRule, ComponentRelease, ComponentVersionSpec,
    };

    fn cluster_version(name: &str, def: &str) -> ClusterVersion {
        ClusterVersion::new(
            name,
            ClusterVersionSpec {
                cluster_definition_ref: def.to_string(),
            },
        )
    }

    fn component_version(
        family: &str,
        releases: &[&str],
        rule_releases: &[&str],
    ) -> ComponentVersion {
        ComponentVersion::new(
            family,
            ComponentVersionSpec {
                releases: Some(
                    releases
                        .iter()
                        .map(|v| ComponentRelease {
                            name: None,
                            service_version: v.to_string(),
                        })
                        .collect(),
                ),
                compatibility_rules: if rule_releases.is_empty() {
                    None
                } else {
                    Some(vec![CompatibilityRule {
                        releases: rule_releases.iter().map(|s| s.to_string()).collect(),
                    }])
                },
            },
        )
    }

    #[test]
    fn test_sort_is_numeric_not_lexicographic() {
        let mut versions = vec![
            "postgresql-9.6.24".to_string(),
            "postgresql-14.8.0".to_string(),
            "postgresql-12.14.1".to_string(),
        ];
        sort_versions(&mut versions);
        assert_eq!(
            versions,
            ["postgresql-14.8.0", "postgresql-12.14.1", "postgresql-9.6.24"]
        );
    }

    #[test]
    fn test_non_numeric_ids_sort_last() {
        let mut versions = vec!["experimental".to_string(), "redis-7.0.6".to_string()];
        sort_versions(&mut versions);
        assert_eq!(versions, ["redis-7.0.6", "experimental"]);
    }

    #[test]
    fn test_merge_filters_other_engines_and_denied_ids() {
        let clusters = vec![
            cluster_version("postgresql-14.8.0", "postgresql"),
            cluster_version("mongodb-6.0", "mongodb"),
            cluster_version("ac-mysql-8.0.30-1", "apecloud-mysql"),
        ];
        let merged = merge_candidates(EngineType::Postgresql, &clusters, &[]);
        assert_eq!(merged, ["postgresql-14.8.0"]);

        let mysql = merge_candidates(EngineType::ApecloudMysql, &clusters, &[]);
        assert!(mysql.is_empty());
    }

    #[test]
    fn test_component_releases_synthesize_prefixed_ids() {
        let components = vec![component_version(
            "clickhouse",
            &["24.8.3", "22.9.4"],
            &["24.8.3"],
        )];
        let merged = merge_candidates(EngineType::Clickhouse, &[], &components);
        assert_eq!(merged, ["clickhouse-24.8.3", "clickhouse-22.9.4"]);
    }

    #[test]
    fn test_excluded_engines_skip_cluster_registry() {
        let clusters = vec![cluster_version("clickhouse-22.9.4", "clickhouse")];
        let merged = merge_candidates(EngineType::Clickhouse, &clusters, &[]);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_cache_expiry_and_overwrite() {
        let cache = VersionCache::new(Duration::ZERO);
        cache.insert("ns", EngineType::Redis, vec!["redis-7.0.6".to_string()]);
        assert!(cache.get("ns", EngineType::Redis).is_none());

        let cache = VersionCache::new(Duration::from_secs(60));
        cache.insert("ns", EngineType::Redis, vec!["redis-7.0.6".to_string()]);
        cache.insert("ns", EngineType::Redis, vec!["redis-7.2.4".to_string()]);
        assert_eq!(
            cache.get("ns", EngineType::Redis),
            Some(vec!["redis-7.2.4".to_string()])
        );
    }
}

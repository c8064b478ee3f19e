//! Cluster document generation
//!
//! The caller's single quota is split across an engine's components
//! according to its profile: single-component engines get everything,
//! redis adds a fixed sentinel sidecar, kafka and the vector stores
//! split cpu/memory/storage across their parts. Requests are pinned at
//! 10% of limits.

use kube::core::ObjectMeta;

use crate::crd::{
    Cluster, ClusterSpec, ComponentSpec, ResourceList, ResourceRequirements, VolumeClaimTemplate,
};
use crate::crd::{Affinity, StorageAmount, StorageResources, SwitchPolicy, VolumeClaimSpec};
use crate::engine::EngineType;
use crate::error::Result;
use crate::quota;
use crate::resources::common::{
    CLUSTER_FINALIZER, DATA_STORAGE_CLASS, ENGINE_LABEL_KEY, VERSION_LABEL_KEY, to_yaml_docs,
};
use crate::spec::DatabaseSpec;

/// One component's share of the instance quota.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentAllocation {
    pub name: &'static str,
    /// Millicores for this component's limit
    pub cpu_m: f64,
    /// Mi for this component's limit
    pub memory_mi: f64,
    /// Data volume in GiB; 0 means no volume claim
    pub storage_gib: u32,
    /// Fixed replica override (sentinel); None follows the instance
    pub replicas: Option<i32>,
}

fn share(name: &'static str, cpu_m: f64, memory_mi: f64, fraction: f64, storage: u32) -> ComponentAllocation {
    ComponentAllocation {
        name,
        cpu_m: cpu_m * fraction,
        memory_mi: memory_mi * fraction,
        storage_gib: storage,
        replicas: None,
    }
}

/// Split the instance quota across the engine's components.
///
/// `cpu` is cores, `memory` GiB, `storage` GiB, as supplied by the
/// caller; output allocations are in platform units.
pub fn distribute_resources(
    engine: EngineType,
    cpu: f64,
    memory: f64,
    storage: u32,
    replicas: i32,
) -> Vec<ComponentAllocation> {
    let cpu_m = (cpu * 1000.0).floor();
    let memory_mi = memory * 1024.0;
    let half = |v: u32| (v / 2).max(1);
    let quarter = |v: u32| ((v as f64 * 0.25).round() as u32).max(1);

    match engine {
        EngineType::Redis => {
            // Sentinel sizing depends on whether the deployment is HA.
            let (s_cpu, s_mem, s_storage, s_replicas) = if replicas > 1 {
                (200.0, 200.0, 1, 3)
            } else {
                (100.0, 100.0, 0, 1)
            };
            vec![
                share("redis", cpu_m, memory_mi, 1.0, storage.saturating_sub(1).max(1)),
                ComponentAllocation {
                    name: "redis-sentinel",
                    cpu_m: s_cpu,
                    memory_mi: s_mem,
                    storage_gib: s_storage,
                    replicas: Some(s_replicas),
                },
            ]
        }
        EngineType::Kafka => vec![
            share("kafka-broker", cpu_m, memory_mi, 0.25, half(storage)),
            share("controller", cpu_m, memory_mi, 0.5, half(storage)),
            share("kafka-exporter", cpu_m, memory_mi, 0.25, 0),
        ],
        EngineType::Milvus => vec![
            share("milvus", cpu_m, memory_mi, 0.5, half(storage)),
            share("etcd", cpu_m, memory_mi, 0.25, quarter(storage)),
            share("minio", cpu_m, memory_mi, 0.25, quarter(storage)),
        ],
        EngineType::Clickhouse => vec![
            share("clickhouse", cpu_m, memory_mi, 0.5, half(storage)),
            share("ch-keeper", cpu_m, memory_mi, 0.25, quarter(storage)),
            share("zookeeper", cpu_m, memory_mi, 0.25, quarter(storage)),
        ],
        other => {
            let components = other.profile().components;
            if components.len() == 1 {
                vec![share(components[0], cpu_m, memory_mi, 1.0, storage)]
            } else {
                let per = 1.0 / components.len() as f64;
                let per_storage = ((storage as f64 / components.len() as f64).round() as u32).max(1);
                components
                    .iter()
                    .map(|c| share(c, cpu_m, memory_mi, per, per_storage))
                    .collect()
            }
        }
    }
}

/// Platform resource requirements for one allocation: requests are 10%
/// of limits, floored to whole native units.
pub fn requirements(alloc: &ComponentAllocation) -> ResourceRequirements {
    ResourceRequirements {
        limits: Some(ResourceList {
            cpu: Some(format!("{}m", alloc.cpu_m.floor() as i64)),
            memory: Some(format!("{}Mi", alloc.memory_mi.round() as i64)),
        }),
        requests: Some(ResourceList {
            cpu: Some(format!("{}m", (alloc.cpu_m * 0.1).floor() as i64)),
            memory: Some(format!("{}Mi", (alloc.memory_mi * 0.1).floor() as i64)),
        }),
    }
}

fn component_spec(spec: &DatabaseSpec, alloc: &ComponentAllocation) -> ComponentSpec {
    let volume_claim_templates = if alloc.storage_gib > 0 {
        vec![VolumeClaimTemplate {
            name: "data".to_string(),
            spec: VolumeClaimSpec {
                access_modes: vec!["ReadWriteOnce".to_string()],
                resources: StorageResources {
                    requests: StorageAmount {
                        storage: quota::storage_to_native(alloc.storage_gib as f64),
                    },
                },
                storage_class_name: Some(DATA_STORAGE_CLASS.to_string()),
            },
        }]
    } else {
        Vec::new()
    };

    ComponentSpec {
        name: alloc.name.to_string(),
        component_def_ref: alloc.name.to_string(),
        replicas: alloc.replicas.unwrap_or(spec.quota.replicas),
        monitor: true,
        service_account_name: Some(spec.name.clone()),
        switch_policy: (spec.engine == EngineType::Postgresql).then(|| SwitchPolicy {
            type_: "Noop".to_string(),
        }),
        resources: requirements(alloc),
        volume_claim_templates,
    }
}

/// Build the cluster document for a validated spec and resolved version.
pub fn generate_cluster(spec: &DatabaseSpec, version: &str, namespace: &str) -> Cluster {
    let profile = spec.engine.profile();
    let allocations = distribute_resources(
        spec.engine,
        spec.quota.cpu,
        spec.quota.memory,
        spec.quota.storage,
        spec.quota.replicas,
    );

    let labels = std::collections::BTreeMap::from([
        (ENGINE_LABEL_KEY.to_string(), profile.cluster_def.to_string()),
        (VERSION_LABEL_KEY.to_string(), version.to_string()),
    ]);

    Cluster {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            finalizers: Some(vec![CLUSTER_FINALIZER.to_string()]),
            ..Default::default()
        },
        spec: ClusterSpec {
            cluster_definition_ref: profile.cluster_def.to_string(),
            cluster_version_ref: Some(version.to_string()),
            termination_policy: spec.termination_policy,
            component_specs: allocations
                .iter()
                .map(|alloc| component_spec(spec, alloc))
                .collect(),
            backup: None,
            affinity: Some(Affinity {
                node_labels: Default::default(),
                pod_anti_affinity: Some("Preferred".to_string()),
                tenancy: Some("SharedNode".to_string()),
                topology_keys: Vec::new(),
            }),
            tolerations: Vec::new(),
        },
        status: None,
    }
}

/// Cluster document as YAML.
pub fn generate_cluster_doc(spec: &DatabaseSpec, version: &str, namespace: &str) -> Result<String> {
    to_yaml_docs(&[generate_cluster(spec, version, namespace)])
}

//! Operation document generation
//!
//! Ops documents instruct the platform to perform one scaling or basic
//! lifecycle action against an existing cluster. Names embed a
//! timestamp because the platform keeps completed operations around for
//! audit and two operations of the same type may overlap in history.

use kube::core::ObjectMeta;

use crate::crd::{
    ComponentOps, OpsRequest, OpsRequestSpec, OpsType, OpsVolumeClaim, UpgradeOps,
    VerticalScalingOps, VolumeExpansionOps,
};
use crate::engine::EngineType;
use crate::error::Result;
use crate::quota;
use crate::resources::cluster::{distribute_resources, requirements};
use crate::resources::common::{CR_LABEL_KEY, to_yaml_docs};

fn ops_meta(db_name: &str, ops_type: OpsType, namespace: &str) -> ObjectMeta {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    ObjectMeta {
        name: Some(format!("{db_name}-{}-{stamp}", ops_type.name_fragment())),
        namespace: Some(namespace.to_string()),
        labels: Some(std::collections::BTreeMap::from([(
            CR_LABEL_KEY.to_string(),
            db_name.to_string(),
        )])),
        ..Default::default()
    }
}

fn ops_request(db_name: &str, ops_type: OpsType, namespace: &str) -> OpsRequest {
    OpsRequest {
        metadata: ops_meta(db_name, ops_type, namespace),
        spec: OpsRequestSpec {
            cluster_ref: db_name.to_string(),
            ops_type,
            vertical_scaling: None,
            horizontal_scaling: None,
            volume_expansion: None,
            restart: None,
            upgrade: None,
        },
    }
}

/// VerticalScaling document: new cpu/memory limits for every component,
/// distributed the same way create distributes them.
pub fn vertical_scaling_ops(
    db_name: &str,
    engine: EngineType,
    cpu: f64,
    memory: f64,
    namespace: &str,
) -> OpsRequest {
    let allocations = distribute_resources(engine, cpu, memory, 0, 1);
    let mut ops = ops_request(db_name, OpsType::VerticalScaling, namespace);
    ops.spec.vertical_scaling = Some(
        allocations
            .iter()
            .map(|alloc| VerticalScalingOps {
                component_name: alloc.name.to_string(),
                resources: requirements(alloc),
            })
            .collect(),
    );
    ops
}

/// HorizontalScaling document targeting the primary component only;
/// sidecars keep their fixed replica counts.
pub fn horizontal_scaling_ops(
    db_name: &str,
    engine: EngineType,
    replicas: i32,
    namespace: &str,
) -> OpsRequest {
    let mut ops = ops_request(db_name, OpsType::HorizontalScaling, namespace);
    ops.spec.horizontal_scaling = Some(vec![ComponentOps {
        component_name: engine.primary_component().to_string(),
        replicas: Some(replicas),
    }]);
    ops
}

/// VolumeExpansion document for the primary component's data volume.
pub fn volume_expansion_ops(
    db_name: &str,
    engine: EngineType,
    storage_gib: u32,
    namespace: &str,
) -> OpsRequest {
    let mut ops = ops_request(db_name, OpsType::VolumeExpansion, namespace);
    ops.spec.volume_expansion = Some(vec![VolumeExpansionOps {
        component_name: engine.primary_component().to_string(),
        volume_claim_templates: vec![OpsVolumeClaim {
            name: "data".to_string(),
            storage: quota::storage_to_native(storage_gib as f64),
        }],
    }]);
    ops
}

/// Start or Stop document; the action carries no component payload.
pub fn start_stop_ops(db_name: &str, start: bool, namespace: &str) -> OpsRequest {
    let ops_type = if start { OpsType::Start } else { OpsType::Stop };
    ops_request(db_name, ops_type, namespace)
}

/// Restart document; the platform restarts the named components.
pub fn restart_ops(db_name: &str, engine: EngineType, namespace: &str) -> OpsRequest {
    let mut ops = ops_request(db_name, OpsType::Restart, namespace);
    ops.spec.restart = Some(vec![ComponentOps {
        component_name: engine.primary_component().to_string(),
        replicas: None,
    }]);
    ops
}

/// Upgrade document switching the cluster to another registry version.
pub fn upgrade_ops(db_name: &str, version: &str, namespace: &str) -> OpsRequest {
    let mut ops = ops_request(db_name, OpsType::Upgrade, namespace);
    ops.spec.upgrade = Some(UpgradeOps {
        cluster_version_ref: version.to_string(),
    });
    ops
}

/// Render a batch of operation documents as multi-doc YAML.
pub fn ops_docs(requests: &[OpsRequest]) -> Result<String> {
    to_yaml_docs(requests)
}

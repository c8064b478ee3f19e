//! Shared constants and naming conventions for generated resources
//!
//! Every sub-resource generated for an instance carries the instance
//! label; listing and the delete cascade rely exclusively on it. Any
//! adjacent subsystem creating resources for the same instance must
//! apply the same label or its objects will be orphaned by delete.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::engine::EngineType;
use crate::error::Result;

/// Field manager / managed-by value on everything we create
pub const FIELD_MANAGER: &str = "db-orchestrator";

/// Wire-contract instance label shared with the platform
pub const INSTANCE_LABEL_KEY: &str = "app.kubernetes.io/instance";

/// Label tying operation documents back to their cluster
pub const CR_LABEL_KEY: &str = "db-orchestrator-cr";

/// Label carried by migration jobs created for an instance
pub const MIGRATION_JOB_LABEL_KEY: &str = "db-orchestrator-migrate";

/// Platform label carried by migration-task objects
pub const MIGRATION_TASK_LABEL_KEY: &str = "datamigration.apecloud.io/migrationtask";

/// Platform metadata labels the adapter reads engine/version from
pub const ENGINE_LABEL_KEY: &str = "clusterdefinition.kubeblocks.io/name";
pub const VERSION_LABEL_KEY: &str = "clusterversion.kubeblocks.io/name";

/// Annotation through which the platform reports effective storage use
pub const STORAGE_USED_ANNOTATION: &str = "db-orchestrator/storage-used";

/// Finalizer the platform expects on cluster objects
pub const CLUSTER_FINALIZER: &str = "cluster.kubeblocks.io/finalizer";

/// Storage class for data volumes
pub const DATA_STORAGE_CLASS: &str = "openebs-lvmpv-backup";

/// Separator between concatenated documents
pub const DOC_SEPARATOR: &str = "\n---\n";

/// Standard labels for generated sub-resources.
pub fn instance_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (INSTANCE_LABEL_KEY.to_string(), name.to_string()),
        (
            "app.kubernetes.io/managed-by".to_string(),
            FIELD_MANAGER.to_string(),
        ),
    ])
}

pub fn export_service_name(name: &str) -> String {
    format!("{name}-export")
}

pub fn credential_secret_name(name: &str) -> String {
    format!("{name}-conn-credential")
}

/// Parameter-configuration object name, `{instance}-{engine family}`.
/// The delete cascade addresses it by this fixed convention.
pub fn parameter_config_name(name: &str, engine: EngineType) -> String {
    format!("{name}-{}", engine.family())
}

pub fn backup_schedule_name(name: &str) -> String {
    format!("{name}-backup-schedule")
}

/// Resolve the API plural for a kind we generate or clean up. The
/// naive lowercase-plus-s guess breaks on BackupSchedule and friends,
/// so the table is explicit.
pub fn plural_for_kind(kind: &str) -> Option<&'static str> {
    Some(match kind {
        "Cluster" => "clusters",
        "OpsRequest" => "opsrequests",
        "BackupSchedule" => "backupschedules",
        "ParameterConfiguration" => "parameterconfigurations",
        "MigrationTask" => "migrationtasks",
        "ClusterVersion" => "clusterversions",
        "ComponentVersion" => "componentversions",
        "Service" => "services",
        "Secret" => "secrets",
        "ConfigMap" => "configmaps",
        "ServiceAccount" => "serviceaccounts",
        "Role" => "roles",
        "RoleBinding" => "rolebindings",
        "Job" => "jobs",
        "Pod" => "pods",
        _ => return None,
    })
}

/// Tag a native object with its apiVersion/kind. k8s-openapi types
/// carry those only as trait constants, not serialized fields, and the
/// resource client routes documents by them.
pub fn with_type_meta<T: Serialize>(
    api_version: &str,
    kind: &str,
    obj: &T,
) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(obj)?;
    value["apiVersion"] = serde_json::Value::String(api_version.to_string());
    value["kind"] = serde_json::Value::String(kind.to_string());
    Ok(value)
}

/// Serialize documents into one multi-document YAML string.
pub fn to_yaml_docs<T: Serialize>(docs: &[T]) -> Result<String> {
    let rendered: Result<Vec<String>> = docs
        .iter()
        .map(|d| serde_yaml::to_string(d).map_err(Into::into))
        .collect();
    Ok(rendered?.join(DOC_SEPARATOR))
}

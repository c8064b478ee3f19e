use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// BackupSchedule holds the scheduled-backup policy the platform
/// derives for a cluster. The orchestrator replaces its schedule
/// entries when the caller's auto-backup spec changes, and toggles
/// `enabled` through a JSON patch on pause/resume.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "dataprotection.kubeblocks.io",
    version = "v1alpha1",
    kind = "BackupSchedule",
    plural = "backupschedules",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct BackupScheduleSpec {
    /// Backup policy object the schedule executes against
    pub backup_policy_name: String,
    pub schedules: Vec<ScheduleEntry>,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub backup_method: String,
    pub cron_expression: String,
    pub enabled: bool,
    /// Platform retention string, e.g. "7d"
    pub retention_period: String,
}

/// MigrationTask tracks one data-migration run targeting a cluster.
/// The orchestrator never creates these; the delete cascade removes any
/// that carry the instance label.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "datamigration.apecloud.io",
    version = "v1alpha1",
    kind = "MigrationTask",
    plural = "migrationtasks",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MigrationTaskSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
}

//! Typed definitions of the platform custom resources this subsystem
//! consumes
//!
//! These kinds are owned by the cluster-orchestration platform; the
//! orchestrator creates and reads them but the platform is the source
//! of truth for status. Only the fields the orchestrator touches are
//! modeled.

mod cluster;
mod ops;
mod parameter;
mod registry;
mod schedule;

pub use cluster::{
    Affinity, Cluster, ClusterBackup, ClusterPhase, ClusterSpec, ClusterStatus, ComponentSpec,
    ComponentStatus, ResourceList, ResourceRequirements, StorageAmount, StorageResources,
    SwitchPolicy, VolumeClaimSpec, VolumeClaimTemplate,
};
pub use ops::{
    ComponentOps, OpsRequest, OpsRequestSpec, OpsType, OpsVolumeClaim, UpgradeOps,
    VerticalScalingOps, VolumeExpansionOps,
};
pub use parameter::{ConfigItem, ParameterConfiguration, ParameterConfigurationSpec};
pub use registry::{
    ClusterVersion, ClusterVersionSpec, CompatibilityRule, ComponentRelease, ComponentVersion,
    ComponentVersionSpec,
};
pub use schedule::{BackupSchedule, BackupScheduleSpec, ScheduleEntry};
pub use schedule::{MigrationTask, MigrationTaskSpec};

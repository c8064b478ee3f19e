use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::cluster::ResourceRequirements;

/// OpsRequest instructs the platform to perform one scaling or basic
/// lifecycle action against an existing cluster. Exactly one of the
/// action-specific sections is populated, matching `type`.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "apps.kubeblocks.io",
    version = "v1alpha1",
    kind = "OpsRequest",
    plural = "opsrequests",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct OpsRequestSpec {
    /// Target cluster name
    pub cluster_ref: String,

    #[serde(rename = "type")]
    pub ops_type: OpsType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_scaling: Option<Vec<VerticalScalingOps>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_scaling: Option<Vec<ComponentOps>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_expansion: Option<Vec<VolumeExpansionOps>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<Vec<ComponentOps>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<UpgradeOps>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum OpsType {
    VerticalScaling,
    HorizontalScaling,
    VolumeExpansion,
    Start,
    Stop,
    Restart,
    Upgrade,
}

impl OpsType {
    /// Fragment used in generated operation names (`{cluster}-{fragment}-{timestamp}`).
    pub fn name_fragment(&self) -> &'static str {
        match self {
            OpsType::VerticalScaling => "verticalscaling",
            OpsType::HorizontalScaling => "horizontalscaling",
            OpsType::VolumeExpansion => "volumeexpansion",
            OpsType::Start => "start",
            OpsType::Stop => "stop",
            OpsType::Restart => "restart",
            OpsType::Upgrade => "upgrade",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticalScalingOps {
    pub component_name: String,
    pub resources: ResourceRequirements,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOps {
    pub component_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VolumeExpansionOps {
    pub component_name: String,
    pub volume_claim_templates: Vec<OpsVolumeClaim>,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
pub struct OpsVolumeClaim {
    pub name: String,
    pub storage: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeOps {
    pub cluster_version_ref: String,
}

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ClusterVersion registers one concrete engine version (mechanism A).
/// Cluster-scoped; the object name is the version id callers reference
/// from `clusterVersionRef`.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "apps.kubeblocks.io",
    version = "v1alpha1",
    kind = "ClusterVersion",
    plural = "clusterversions"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterVersionSpec {
    /// Engine definition this version belongs to
    pub cluster_definition_ref: String,
}

/// ComponentVersion registers the versions of one component family
/// (mechanism B). The object name is the family name; service versions
/// are enumerated either as a flat release list or inside structured
/// compatibility rules, depending on platform release.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "apps.kubeblocks.io",
    version = "v1alpha1",
    kind = "ComponentVersion",
    plural = "componentversions"
)]
#[serde(rename_all = "camelCase")]
pub struct ComponentVersionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub releases: Option<Vec<ComponentRelease>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility_rules: Option<Vec<CompatibilityRule>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRelease {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub service_version: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityRule {
    #[serde(default)]
    pub releases: Vec<String>,
}

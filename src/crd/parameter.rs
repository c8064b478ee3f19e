use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ParameterConfiguration carries engine parameter overrides for one
/// cluster. Named `{instance}-{engine family}` by convention; the
/// delete cascade relies on that name.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "apps.kubeblocks.io",
    version = "v1alpha1",
    kind = "ParameterConfiguration",
    plural = "parameterconfigurations",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ParameterConfigurationSpec {
    pub cluster_ref: String,
    pub config_items: Vec<ConfigItem>,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigItem {
    /// Component the parameters apply to
    pub name: String,
    pub parameters: BTreeMap<String, String>,
}

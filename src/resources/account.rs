//! ServiceAccount / Role / RoleBinding generation
//!
//! The credentials trio is named after the instance. It is created
//! before the cluster document and replaced afterwards with an owner
//! reference carrying the cluster's uid, so garbage collection follows
//! the cluster once the uid is known.

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::core::ObjectMeta;

use crate::error::Result;
use crate::resources::common::{instance_labels, to_yaml_docs, with_type_meta};

fn owner_reference(cluster_name: &str, uid: &str) -> OwnerReference {
    OwnerReference {
        api_version: "apps.kubeblocks.io/v1alpha1".to_string(),
        kind: "Cluster".to_string(),
        name: cluster_name.to_string(),
        uid: uid.to_string(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

fn meta(name: &str, namespace: &str, cluster_uid: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(instance_labels(name)),
        owner_references: cluster_uid.map(|uid| vec![owner_reference(name, uid)]),
        ..Default::default()
    }
}

/// Generate the account documents for an instance as multi-doc YAML.
///
/// `cluster_uid` is absent on the first pass (the cluster does not
/// exist yet) and present on the post-create replace.
pub fn generate_account_docs(
    name: &str,
    namespace: &str,
    cluster_uid: Option<&str>,
) -> Result<String> {
    let service_account = ServiceAccount {
        metadata: meta(name, namespace, cluster_uid),
        ..Default::default()
    };

    let role = Role {
        metadata: meta(name, namespace, cluster_uid),
        rules: Some(vec![
            PolicyRule {
                api_groups: Some(vec![String::new()]),
                resources: Some(vec!["events".to_string()]),
                verbs: vec!["create".to_string()],
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec![String::new()]),
                resources: Some(vec!["configmaps".to_string(), "endpoints".to_string()]),
                verbs: [
                    "create", "get", "list", "patch", "update", "watch", "delete",
                ]
                .iter()
                .map(|v| v.to_string())
                .collect(),
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec![String::new()]),
                resources: Some(vec!["pods".to_string()]),
                verbs: ["get", "list", "patch", "update", "watch"]
                    .iter()
                    .map(|v| v.to_string())
                    .collect(),
                ..Default::default()
            },
        ]),
    };

    let role_binding = RoleBinding {
        metadata: meta(name, namespace, cluster_uid),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name: name.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: name.to_string(),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }]),
    };

    let docs = [
        with_type_meta("v1", "ServiceAccount", &service_account)?,
        with_type_meta("rbac.authorization.k8s.io/v1", "Role", &role)?,
        with_type_meta("rbac.authorization.k8s.io/v1", "RoleBinding", &role_binding)?,
    ];
    to_yaml_docs(&docs)
}

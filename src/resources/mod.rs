//! Document generators
//!
//! Each submodule renders one family of platform documents from a
//! validated database spec. Generators are pure; nothing here talks to
//! the API server.

pub mod account;
pub mod backup;
pub mod cluster;
pub mod common;
pub mod ops;
pub mod parameter;

pub use account::generate_account_docs;
pub use backup::{backup_cron_utc, generate_backup_doc, generate_backup_schedule, retention_period};
pub use cluster::{distribute_resources, generate_cluster, generate_cluster_doc, ComponentAllocation};
pub use common::{
    backup_schedule_name, credential_secret_name, export_service_name, instance_labels,
    parameter_config_name, to_yaml_docs, DOC_SEPARATOR, FIELD_MANAGER, INSTANCE_LABEL_KEY,
};
pub use ops::{
    horizontal_scaling_ops, ops_docs, restart_ops, start_stop_ops, upgrade_ops,
    vertical_scaling_ops, volume_expansion_ops,
};
pub use parameter::{generate_parameter_config, generate_parameter_doc, max_connections_score};

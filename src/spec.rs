//! Caller-supplied desired state for a database instance

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::engine::EngineType;
use crate::error::{Error, Result};

/// Maximum length of an instance name (DNS label limit)
pub const MAX_NAME_LEN: usize = 63;

/// What the platform does with storage when the cluster is deleted.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum TerminationPolicy {
    /// Remove the cluster but keep volumes
    #[default]
    Delete,
    /// Remove everything including data
    WipeOut,
}

/// Per-replica resource quota in human units.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, JsonSchema)]
pub struct QuotaSpec {
    /// CPU cores per replica
    pub cpu: f64,
    /// Memory in GiB per replica
    pub memory: f64,
    /// Storage in GiB per replica
    pub storage: u32,
    /// Replica count
    pub replicas: i32,
}

/// Requested change to a running instance's quota. Absent fields keep
/// their current value.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, JsonSchema)]
pub struct QuotaDelta {
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
    pub storage: Option<u32>,
    pub replicas: Option<i32>,
}

/// Retention unit for automatic backups.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RetentionUnit {
    Hours,
    Days,
    Weeks,
    Months,
}

impl RetentionUnit {
    /// Platform retention period suffix ("7d", "2w", ...).
    pub fn suffix(&self) -> &'static str {
        match self {
            RetentionUnit::Hours => "h",
            RetentionUnit::Days => "d",
            RetentionUnit::Weeks => "w",
            RetentionUnit::Months => "mo",
        }
    }
}

/// Automatic backup request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoBackupSpec {
    /// Whether scheduled backups are enabled
    pub enabled: bool,
    /// Hour of day, 0-23, in the caller's local (+8) offset
    pub hour: u8,
    /// Minute, 0-59
    pub minute: u8,
    /// Weekdays to run on; empty means daily
    #[serde(default)]
    pub week: Vec<Weekday>,
    /// Retention amount
    pub save_time: u32,
    /// Retention unit
    pub save_type: RetentionUnit,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    /// Cron day-of-week number, Sunday = 0.
    pub fn cron_number(&self) -> u8 {
        match self {
            Weekday::Sun => 0,
            Weekday::Mon => 1,
            Weekday::Tue => 2,
            Weekday::Wed => 3,
            Weekday::Thu => 4,
            Weekday::Fri => 5,
            Weekday::Sat => 6,
        }
    }
}

/// Engine parameter overrides applied via the parameter-configuration
/// document.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParameterConfig {
    /// Explicit max connections; when absent a value is scored from the
    /// instance's cpu/memory quota
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    /// MySQL only: "0" case-sensitive, "1" case-insensitive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_case_table_names: Option<String>,
    /// Free-form extra parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// Desired state of one database instance.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    /// Instance name, unique within the namespace, immutable
    pub name: String,
    /// Engine type, immutable after creation
    #[serde(rename = "type")]
    pub engine: EngineType,
    /// Registry version id; resolved to latest when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub quota: QuotaSpec,
    #[serde(default)]
    pub termination_policy: TerminationPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_backup: Option<AutoBackupSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_config: Option<ParameterConfig>,
}

/// Check a name is a DNS-subdomain-safe token.
fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-')
}

/// Validate a desired-state request before any platform call.
pub fn validate_spec(spec: &DatabaseSpec) -> Result<()> {
    if !valid_name(&spec.name) {
        return Err(Error::Validation(format!(
            "instance name {:?} is not a valid DNS label",
            spec.name
        )));
    }
    if spec.quota.cpu <= 0.0 {
        return Err(Error::Validation("cpu quota must be positive".into()));
    }
    if spec.quota.memory <= 0.0 {
        return Err(Error::Validation("memory quota must be positive".into()));
    }
    if spec.quota.storage == 0 {
        return Err(Error::Validation("storage quota must be positive".into()));
    }
    if spec.quota.replicas < 1 {
        return Err(Error::Validation("replica count must be at least 1".into()));
    }
    if let Some(backup) = &spec.auto_backup {
        if backup.hour > 23 || backup.minute > 59 {
            return Err(Error::Validation(format!(
                "invalid backup time {:02}:{:02}",
                backup.hour, backup.minute
            )));
        }
        if backup.save_time == 0 {
            return Err(Error::Validation("backup retention must be positive".into()));
        }
    }
    Ok(())
}

//! Backup schedule document generation
//!
//! Callers express backup times in a fixed +8 local offset; the
//! platform evaluates cron in UTC, so the hour is shifted and weekday
//! entries are carried across the date line where the shift crosses
//! midnight.

use kube::core::ObjectMeta;

use crate::crd::{BackupSchedule, BackupScheduleSpec, ScheduleEntry};
use crate::engine::EngineType;
use crate::error::Result;
use crate::resources::common::{backup_schedule_name, instance_labels, to_yaml_docs};
use crate::spec::AutoBackupSpec;

/// Caller-local offset from UTC, in hours
const LOCAL_UTC_OFFSET: i32 = 8;

/// Build the cron expression for an auto-backup spec, in caller-local
/// time. Empty weekday set means daily.
fn local_cron(backup: &AutoBackupSpec) -> String {
    let dow = if backup.week.is_empty() {
        "*".to_string()
    } else {
        backup
            .week
            .iter()
            .map(|d| d.cron_number().to_string())
            .collect::<Vec<_>>()
            .join(",")
    };
    format!("{} {} * * {}", backup.minute, backup.hour, dow)
}

/// Shift a cron expression's hour field by `offset` hours, adjusting
/// day-of-week entries when the shift crosses midnight. Wildcard hours
/// pass through untouched.
pub fn shift_cron(cron: &str, offset: i32) -> String {
    let fields: Vec<&str> = cron.split_whitespace().collect();
    if fields.len() != 5 || fields[1] == "*" {
        return cron.to_string();
    }
    let (minute, hour, dom, month, dow) = (fields[0], fields[1], fields[2], fields[3], fields[4]);
    let Ok(hour_num) = hour.parse::<i32>() else {
        return cron.to_string();
    };

    let shifted = hour_num + offset;
    let (new_hour, day_shift) = if shifted < 0 {
        (shifted + 24, -1)
    } else if shifted >= 24 {
        (shifted - 24, 1)
    } else {
        (shifted, 0)
    };

    let new_dow = if dow == "*" || day_shift == 0 {
        dow.to_string()
    } else {
        dow.split(',')
            .map(|d| match d.parse::<i32>() {
                Ok(n) => (((n + day_shift) % 7 + 7) % 7).to_string(),
                Err(_) => d.to_string(),
            })
            .collect::<Vec<_>>()
            .join(",")
    };

    format!("{minute} {new_hour} {dom} {month} {new_dow}")
}

/// UTC cron expression for an auto-backup spec.
pub fn backup_cron_utc(backup: &AutoBackupSpec) -> String {
    shift_cron(&local_cron(backup), -LOCAL_UTC_OFFSET)
}

/// Platform retention string, e.g. "7d".
pub fn retention_period(backup: &AutoBackupSpec) -> String {
    format!("{}{}", backup.save_time, backup.save_type.suffix())
}

/// Build the backup schedule document for an instance.
pub fn generate_backup_schedule(
    db_name: &str,
    engine: EngineType,
    backup: &AutoBackupSpec,
    namespace: &str,
) -> BackupSchedule {
    BackupSchedule {
        metadata: ObjectMeta {
            name: Some(backup_schedule_name(db_name)),
            namespace: Some(namespace.to_string()),
            labels: Some(instance_labels(db_name)),
            ..Default::default()
        },
        spec: BackupScheduleSpec {
            backup_policy_name: format!("{db_name}-{}-backup-policy", engine.family()),
            schedules: vec![ScheduleEntry {
                backup_method: engine.profile().backup_method.to_string(),
                cron_expression: backup_cron_utc(backup),
                enabled: backup.enabled,
                retention_period: retention_period(backup),
            }],
        },
    }
}

/// Backup schedule document as YAML.
pub fn generate_backup_doc(
    db_name: &str,
    engine: EngineType,
    backup: &AutoBackupSpec,
    namespace: &str,
) -> Result<String> {
    to_yaml_docs(&[generate_backup_schedule(db_name, engine, backup, namespace)])
}

//! Parameter-configuration document generation
//!
//! When the caller does not pin max_connections explicitly, a value is
//! scored from the instance's cpu/memory quota. Scoring never fails the
//! generation: engines without a scoring rule get 0, which the platform
//! treats as "use engine default".

use std::collections::BTreeMap;

use kube::core::ObjectMeta;

use crate::crd::{ConfigItem, ParameterConfiguration, ParameterConfigurationSpec};
use crate::engine::EngineType;
use crate::error::Result;
use crate::resources::common::{instance_labels, parameter_config_name, to_yaml_docs};
use crate::spec::DatabaseSpec;

/// Version-id prefix of the one (engine, version) pair whose parameter
/// template is incompatible with external configuration objects.
const INCOMPATIBLE: (EngineType, &str) = (EngineType::ApecloudMysql, "ac-mysql-8.0.30");

/// Score a max-connections value from the allocated quota.
///
/// `cpu_m` in millicores, `memory_mi` in Mi. Relational and document
/// engines weigh cpu at 400/core and memory at 300/GiB; redis runs
/// lighter per connection. Capped at 100k.
pub fn max_connections_score(engine: EngineType, cpu_m: f64, memory_mi: f64) -> u32 {
    let cores = cpu_m / 1000.0;
    let mem_gib = memory_mi / 1024.0;
    let score = match engine {
        EngineType::Postgresql | EngineType::Mongodb | EngineType::ApecloudMysql
        | EngineType::Mysql => (cores * 400.0 + mem_gib * 300.0).min(100_000.0),
        EngineType::Redis => (cores * 1000.0 + mem_gib * 500.0).min(100_000.0),
        _ => 0.0,
    };
    score.floor() as u32
}

/// Build the parameter-configuration document, or None when the target
/// (engine, version) pair cannot carry one.
pub fn generate_parameter_config(
    spec: &DatabaseSpec,
    version: &str,
    namespace: &str,
) -> Option<ParameterConfiguration> {
    if spec.engine == INCOMPATIBLE.0 && version.starts_with(INCOMPATIBLE.1) {
        return None;
    }

    let config = spec.parameter_config.clone().unwrap_or_default();

    let max_connections = config.max_connections.unwrap_or_else(|| {
        let cpu_m = (spec.quota.cpu * 1000.0).floor();
        let memory_mi = spec.quota.memory * 1024.0;
        max_connections_score(spec.engine, cpu_m, memory_mi).to_string()
    });

    let mut parameters = BTreeMap::new();
    parameters.insert("max_connections".to_string(), max_connections);
    if let Some(tz) = config.time_zone {
        parameters.insert("timezone".to_string(), tz);
    }
    if matches!(spec.engine, EngineType::ApecloudMysql | EngineType::Mysql) {
        if let Some(lctn) = config.lower_case_table_names {
            parameters.insert("lower_case_table_names".to_string(), lctn);
        }
    }
    parameters.extend(config.extra);

    Some(ParameterConfiguration {
        metadata: ObjectMeta {
            name: Some(parameter_config_name(&spec.name, spec.engine)),
            namespace: Some(namespace.to_string()),
            labels: Some(instance_labels(&spec.name)),
            ..Default::default()
        },
        spec: ParameterConfigurationSpec {
            cluster_ref: spec.name.clone(),
            config_items: vec![ConfigItem {
                name: spec.engine.primary_component().to_string(),
                parameters,
            }],
        },
    })
}

/// Parameter-configuration document as YAML; empty when omitted.
pub fn generate_parameter_doc(
    spec: &DatabaseSpec,
    version: &str,
    namespace: &str,
) -> Result<Option<String>> {
    match generate_parameter_config(spec, version, namespace) {
        Some(config) => Ok(Some(to_yaml_docs(&[config])?)),
        None => Ok(None),
    }
}

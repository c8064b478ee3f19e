//! Connection info resolution
//!
//! Builds the private connection string for an instance from its
//! credential secret and well-known service conventions, and derives
//! the public endpoint from exported services. Everything here is
//! best-effort: a missing secret or service yields `None`, never an
//! error, so instance reads degrade instead of failing.

use k8s_openapi::api::core::v1::{Secret, Service};
use kube::api::Api;
use kube::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{ConnectionScheme, EngineType};
use crate::resources::common::credential_secret_name;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub connection_string: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub port: Option<u16>,
}

fn secret_field(secret: &Secret, key: &str) -> Option<String> {
    let bytes = secret.data.as_ref()?.get(key)?;
    String::from_utf8(bytes.0.clone()).ok()
}

/// Decode username/password (and the optional port field) from a
/// credential secret, using `password_key` for the password entry.
pub fn decode_credentials(secret: &Secret, password_key: &str) -> Option<Credentials> {
    Some(Credentials {
        username: secret_field(secret, "username")?,
        password: secret_field(secret, password_key)?,
        port: secret_field(secret, "port").and_then(|p| p.parse().ok()),
    })
}

/// Fallback port when neither the secret nor the engine profile names
/// one.
fn default_port(engine: EngineType) -> u16 {
    match engine {
        EngineType::Postgresql => 5432,
        EngineType::Mongodb => 27017,
        EngineType::ApecloudMysql | EngineType::Mysql => 3306,
        EngineType::Redis => 6379,
        EngineType::Kafka => 9092,
        EngineType::Qdrant => 6333,
        EngineType::Nebula => 9669,
        EngineType::Weaviate => 8080,
        EngineType::Milvus => 19530,
        EngineType::Pulsar => 6650,
        EngineType::Clickhouse => 8123,
    }
}

/// In-cluster service host for an instance. Engines with a well-known
/// endpoint override use its suffix; the rest follow the
/// `{name}-{component}` service convention.
pub fn private_host(name: &str, namespace: &str, engine: EngineType) -> String {
    let profile = engine.profile();
    match profile.endpoint_override {
        Some((suffix, _)) => format!("{name}{suffix}.{namespace}.svc"),
        None => format!("{name}-{}.{namespace}.svc", engine.primary_component()),
    }
}

/// Render the connection string per the engine's scheme.
pub fn connection_string(
    engine: EngineType,
    username: &str,
    password: &str,
    host: &str,
    port: u16,
) -> String {
    match engine.profile().scheme {
        ConnectionScheme::Uri(scheme) => {
            format!("{scheme}://{username}:{password}@{host}:{port}")
        }
        ConnectionScheme::HostPort => format!("{host}:{port}"),
    }
}

/// Fetch credentials for an instance. Engines with a dedicated account
/// secret try it first and fall back to the shared credential secret
/// on absence, reading the password under the engine's alternate key.
pub async fn fetch_credentials(
    client: &Client,
    namespace: &str,
    name: &str,
    engine: EngineType,
) -> Option<Credentials> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let profile = engine.profile();

    if let Some(suffix) = profile.account_secret_suffix {
        let account_name = format!("{name}{suffix}");
        match secrets.get(&account_name).await {
            Ok(secret) => {
                if let Some(creds) = decode_credentials(&secret, "password") {
                    return Some(creds);
                }
            }
            Err(err) => debug!(name = %account_name, error = %err, "account secret unavailable"),
        }
    }

    let password_key = profile.fallback_password_key.unwrap_or("password");
    match secrets.get(&credential_secret_name(name)).await {
        Ok(secret) => decode_credentials(&secret, password_key),
        Err(err) => {
            debug!(name, error = %err, "credential secret unavailable");
            None
        }
    }
}

/// Private connection info for an instance, or `None` when the
/// credential secret cannot be read.
pub async fn private_connection(
    client: &Client,
    namespace: &str,
    name: &str,
    engine: EngineType,
) -> Option<ConnectionInfo> {
    let creds = fetch_credentials(client, namespace, name, engine).await?;
    let host = private_host(name, namespace, engine);
    let port = engine
        .profile()
        .endpoint_override
        .map(|(_, p)| p)
        .or(creds.port)
        .unwrap_or_else(|| default_port(engine));
    let connection_string = connection_string(engine, &creds.username, &creds.password, &host, port);
    Some(ConnectionInfo {
        host,
        port,
        username: creds.username,
        password: creds.password,
        connection_string,
    })
}

/// Public endpoint from exported services: the first LoadBalancer
/// ingress wins; NodePort services fall back to the supplied node
/// host. Headless and plain ClusterIP services are ignored.
pub fn public_endpoint(services: &[Service], node_host: Option<&str>) -> Option<(String, u16)> {
    for service in services {
        let Some(spec) = service.spec.as_ref() else {
            continue;
        };
        let first_port = spec.ports.as_ref().and_then(|p| p.first());
        match spec.type_.as_deref() {
            Some("LoadBalancer") => {
                let ingress = service
                    .status
                    .as_ref()
                    .and_then(|s| s.load_balancer.as_ref())
                    .and_then(|lb| lb.ingress.as_ref())
                    .and_then(|i| i.first());
                if let (Some(ingress), Some(port)) = (ingress, first_port) {
                    let host = ingress.ip.clone().or_else(|| ingress.hostname.clone());
                    if let Some(host) = host {
                        return Some((host, port.port as u16));
                    }
                }
            }
            Some("NodePort") => {
                let node_port = first_port.and_then(|p| p.node_port);
                if let (Some(host), Some(port)) = (node_host, node_port) {
                    return Some((host.to_string(), port as u16));
                }
            }
            _ => {}
        }
    }
    None
}

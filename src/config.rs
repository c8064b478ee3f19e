//! Runtime settings read from the environment at startup

use std::time::Duration;

/// Default per-call deadline for platform requests
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// Orchestrator settings.
///
/// `strict` controls the post-create fork: in strict mode a failed
/// account replace or backup sync after a successful cluster create is
/// surfaced to the caller; otherwise it is logged and the create is
/// still reported successful so a transient backup failure never
/// orphans a healthy cluster.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Namespace all generated resources land in
    pub namespace: String,
    /// Surface post-create enrichment failures instead of degrading
    pub strict: bool,
    /// Deadline applied to every platform call
    pub call_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Self {
        let namespace = std::env::var("ORCHESTRATOR_NAMESPACE").unwrap_or_else(|_| {
            tracing::warn!("ORCHESTRATOR_NAMESPACE not set, using 'default'");
            "default".to_string()
        });
        let strict = std::env::var("ORCHESTRATOR_STRICT")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let call_timeout = std::env::var("ORCHESTRATOR_CALL_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS));

        Self {
            namespace,
            strict,
            call_timeout,
        }
    }

    pub fn for_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            strict: false,
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }
}

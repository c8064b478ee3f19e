//! Error types for the database lifecycle orchestrator

use thiserror::Error;

/// Error variants are grouped by how callers are expected to react:
/// validation and permission errors are never retried, transient errors
/// are safe to retry with backoff, conflicts carry a distinct code so
/// callers can branch to "already exists" handling.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transient error (safe to retry): {0}")]
    Transient(String),

    #[error("Permission denied: {0}")]
    Permission(String),
}

impl Error {
    /// Classify a raw Kubernetes API error into the orchestrator taxonomy.
    ///
    /// 404 becomes [`Error::NotFound`], 409 [`Error::Conflict`], 403
    /// [`Error::Permission`]; 5xx and connection-level failures are
    /// [`Error::Transient`]. Everything else stays a wrapped kube error.
    pub fn from_kube(err: kube::Error, what: &str) -> Self {
        match &err {
            kube::Error::Api(resp) => match resp.code {
                404 => Error::NotFound(format!("{what}: {}", resp.message)),
                409 => Error::Conflict(format!("{what}: {}", resp.message)),
                403 => Error::Permission(format!("{what}: {}", resp.message)),
                code if code >= 500 => Error::Transient(format!("{what}: {}", resp.message)),
                _ => Error::Kube(err),
            },
            _ => Error::Kube(err),
        }
    }

    /// Whether a retry with backoff can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transient(_) => true,
            Error::Kube(kube::Error::Api(resp)) => {
                let code = resp.code;
                if (400..500).contains(&code) {
                    code == 409 || code == 429
                } else {
                    true
                }
            }
            Error::Kube(_) => true,
            Error::Conflict(_) => false,
            Error::Validation(_) | Error::Permission(_) => false,
            Error::NotFound(_) => false,
            Error::Serialization(_) | Error::Yaml(_) => false,
        }
    }

    /// True for errors produced by the "already exists" race on create.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Error::Conflict(_) => true,
            Error::Kube(kube::Error::Api(resp)) => resp.reason == "AlreadyExists",
            _ => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Dynamic resource client
//!
//! Applies and deletes multi-document YAML against the API server.
//! Documents are routed by their own apiVersion/kind through a fixed
//! kind-to-plural table, so a single client handles platform custom
//! resources and core objects alike. Every API call is bounded by the
//! configured timeout.

use std::future::Future;
use std::time::Duration;

use kube::api::{Api, ApiResource, DeleteParams, DynamicObject, GroupVersionKind, PostParams};
use kube::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::resources::common::{plural_for_kind, FIELD_MANAGER};

/// How a batch of documents is written to the API server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Create every document; on failure, best-effort delete the
    /// already-created prefix in reverse order and surface the error.
    Create,
    /// Replace existing objects with the current resourceVersion
    /// carried over; absent objects are created instead.
    Replace,
    /// Like [`ApplyMode::Create`], but a failure deletes *all* input
    /// documents. When `retry_on_conflict` is set and the failure was
    /// an "already exists" race, the batch is retried once after the
    /// cleanup.
    Update { retry_on_conflict: bool },
}

#[derive(Clone)]
pub struct ResourceClient {
    client: Client,
    namespace: String,
    timeout: Duration,
}

impl ResourceClient {
    pub fn new(client: Client, settings: &Settings) -> Self {
        Self {
            client,
            namespace: settings.namespace.clone(),
            timeout: settings.call_timeout,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Parse a multi-document YAML string, dropping empty documents and
    /// forcing the configured namespace into each object's metadata.
    pub fn parse_docs(&self, yaml: &str) -> Result<Vec<DynamicObject>> {
        let mut objects = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            let value = serde_yaml::Value::deserialize(doc)?;
            if value.is_null() {
                continue;
            }
            let mut obj: DynamicObject = serde_json::from_value(serde_json::to_value(&value)?)?;
            obj.metadata.namespace = Some(self.namespace.clone());
            objects.push(obj);
        }
        Ok(objects)
    }

    fn api_for(&self, obj: &DynamicObject) -> Result<Api<DynamicObject>> {
        let types = obj
            .types
            .as_ref()
            .ok_or_else(|| Error::Validation("document missing apiVersion/kind".to_string()))?;
        let (group, version) = match types.api_version.split_once('/') {
            Some((g, v)) => (g, v),
            None => ("", types.api_version.as_str()),
        };
        let gvk = GroupVersionKind::gvk(group, version, &types.kind);
        let ar = match plural_for_kind(&types.kind) {
            Some(plural) => ApiResource::from_gvk_with_plural(&gvk, plural),
            None => ApiResource::from_gvk(&gvk),
        };
        Ok(Api::namespaced_with(
            self.client.clone(),
            &self.namespace,
            &ar,
        ))
    }

    fn object_name(obj: &DynamicObject) -> Result<&str> {
        obj.metadata
            .name
            .as_deref()
            .ok_or_else(|| Error::Validation("document missing metadata.name".to_string()))
    }

    /// Run an API call under the configured timeout. A timeout is a
    /// [`Error::Transient`]; API errors are classified by `what`.
    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, kube::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(Error::from_kube(err, what)),
            Err(_) => Err(Error::Transient(format!(
                "{what}: timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Apply a multi-document YAML string with the given mode.
    pub async fn apply_yaml(&self, yaml: &str, mode: ApplyMode) -> Result<()> {
        let docs = self.parse_docs(yaml)?;
        self.apply(&docs, mode).await
    }

    pub async fn apply(&self, docs: &[DynamicObject], mode: ApplyMode) -> Result<()> {
        match mode {
            ApplyMode::Create => self.create_all(docs).await,
            ApplyMode::Replace => self.replace_all(docs).await,
            ApplyMode::Update { retry_on_conflict } => {
                match self.update_all(docs).await {
                    Err(err) if retry_on_conflict && err.is_already_exists() => {
                        debug!("retrying batch after already-exists race");
                        self.update_all(docs).await
                    }
                    other => other,
                }
            }
        }
    }

    async fn create_all(&self, docs: &[DynamicObject]) -> Result<()> {
        let pp = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        let mut created: Vec<&DynamicObject> = Vec::with_capacity(docs.len());
        for doc in docs {
            let name = Self::object_name(doc)?;
            let api = self.api_for(doc)?;
            if let Err(err) = self.bounded(name, api.create(&pp, doc)).await {
                for undo in created.into_iter().rev() {
                    self.delete_object(undo).await;
                }
                return Err(err);
            }
            created.push(doc);
        }
        Ok(())
    }

    async fn replace_all(&self, docs: &[DynamicObject]) -> Result<()> {
        let pp = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        for doc in docs {
            let name = Self::object_name(doc)?;
            let api = self.api_for(doc)?;
            match self.bounded(name, api.get(name)).await {
                Ok(current) => {
                    let mut replacement = doc.clone();
                    replacement.metadata.resource_version = current.metadata.resource_version;
                    self.bounded(name, api.replace(name, &pp, &replacement))
                        .await?;
                }
                Err(Error::NotFound(_)) => {
                    self.bounded(name, api.create(&pp, doc)).await?;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    async fn update_all(&self, docs: &[DynamicObject]) -> Result<()> {
        let pp = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        for doc in docs {
            let name = Self::object_name(doc)?;
            let api = self.api_for(doc)?;
            if let Err(err) = self.bounded(name, api.create(&pp, doc)).await {
                for undo in docs {
                    self.delete_object(undo).await;
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Best-effort deletion of every document in a multi-document YAML
    /// string. Failures are logged and swallowed.
    pub async fn delete_yaml(&self, yaml: &str) -> Result<()> {
        for doc in self.parse_docs(yaml)? {
            self.delete_object(&doc).await;
        }
        Ok(())
    }

    async fn delete_object(&self, doc: &DynamicObject) {
        let Ok(name) = Self::object_name(doc) else {
            return;
        };
        let Ok(api) = self.api_for(doc) else {
            return;
        };
        match self
            .bounded(name, api.delete(name, &DeleteParams::default()))
            .await
        {
            Ok(_) | Err(Error::NotFound(_)) => {}
            Err(err) => warn!(name, error = %err, "cleanup deletion failed"),
        }
    }
}

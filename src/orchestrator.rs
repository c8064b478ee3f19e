//! Lifecycle orchestration
//!
//! Request/response operations over the platform: create, read,
//! scale, pause/resume, restart, upgrade and delete database
//! instances. The orchestrator never waits for convergence; it
//! triggers platform operations and returns the currently observed
//! state. Callers poll `get` themselves.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret, Service};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use k8s_openapi::api::core::v1::ServiceAccount;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::adapter::{self, DbInstance, InstanceQuota, PublicEndpoint};
use crate::client::{ApplyMode, ResourceClient};
use crate::config::Settings;
use crate::connection::{private_connection, public_endpoint};
use crate::crd::{BackupSchedule, Cluster, MigrationTask, ParameterConfiguration};
use crate::engine::EngineType;
use crate::error::{Error, Result};
use crate::health::Metrics;
use crate::resources::common::{
    backup_schedule_name, credential_secret_name, export_service_name, parameter_config_name,
    DOC_SEPARATOR, ENGINE_LABEL_KEY, INSTANCE_LABEL_KEY, MIGRATION_JOB_LABEL_KEY,
    MIGRATION_TASK_LABEL_KEY,
};
use crate::resources::{account, backup, cluster, ops, parameter};
use crate::spec::{validate_spec, DatabaseSpec, QuotaDelta};
use crate::version::VersionResolver;

/// One category of resize derived by diffing desired quota against the
/// observed allocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalingIntent {
    VerticalScaling { cpu: f64, memory: f64 },
    HorizontalScaling { replicas: i32 },
    VolumeExpansion { storage_gib: u32 },
}

/// Result of `update`: the observed instance plus the intents that
/// were applied. An empty intent list is the explicit no-op outcome.
#[derive(Debug)]
pub struct UpdateOutcome {
    pub instance: DbInstance,
    pub intents: Vec<ScalingIntent>,
}

impl UpdateOutcome {
    pub fn is_noop(&self) -> bool {
        self.intents.is_empty()
    }
}

/// Deletion cascade steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeleteStep {
    MigrationResources,
    ExportService,
    CredentialSecret,
    Rbac,
    ParameterConfiguration,
    ConfigMaps,
    Cluster,
}

/// Per-step outcome of the deletion cascade. Best-effort steps record
/// their failure here instead of aborting the cascade.
#[derive(Debug, Serialize)]
pub struct StepOutcome {
    pub step: DeleteStep,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct DeleteReport {
    pub steps: Vec<StepOutcome>,
}

impl DeleteReport {
    fn record(&mut self, step: DeleteStep, result: Result<()>) {
        match result {
            Ok(()) => self.steps.push(StepOutcome {
                step,
                ok: true,
                error: None,
            }),
            Err(err) => {
                warn!(?step, error = %err, "deletion step failed");
                self.steps.push(StepOutcome {
                    step,
                    ok: false,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.steps.iter().all(|s| s.ok)
    }

    pub fn failed_steps(&self) -> Vec<DeleteStep> {
        self.steps.iter().filter(|s| !s.ok).map(|s| s.step).collect()
    }
}

/// Diff desired quota against the observed per-replica allocation.
/// Storage only ever grows; a smaller request is ignored.
pub fn compute_scaling_intents(current: &InstanceQuota, delta: &QuotaDelta) -> Vec<ScalingIntent> {
    const EPSILON: f64 = 1e-6;

    // Parsed limits of 0 mean unreadable, not an explicit zero quota.
    // Diffing against 0 would render a zero limit in the scaling
    // document, so unknown falls back to the platform defaults
    // (1 core, 1 GiB) before comparing.
    let observed_cpu = if current.cpu > EPSILON { current.cpu } else { 1.0 };
    let observed_memory = if current.memory > EPSILON {
        current.memory
    } else {
        1.0
    };

    let mut intents = Vec::new();

    let cpu = delta.cpu.unwrap_or(observed_cpu);
    let memory = delta.memory.unwrap_or(observed_memory);
    if (cpu - observed_cpu).abs() > EPSILON || (memory - observed_memory).abs() > EPSILON {
        intents.push(ScalingIntent::VerticalScaling { cpu, memory });
    }

    if let Some(replicas) = delta.replicas {
        if replicas != current.replicas {
            intents.push(ScalingIntent::HorizontalScaling { replicas });
        }
    }

    if let Some(storage) = delta.storage {
        if (storage as f64) > current.storage + EPSILON {
            intents.push(ScalingIntent::VolumeExpansion {
                storage_gib: storage,
            });
        }
    }

    intents
}

pub struct Orchestrator {
    client: Client,
    settings: Settings,
    resources: ResourceClient,
    versions: VersionResolver,
    metrics: Arc<Metrics>,
}

impl Orchestrator {
    pub fn new(client: Client, settings: Settings) -> Self {
        Self::with_metrics(client, settings, Arc::new(Metrics::new()))
    }

    /// Build with a shared metrics registry, so operation counters and
    /// durations surface on the health server's `/metrics` endpoint.
    pub fn with_metrics(client: Client, settings: Settings, metrics: Arc<Metrics>) -> Self {
        let resources = ResourceClient::new(client.clone(), &settings);
        let versions = VersionResolver::new(client.clone(), &settings);
        Self {
            client,
            settings,
            resources,
            versions,
            metrics,
        }
    }

    fn namespace(&self) -> &str {
        &self.settings.namespace
    }

    fn clusters(&self) -> Api<Cluster> {
        Api::namespaced(self.client.clone(), self.namespace())
    }

    fn instance_selector(name: &str) -> ListParams {
        ListParams::default().labels(&format!("{INSTANCE_LABEL_KEY}={name}"))
    }

    /// Bound a typed API call by the configured timeout.
    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, kube::Error>>,
    {
        match tokio::time::timeout(self.settings.call_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(Error::from_kube(err, what)),
            Err(_) => Err(Error::Transient(format!(
                "{what}: timed out after {:?}",
                self.settings.call_timeout
            ))),
        }
    }

    /// Record outcome and duration of one caller-facing operation.
    async fn timed<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let result = fut.await;
        self.metrics
            .record_operation(operation, started.elapsed().as_secs_f64());
        if result.is_err() {
            self.metrics.record_error(operation);
        }
        result
    }

    /// Create an instance: resolve version, apply the generated
    /// documents, then re-apply the account with an owner reference to
    /// the created cluster and sync the backup schedule.
    pub async fn create(&self, spec: &DatabaseSpec) -> Result<DbInstance> {
        self.timed("create", self.create_inner(spec)).await
    }

    async fn create_inner(&self, spec: &DatabaseSpec) -> Result<DbInstance> {
        validate_spec(spec)?;

        let version = match &spec.version {
            Some(version) => version.clone(),
            None => self.versions.latest(spec.engine).await?,
        };
        info!(name = %spec.name, engine = %spec.engine, %version, "creating instance");

        let mut docs = vec![
            account::generate_account_docs(&spec.name, self.namespace(), None)?,
            cluster::generate_cluster_doc(spec, &version, self.namespace())?,
        ];
        if let Some(doc) = parameter::generate_parameter_doc(spec, &version, self.namespace())? {
            docs.push(doc);
        }
        self.resources
            .apply_yaml(&docs.join(DOC_SEPARATOR), ApplyMode::Create)
            .await?;

        // uid is needed for the account's owner reference, so this
        // read is sequential, not joined with the writes below.
        let created = self
            .bounded("cluster", self.clusters().get(&spec.name))
            .await?;
        let uid = created.uid();

        let owned_account =
            account::generate_account_docs(&spec.name, self.namespace(), uid.as_deref())?;
        let account_apply = self
            .resources
            .apply_yaml(&owned_account, ApplyMode::Replace);
        let backup_sync = async {
            match &spec.auto_backup {
                Some(auto) if auto.enabled => {
                    let doc = backup::generate_backup_doc(
                        &spec.name,
                        spec.engine,
                        auto,
                        self.namespace(),
                    )?;
                    self.resources.apply_yaml(&doc, ApplyMode::Replace).await
                }
                _ => Ok(()),
            }
        };
        let (account_result, backup_result) = tokio::join!(account_apply, backup_sync);
        Self::absorb_post_create(
            self.settings.strict,
            [account_result, backup_result],
            &spec.name,
        )?;

        self.get_inner(&spec.name).await
    }

    /// Decide whether post-create step failures surface. The cluster
    /// already exists at this point; outside strict mode a failed
    /// enrichment must not orphan it.
    fn absorb_post_create(strict: bool, results: [Result<()>; 2], name: &str) -> Result<()> {
        for result in results {
            if let Err(err) = result {
                if strict {
                    return Err(err);
                }
                warn!(name, error = %err, "post-create step failed");
            }
        }
        Ok(())
    }

    /// Observed state of one instance, with pods, public endpoint and
    /// connection info resolved best-effort.
    pub async fn get(&self, name: &str) -> Result<DbInstance> {
        self.timed("get", self.get_inner(name)).await
    }

    async fn get_inner(&self, name: &str) -> Result<DbInstance> {
        let cluster = self.bounded("cluster", self.clusters().get(name)).await?;
        Ok(self.enrich(cluster).await)
    }

    /// All instances in the namespace, enriched concurrently; a failed
    /// enrichment degrades that item, never the listing.
    pub async fn list(&self) -> Result<Vec<DbInstance>> {
        self.timed("list", self.list_inner()).await
    }

    async fn list_inner(&self) -> Result<Vec<DbInstance>> {
        let lp = ListParams::default().labels(ENGINE_LABEL_KEY);
        let clusters = self
            .bounded("clusters", self.clusters().list(&lp))
            .await?
            .items;
        Ok(join_all(clusters.into_iter().map(|c| self.enrich(c))).await)
    }

    async fn enrich(&self, cluster: Cluster) -> DbInstance {
        let name = cluster.name_any();
        let pods_api: Api<Pod> = Api::namespaced(self.client.clone(), self.namespace());
        let services_api: Api<Service> = Api::namespaced(self.client.clone(), self.namespace());
        let selector = Self::instance_selector(&name);

        let engine = cluster
            .labels()
            .get(ENGINE_LABEL_KEY)
            .and_then(|def| EngineType::from_cluster_def(def).ok());

        let pods = self.bounded("pods", pods_api.list(&selector));
        let services = self.bounded("services", services_api.list(&selector));
        let connection = async {
            match engine {
                Some(engine) => {
                    private_connection(&self.client, self.namespace(), &name, engine).await
                }
                None => None,
            }
        };
        let (pods, services, connection) = tokio::join!(pods, services, connection);

        let pods = pods.map(|l| l.items).unwrap_or_else(|err| {
            debug!(%name, error = %err, "pod listing unavailable");
            Vec::new()
        });
        let services = services.map(|l| l.items).unwrap_or_else(|err| {
            debug!(%name, error = %err, "service listing unavailable");
            Vec::new()
        });

        // NodePort exposure needs a reachable node; the pod's host IP
        // is the closest thing the instance itself can offer.
        let node_host = pods
            .iter()
            .find_map(|p| p.status.as_ref().and_then(|s| s.host_ip.clone()));

        let mut instance = adapter::adapt(&cluster, &pods, connection);
        instance.public_endpoint = public_endpoint(&services, node_host.as_deref())
            .map(|(host, port)| PublicEndpoint { host, port });
        instance
    }

    /// Apply a quota change as scaling operations. Unchanged quota is
    /// an explicit no-op, never an error.
    pub async fn update(&self, name: &str, delta: &QuotaDelta) -> Result<UpdateOutcome> {
        self.timed("update", self.update_inner(name, delta)).await
    }

    async fn update_inner(&self, name: &str, delta: &QuotaDelta) -> Result<UpdateOutcome> {
        let cluster = self.bounded("cluster", self.clusters().get(name)).await?;
        let instance = adapter::adapt(&cluster, &[], None);
        let engine = instance.engine_type().ok_or_else(|| {
            Error::Validation(format!("instance {name} carries no engine label"))
        })?;

        let intents = compute_scaling_intents(&instance.quota, delta);
        if intents.is_empty() {
            debug!(name, "quota unchanged, nothing to apply");
            return Ok(UpdateOutcome {
                instance,
                intents,
            });
        }

        let requests: Vec<_> = intents
            .iter()
            .map(|intent| match *intent {
                ScalingIntent::VerticalScaling { cpu, memory } => {
                    ops::vertical_scaling_ops(name, engine, cpu, memory, self.namespace())
                }
                ScalingIntent::HorizontalScaling { replicas } => {
                    ops::horizontal_scaling_ops(name, engine, replicas, self.namespace())
                }
                ScalingIntent::VolumeExpansion { storage_gib } => {
                    ops::volume_expansion_ops(name, engine, storage_gib, self.namespace())
                }
            })
            .collect();
        info!(name, count = requests.len(), "applying scaling operations");
        self.resources
            .apply_yaml(&ops::ops_docs(&requests)?, ApplyMode::Create)
            .await?;

        let instance = self.get_inner(name).await?;
        Ok(UpdateOutcome { instance, intents })
    }

    /// Toggle the backup schedule's first entry. Absent schedules are
    /// skipped; other failures surface.
    async fn set_backup_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let api: Api<BackupSchedule> = Api::namespaced(self.client.clone(), self.namespace());
        let schedule_name = backup_schedule_name(name);
        let patch: json_patch::Patch = serde_json::from_value(json!([
            { "op": "replace", "path": "/spec/schedules/0/enabled", "value": enabled }
        ]))?;
        let pp = PatchParams::default();
        match self
            .bounded(
                "backupschedule",
                api.patch(&schedule_name, &pp, &Patch::<()>::Json(patch)),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(Error::NotFound(_)) => {
                debug!(name, "no backup schedule to toggle");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Stop an instance: drop its export service, disable backups and
    /// apply a Stop operation.
    pub async fn pause(&self, name: &str) -> Result<()> {
        self.timed("pause", self.pause_inner(name)).await
    }

    async fn pause_inner(&self, name: &str) -> Result<()> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), self.namespace());
        if let Err(err) = self
            .bounded(
                "service",
                services.delete(&export_service_name(name), &DeleteParams::default()),
            )
            .await
        {
            if !matches!(err, Error::NotFound(_)) {
                warn!(name, error = %err, "export service cleanup failed");
            }
        }

        self.set_backup_enabled(name, false).await?;

        let stop = ops::start_stop_ops(name, false, self.namespace());
        self.resources
            .apply_yaml(
                &ops::ops_docs(&[stop])?,
                ApplyMode::Update {
                    retry_on_conflict: true,
                },
            )
            .await
    }

    /// Start a stopped instance and re-enable its backups.
    pub async fn resume(&self, name: &str) -> Result<()> {
        self.timed("resume", self.resume_inner(name)).await
    }

    async fn resume_inner(&self, name: &str) -> Result<()> {
        self.set_backup_enabled(name, true).await?;

        let start = ops::start_stop_ops(name, true, self.namespace());
        self.resources
            .apply_yaml(
                &ops::ops_docs(&[start])?,
                ApplyMode::Update {
                    retry_on_conflict: true,
                },
            )
            .await
    }

    /// Restart an instance. Unlike connection resolution, the engine
    /// label is load-bearing here; an unreadable label fails fast.
    pub async fn restart(&self, name: &str) -> Result<DbInstance> {
        self.timed("restart", self.restart_inner(name)).await
    }

    async fn restart_inner(&self, name: &str) -> Result<DbInstance> {
        let cluster = self.bounded("cluster", self.clusters().get(name)).await?;
        let engine = cluster
            .labels()
            .get(ENGINE_LABEL_KEY)
            .ok_or_else(|| Error::Validation(format!("instance {name} carries no engine label")))
            .and_then(|def| EngineType::from_cluster_def(def))?;

        let restart = ops::restart_ops(name, engine, self.namespace());
        self.resources
            .apply_yaml(
                &ops::ops_docs(&[restart])?,
                ApplyMode::Update {
                    retry_on_conflict: true,
                },
            )
            .await?;
        self.get_inner(name).await
    }

    /// Switch an instance to another registry version.
    pub async fn upgrade(&self, name: &str, version: &str) -> Result<()> {
        self.timed("upgrade", self.upgrade_inner(name, version)).await
    }

    async fn upgrade_inner(&self, name: &str, version: &str) -> Result<()> {
        let upgrade = ops::upgrade_ops(name, version, self.namespace());
        info!(name, version, "applying upgrade operation");
        self.resources
            .apply_yaml(&ops::ops_docs(&[upgrade])?, ApplyMode::Create)
            .await
    }

    async fn delete_named<K>(&self, what: &str, name: &str) -> Result<()>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
            + Clone
            + serde::de::DeserializeOwned
            + std::fmt::Debug,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), self.namespace());
        Self::absorb_missing(
            self.bounded(what, api.delete(name, &DeleteParams::default()))
                .await
                .map(|_| ()),
        )
    }

    /// An already-absent object counts as deleted.
    fn absorb_missing(result: Result<()>) -> Result<()> {
        match result {
            Ok(()) | Err(Error::NotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn delete_labeled<K>(&self, what: &str, selector: &ListParams) -> Result<()>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
            + Clone
            + serde::de::DeserializeOwned
            + std::fmt::Debug,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), self.namespace());
        self.bounded(
            what,
            api.delete_collection(&DeleteParams::default(), selector),
        )
        .await
        .map(|_| ())
    }

    /// Remove an instance and everything generated for it, in a fixed
    /// order. Best-effort steps record their failure in the report and
    /// the cascade continues; RBAC and cluster deletion failures
    /// surface. Partial failure means "retry delete", never rollback.
    pub async fn delete(&self, name: &str) -> Result<DeleteReport> {
        self.timed("delete", self.delete_inner(name)).await
    }

    async fn delete_inner(&self, name: &str) -> Result<DeleteReport> {
        // Existence check up front so deleting an unknown instance is
        // NotFound instead of a cascade of no-ops.
        let cluster = self.bounded("cluster", self.clusters().get(name)).await?;
        let engine = cluster
            .labels()
            .get(ENGINE_LABEL_KEY)
            .and_then(|def| EngineType::from_cluster_def(def).ok());
        info!(name, "deleting instance");

        let mut report = DeleteReport::default();

        let job_selector =
            ListParams::default().labels(&format!("{MIGRATION_JOB_LABEL_KEY}={name}"));
        let task_selector =
            ListParams::default().labels(&format!("{MIGRATION_TASK_LABEL_KEY}={name}"));
        let migrations = async {
            self.delete_labeled::<Job>("migration jobs", &job_selector)
                .await?;
            self.delete_labeled::<MigrationTask>("migration tasks", &task_selector)
                .await
        };
        report.record(DeleteStep::MigrationResources, migrations.await);

        report.record(
            DeleteStep::ExportService,
            self.delete_named::<Service>("export service", &export_service_name(name))
                .await,
        );

        report.record(
            DeleteStep::CredentialSecret,
            self.delete_named::<Secret>("credential secret", &credential_secret_name(name))
                .await,
        );

        // RBAC removal is load-bearing; a failure here aborts.
        let rbac = async {
            self.delete_named::<RoleBinding>("role binding", name).await?;
            self.delete_named::<Role>("role", name).await?;
            self.delete_named::<ServiceAccount>("service account", name)
                .await
        };
        if let Err(err) = rbac.await {
            report.steps.push(StepOutcome {
                step: DeleteStep::Rbac,
                ok: false,
                error: Some(err.to_string()),
            });
            return Err(err);
        }
        report.record(DeleteStep::Rbac, Ok(()));

        match engine {
            Some(engine) => {
                report.record(
                    DeleteStep::ParameterConfiguration,
                    self.delete_named::<ParameterConfiguration>(
                        "parameter configuration",
                        &parameter_config_name(name, engine),
                    )
                    .await,
                );
            }
            None => {
                debug!(name, "engine label missing, skipping parameter cleanup");
                report.record(DeleteStep::ParameterConfiguration, Ok(()));
            }
        }

        report.record(
            DeleteStep::ConfigMaps,
            self.delete_labeled::<ConfigMap>("config maps", &Self::instance_selector(name))
                .await,
        );

        // Cluster deletion last; the platform cascades storage removal
        // per the instance's termination policy.
        if let Err(err) = self
            .bounded(
                "cluster",
                self.clusters().delete(name, &DeleteParams::default()),
            )
            .await
        {
            report.steps.push(StepOutcome {
                step: DeleteStep::Cluster,
                ok: false,
                error: Some(err.to_string()),
            });
            return Err(err);
        }
        report.record(DeleteStep::Cluster, Ok(()));

        Ok(report)
    }
}

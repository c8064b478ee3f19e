pub mod adapter;
pub mod client;
pub mod config;
pub mod connection;
pub mod crd;
pub mod engine;
pub mod error;
pub mod health;
pub mod orchestrator;
pub mod quota;
pub mod resources;
pub mod spec;
pub mod version;

pub use adapter::{adapt, DbInstance};
pub use client::{ApplyMode, ResourceClient};
pub use config::Settings;
pub use engine::EngineType;
pub use error::{Error, Result};
pub use health::{HealthState, Metrics};
pub use orchestrator::{
    DeleteReport, DeleteStep, Orchestrator, ScalingIntent, UpdateOutcome, compute_scaling_intents,
};
pub use spec::{DatabaseSpec, QuotaDelta, QuotaSpec};
pub use version::{VersionCache, VersionResolver};

//! Unit tests for the database lifecycle orchestrator
//!
//! This target covers cross-module behavior:
//! - Document generation pipelines (account, cluster, parameter, backup, ops)
//! - Version discovery and selection
//! - Scaling intent derivation
//! - Observed-state adaptation

mod documents;
mod scaling;
mod state;
mod versions;

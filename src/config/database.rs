//! Relational store configuration.

use serde::{Deserialize, Serialize};

/// Selects the `RoleDao` backend. Only `InMemory` is implemented in this
/// crate; a real deployment adds a Postgres-backed variant behind the same
/// trait (see `role::dao::RoleDao`).
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "snake_case", tag = "backend")]
pub enum DatabaseConfig {
    #[default]
    InMemory,
}

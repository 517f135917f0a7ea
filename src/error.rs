//! Core error kinds shared across the role/session/message pipeline.

use thiserror::Error;

/// Error surfaced by the core subsystems to their callers.
///
/// Cache and registry failures are generally degraded or logged internally
/// rather than turned into a `CoreError` (see `SPEC_FULL.md` §7); this enum
/// covers the outcomes callers are expected to branch on.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("role is banned: {0}")]
    Banned(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),

    #[error("internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl CoreError {
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    #[must_use]
    pub fn banned(what: impl Into<String>) -> Self {
        Self::Banned(what.into())
    }

    #[must_use]
    pub fn invalid_argument(what: impl Into<String>) -> Self {
        Self::InvalidArgument(what.into())
    }

    #[must_use]
    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }

    pub fn unavailable(source: impl Into<anyhow::Error>) -> Self {
        Self::Unavailable(source.into())
    }

    pub fn internal(source: impl Into<anyhow::Error>) -> Self {
        Self::Internal(source.into())
    }

    /// Stable, short label used as a metrics dimension and in error envelopes.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Banned(_) => "banned",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Conflict(_) => "conflict",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

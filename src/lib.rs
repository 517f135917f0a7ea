#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Role Server
//!
//! The core runtime of a sharded online-game backend: session lifecycle,
//! opcode dispatch, and load-aware registry publication.

/// Ordered collaborator wiring and lifecycle (start/stop).
pub mod app;

/// Load-balancing pickers over resolved registry nodes.
pub mod balancer;

/// Pluggable fan-out interface for server-initiated pushes.
pub mod broadcast;

/// Typed key-value cache facade and backend.
pub mod cache;

/// Server configuration and environment variables.
pub mod config;

/// Core error kinds shared across the role/session/message pipeline.
pub mod error;

/// Structured logging configuration.
pub mod logging;

/// Counters, histograms, sliding-window QPS, and host sampling.
pub mod metrics;

/// Per-message pipeline: load/verify role, ban gate, dispatch, record.
pub mod message;

/// Leased service registry: publish and resolve instance load.
pub mod registry;

/// Periodic Metrics -> Registry publisher.
pub mod reporter;

/// `Role` records and the three-tier read-through `RoleManager`.
pub mod role;

/// Opcode dispatch table.
pub mod router;

/// Per-map player position tracking.
pub mod scene;

/// Session binding and the disconnect-grace state machine.
pub mod session;

/// HTTP/JSON transport adapter (`GameHandler`).
pub mod transport;

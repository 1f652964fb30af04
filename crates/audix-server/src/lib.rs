//! # audix-server
//!
//! REST surface over [`audix_db::service::AudixService`]: templates and their
//! version history, comments, attachments, reports, checklists and analytics.
//! The `audixd` binary wires configuration, tracing and this router together.

pub mod error;
pub mod identity;
pub mod router;
pub mod routes;
pub mod state;

pub use router::audix_router;
pub use state::{AppState, ServerSettings};

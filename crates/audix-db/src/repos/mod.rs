//! Repository modules implementing the operations of every audix entity.
//!
//! Each module adds methods to `AudixService` via `impl AudixService` blocks.
//! Public methods take the service gate (a unit of work for mutations, read
//! access for queries); crate-private helpers assume the caller already holds it.

pub mod activity;
pub mod analytics;
pub mod attachment;
pub mod checklist;
pub mod comment;
pub mod item;
pub mod report;
pub mod template;
pub mod version;

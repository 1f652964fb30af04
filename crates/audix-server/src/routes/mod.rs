//! Route groups, merged by [`crate::router::audix_router`].

pub mod analytics;
pub mod attachments;
pub mod checklists;
pub mod comments;
pub mod common;
pub mod reports;
pub mod templates;
pub mod versions;

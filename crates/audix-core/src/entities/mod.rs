//! Entity structs for all audix domain objects.
//!
//! Each entity maps to a table in the libSQL database (see `audix-db/migrations`).
//! All structs derive `Serialize`, `Deserialize`, and `JsonSchema` for JSON roundtrip
//! and schema validation.

mod attachment;
mod checklist;
mod comment;
mod owner;
mod report;
mod template;

pub use attachment::Attachment;
pub use checklist::{Checklist, ChecklistItem};
pub use comment::TemplateComment;
pub use owner::OwnerRef;
pub use report::AuditReport;
pub use template::{AuditTemplate, TemplateFields, TemplateVersion};

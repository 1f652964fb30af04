//! Update builder types for entity mutations.
//!
//! Each builder produces an update struct with `Option` fields. Only `Some` fields
//! generate SET clauses in the dynamic UPDATE SQL, and only `Some` fields are
//! named in the activity entry's `changed_fields`.

pub mod item;
pub mod template;

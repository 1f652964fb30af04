//! ID prefixes for every persisted entity.
//!
//! IDs are generated by the database layer as `<prefix>-<12 hex chars>`.

pub const PREFIX_TEMPLATE: &str = "tpl";
pub const PREFIX_COMMENT: &str = "cmt";
pub const PREFIX_ATTACHMENT: &str = "att";
pub const PREFIX_REPORT: &str = "rpt";
pub const PREFIX_CHECKLIST: &str = "chk";
pub const PREFIX_ITEM: &str = "itm";
pub const PREFIX_ACTIVITY: &str = "act";

pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_TEMPLATE,
    PREFIX_COMMENT,
    PREFIX_ATTACHMENT,
    PREFIX_REPORT,
    PREFIX_CHECKLIST,
    PREFIX_ITEM,
    PREFIX_ACTIVITY,
];

/// Length of the random hex suffix.
pub const ID_HEX_LEN: usize = 12;

/// Check that `id` looks like `<prefix>-<hex>` for the given prefix.
#[must_use]
pub fn has_prefix(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|hex| hex.len() == ID_HEX_LEN && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

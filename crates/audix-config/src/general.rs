//! General application configuration.

use serde::{Deserialize, Serialize};

/// Default page size for list endpoints.
const fn default_limit() -> u32 {
    100
}

/// Hard cap on any requested page size.
const fn default_max_limit() -> u32 {
    500
}

/// Default number of entries in the activity feed.
const fn default_activity_limit() -> u32 {
    20
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Page size used when a list request does not pass `limit`.
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Largest page size a caller may request.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    /// Default length of the activity feed.
    #[serde(default = "default_activity_limit")]
    pub activity_limit: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            activity_limit: default_activity_limit(),
        }
    }
}

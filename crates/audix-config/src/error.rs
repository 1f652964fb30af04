//! Errors raised while loading or validating [`crate::AudixConfig`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file or `AUDIX_*` variable could not be parsed into the config shape.
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    /// A section is enabled but incomplete, e.g. `auth.enabled` with no tokens.
    #[error("Configuration section '{section}' is not configured (missing required fields)")]
    NotConfigured { section: String },

    /// A field failed validation: an unparsable `server.bind`, page limits out
    /// of order, an empty `database.path`, or a missing `--config` file.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

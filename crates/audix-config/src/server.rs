//! HTTP server settings.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Per-request timeout in seconds. `0` disables the timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum in-flight requests. `0` means unlimited.
    #[serde(default)]
    pub concurrency_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_secs: default_request_timeout_secs(),
            concurrency_limit: 0,
        }
    }
}

impl ServerConfig {
    /// Parse `bind` as a socket address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `bind` is not `host:port`.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind.parse().map_err(|e| ConfigError::InvalidValue {
            field: "server.bind".into(),
            reason: format!("{e}"),
        })
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    #[must_use]
    pub const fn concurrency_limit(&self) -> Option<usize> {
        match self.concurrency_limit {
            0 => None,
            limit => Some(limit),
        }
    }
}

//! Shared state for request handlers.

use std::sync::Arc;
use std::time::Duration;

use audix_config::{AudixConfig, AuthConfig};
use audix_db::service::AudixService;

/// Router-level settings derived from configuration.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Optional request timeout for handlers.
    pub request_timeout: Option<Duration>,
    /// Optional concurrency limit for handlers.
    pub concurrency_limit: Option<usize>,
    /// Default size of the activity feed.
    pub activity_limit: u32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            request_timeout: None,
            concurrency_limit: None,
            activity_limit: 20,
        }
    }
}

impl ServerSettings {
    #[must_use]
    pub fn from_config(config: &AudixConfig) -> Self {
        Self {
            request_timeout: config.server.request_timeout(),
            concurrency_limit: config.server.concurrency_limit(),
            activity_limit: config.general.activity_limit,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AudixService>,
    pub auth: Arc<AuthConfig>,
    pub settings: ServerSettings,
}

impl AppState {
    /// State with auth disabled and default settings.
    #[must_use]
    pub fn new(service: AudixService) -> Self {
        Self {
            service: Arc::new(service),
            auth: Arc::new(AuthConfig::default()),
            settings: ServerSettings::default(),
        }
    }

    #[must_use]
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    #[must_use]
    pub const fn with_settings(mut self, settings: ServerSettings) -> Self {
        self.settings = settings;
        self
    }
}

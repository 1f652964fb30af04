//! Bearer-token identity resolution settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_dev_user() -> String {
    "dev-user".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// When false every request acts as `dev_user` and no credential is required.
    #[serde(default)]
    pub enabled: bool,

    /// Acting user for unauthenticated development servers.
    #[serde(default = "default_dev_user")]
    pub dev_user: String,

    /// Static credentials: user name to bearer token.
    #[serde(default)]
    pub tokens: BTreeMap<String, String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dev_user: default_dev_user(),
            tokens: BTreeMap::new(),
        }
    }
}

impl AuthConfig {
    /// Resolve a bearer token to the user it belongs to.
    #[must_use]
    pub fn user_for_token(&self, token: &str) -> Option<&str> {
        self.tokens
            .iter()
            .find(|(_, t)| t.as_str() == token)
            .map(|(user, _)| user.as_str())
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.enabled || !self.tokens.is_empty()
    }
}

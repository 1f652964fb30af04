//! Integration tests for TOML configuration loading.
//!
//! Uses figment::Jail for safe, sandboxed env var manipulation.

use std::path::PathBuf;

use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;
use audix_config::{AudixConfig, ConfigError};

#[test]
fn loads_all_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
path = "/var/lib/audix/audix.db"

[storage]
root = "/var/lib/audix/blobs"

[server]
bind = "0.0.0.0:9000"
request_timeout_secs = 5
concurrency_limit = 64

[general]
default_limit = 25
max_limit = 200
activity_limit = 10

[auth]
enabled = true
dev_user = "nobody"

[auth.tokens]
alice = "alice-token"
bob = "bob-token"
"#,
        )?;

        let config: AudixConfig = Figment::from(Serialized::defaults(AudixConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.database.path, "/var/lib/audix/audix.db");
        assert_eq!(config.storage.root, PathBuf::from("/var/lib/audix/blobs"));
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.server.request_timeout_secs, 5);
        assert_eq!(config.server.concurrency_limit(), Some(64));
        assert_eq!(config.general.default_limit, 25);
        assert_eq!(config.general.max_limit, 200);
        assert_eq!(config.general.activity_limit, 10);
        assert!(config.auth.enabled);
        assert_eq!(config.auth.user_for_token("bob-token"), Some("bob"));
        config.validate().expect("valid");
        Ok(())
    });
}

#[test]
fn partial_section_keeps_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[server]
bind = "127.0.0.1:3000"
"#,
        )?;

        let config: AudixConfig = Figment::from(Serialized::defaults(AudixConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.server.concurrency_limit(), None);
        assert_eq!(config.database.path, ".audix/audix.db");
        Ok(())
    });
}

#[test]
fn project_local_file_is_picked_up() {
    Jail::expect_with(|jail| {
        jail.create_dir(".audix")?;
        jail.create_file(
            ".audix/config.toml",
            r#"
[general]
default_limit = 42
"#,
        )?;

        let config = AudixConfig::load().expect("config loads");
        assert_eq!(config.general.default_limit, 42);
        Ok(())
    });
}

#[test]
fn explicit_file_overrides_project_file() {
    Jail::expect_with(|jail| {
        jail.create_dir(".audix")?;
        jail.create_file(".audix/config.toml", "[general]\ndefault_limit = 42\n")?;
        jail.create_file("prod.toml", "[general]\ndefault_limit = 7\n")?;

        let config = AudixConfig::load_from(&jail.directory().join("prod.toml"))
            .expect("config loads");
        assert_eq!(config.general.default_limit, 7);
        Ok(())
    });
}

#[test]
fn missing_explicit_file_is_an_error() {
    Jail::expect_with(|jail| {
        let result = AudixConfig::load_from(&jail.directory().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        Ok(())
    });
}

#[test]
fn invalid_combination_fails_load() {
    Jail::expect_with(|jail| {
        jail.create_dir(".audix")?;
        jail.create_file(
            ".audix/config.toml",
            "[general]\ndefault_limit = 50\nmax_limit = 10\n",
        )?;
        assert!(AudixConfig::load().is_err());
        Ok(())
    });
}

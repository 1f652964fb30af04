use figment::Jail;
use pretty_assertions::assert_eq;
use audix_config::AudixConfig;

#[test]
fn env_overrides_nested_fields() {
    Jail::expect_with(|jail| {
        jail.set_env("AUDIX_SERVER__BIND", "127.0.0.1:9999");
        jail.set_env("AUDIX_GENERAL__MAX_LIMIT", "50");
        jail.set_env("AUDIX_GENERAL__DEFAULT_LIMIT", "10");
        jail.set_env("AUDIX_STORAGE__IN_MEMORY", "true");

        let config = AudixConfig::load().expect("config loads");
        assert_eq!(config.server.bind, "127.0.0.1:9999");
        assert_eq!(config.general.max_limit, 50);
        assert_eq!(config.general.default_limit, 10);
        assert!(config.storage.in_memory);
        Ok(())
    });
}

#[test]
fn env_beats_project_file() {
    Jail::expect_with(|jail| {
        jail.create_dir(".audix")?;
        jail.create_file(".audix/config.toml", "[database]\npath = \"from-file.db\"\n")?;
        jail.set_env("AUDIX_DATABASE__PATH", "from-env.db");

        let config = AudixConfig::load().expect("config loads");
        assert_eq!(config.database.path, "from-env.db");
        Ok(())
    });
}

#[test]
fn env_supplies_auth_tokens() {
    Jail::expect_with(|jail| {
        jail.set_env("AUDIX_AUTH__ENABLED", "true");
        jail.set_env("AUDIX_AUTH__TOKENS__CAROL", "carol-token");

        let config = AudixConfig::load().expect("config loads");
        assert!(config.auth.enabled);
        assert_eq!(config.auth.user_for_token("carol-token"), Some("carol"));
        Ok(())
    });
}

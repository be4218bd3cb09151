#[cfg(test)]
mod tests {
    use empenhos::libs::config::{
        BootstrapConfig, Config, DatabaseConfig, ExportConfig, LogConfig, PasswordSource, ADMIN_PASSWORD_ENV,
        CONFIG_FILE_NAME,
    };
    use std::env;
    use empenhos::libs::data_storage::DataStorage;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct ConfigTestContext {
        temp_dir: TempDir,
        storage: DataStorage,
    }

    impl TestContext for ConfigTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let storage = DataStorage::at(temp_dir.path().join("data"));
            ConfigTestContext { temp_dir, storage }
        }
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_missing_file_means_defaults(ctx: &mut ConfigTestContext) {
        let config = Config::read_from(&ctx.storage).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log.level, "info");
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert_eq!(config.bootstrap.username, "natan");
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_save_and_read(ctx: &mut ConfigTestContext) {
        let config = Config {
            database: DatabaseConfig {
                path: Some(ctx.temp_dir.path().join("custom.db")),
                busy_timeout_ms: 250,
            },
            export: ExportConfig {
                dir: Some(ctx.temp_dir.path().join("out")),
            },
            log: LogConfig {
                level: "debug".to_string(),
                file: Some(PathBuf::from("app.log")),
            },
            ..Config::default()
        };
        config.save_to(&ctx.storage).unwrap();

        assert_eq!(Config::read_from(&ctx.storage).unwrap(), config);
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_partial_file_fills_defaults(ctx: &mut ConfigTestContext) {
        let path = ctx.storage.get_path(CONFIG_FILE_NAME).unwrap();
        fs::write(&path, r#"{ "log": { "level": "warn" } }"#).unwrap();

        let config = Config::read_from(&ctx.storage).unwrap();
        assert_eq!(config.log.level, "warn");
        assert_eq!(config.log.file, None);
        assert_eq!(config.database, DatabaseConfig::default());
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_default_paths_live_in_storage(ctx: &mut ConfigTestContext) {
        let config = Config::default();
        let db_path = config.database.resolve_path(&ctx.storage).unwrap();
        let export_dir = config.export.resolve_dir(&ctx.storage).unwrap();

        assert_eq!(db_path, ctx.storage.base_path().join("empenhos.db"));
        assert!(export_dir.is_dir());
        assert!(export_dir.starts_with(ctx.storage.base_path()));
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_malformed_file_is_an_error(ctx: &mut ConfigTestContext) {
        let path = ctx.storage.get_path(CONFIG_FILE_NAME).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::read_from(&ctx.storage).is_err());
    }

    #[test]
    fn test_bootstrap_password_source() {
        // The environment wins over everything; only check the rest without it.
        if env::var(ADMIN_PASSWORD_ENV).is_ok() {
            return;
        }

        let shipped = BootstrapConfig::default();
        assert_eq!(shipped.password_source(), PasswordSource::Shipped);
        assert!(!shipped.resolve_password().is_empty());

        let configured = BootstrapConfig {
            password: Some("from-file".to_string()),
            ..BootstrapConfig::default()
        };
        assert_eq!(configured.password_source(), PasswordSource::Config);
        assert_eq!(configured.resolve_password(), "from-file");
    }
}

//! Application configuration.
//!
//! The configuration is a pretty-printed JSON file (`config.json`) stored in
//! the platform data directory. A missing file means defaults; every section
//! is optional inside the file and falls back to its own defaults.
//!
//! ```json
//! {
//!   "database": { "path": null, "busy_timeout_ms": 5000 },
//!   "export": { "dir": "/srv/empenhos/exports" },
//!   "log": { "level": "info", "file": "app.log" },
//!   "bootstrap": { "username": "natan", "email": "admin@example.com" }
//! }
//! ```
//!
//! Components never read the configuration on their own: `main` loads it once
//! and hands the relevant section to each component it constructs.

use super::data_storage::DataStorage;
use crate::libs::messages::Message;
use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{self, File};
use std::path::PathBuf;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DB_FILE_NAME: &str = "empenhos.db";
pub const EXPORT_DIR_NAME: &str = "exports";

/// Maximum length of the free-text notes field.
pub const MAX_NOTES_LENGTH: usize = 500;
/// Overrides the bootstrap administrator password without storing it in `config.json`.
pub const ADMIN_PASSWORD_ENV: &str = "EMPENHOS_ADMIN_PASSWORD";
/// Password the first deployment shipped with; last resort when seeding.
const SHIPPED_ADMIN_PASSWORD: &str = "@31n19v01m@";

/// Where the bootstrap administrator password comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordSource {
    Env,
    Config,
    Shipped,
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file; `None` resolves to `<data dir>/empenhos.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// How long a writer waits for a competing lock before failing.
    pub busy_timeout_ms: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct ExportConfig {
    /// Export directory; `None` resolves to `<data dir>/exports`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `info` or `empenhos=debug`.
    pub level: String,

    /// When set, log lines are also appended to this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// The administrator account seeded on first start.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BootstrapConfig {
    pub username: String,
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub export: ExportConfig,
    pub log: LogConfig,
    pub bootstrap: BootstrapConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: None,
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        BootstrapConfig {
            username: "natan".to_string(),
            email: "admin@example.com".to_string(),
            password: None,
        }
    }
}

impl DatabaseConfig {
    pub fn resolve_path(&self, storage: &DataStorage) -> std::io::Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => storage.get_path(DB_FILE_NAME),
        }
    }
}

impl ExportConfig {
    pub fn resolve_dir(&self, storage: &DataStorage) -> std::io::Result<PathBuf> {
        match &self.dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                Ok(dir.clone())
            }
            None => storage.get_dir(EXPORT_DIR_NAME),
        }
    }
}

impl BootstrapConfig {
    /// Precedence: `EMPENHOS_ADMIN_PASSWORD`, then `config.json`, then the
    /// password the original deployment shipped with.
    pub fn password_source(&self) -> PasswordSource {
        if env_password().is_some() {
            PasswordSource::Env
        } else if self.password.is_some() {
            PasswordSource::Config
        } else {
            PasswordSource::Shipped
        }
    }

    /// Password used when seeding the administrator.
    pub fn resolve_password(&self) -> String {
        env_password()
            .or_else(|| self.password.clone())
            .unwrap_or_else(|| SHIPPED_ADMIN_PASSWORD.to_string())
    }
}

fn env_password() -> Option<String> {
    env::var(ADMIN_PASSWORD_ENV).ok().filter(|p| !p.is_empty())
}

impl Config {
    pub fn read() -> Result<Config> {
        Self::read_from(&DataStorage::new())
    }

    pub fn read_from(storage: &DataStorage) -> Result<Config> {
        let config_file_path = storage.get_path(CONFIG_FILE_NAME)?;

        if !config_file_path.exists() {
            return Ok(Config::default());
        }

        let config_str = fs::read_to_string(config_file_path)?;
        let config: Config = serde_json::from_str(&config_str)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&DataStorage::new())
    }

    pub fn save_to(&self, storage: &DataStorage) -> Result<()> {
        let config_file_path = storage.get_path(CONFIG_FILE_NAME)?;
        let config_file = File::create(config_file_path)?;
        serde_json::to_writer_pretty(&config_file, &self)?;
        Ok(())
    }

    /// Interactive wizard seeded with the current values.
    pub fn init() -> Result<Self> {
        let current = Self::read().unwrap_or_default();
        let theme = ColorfulTheme::default();

        let db_path: String = Input::with_theme(&theme)
            .with_prompt(Message::PromptDatabasePath.to_string())
            .default(path_or_empty(&current.database.path))
            .allow_empty(true)
            .interact_text()?;

        let export_dir: String = Input::with_theme(&theme)
            .with_prompt(Message::PromptExportDir.to_string())
            .default(path_or_empty(&current.export.dir))
            .allow_empty(true)
            .interact_text()?;

        let level_index = LOG_LEVELS.iter().position(|l| *l == current.log.level).unwrap_or(2);
        let level = Select::with_theme(&theme)
            .with_prompt(Message::PromptLogLevel.to_string())
            .items(LOG_LEVELS)
            .default(level_index)
            .interact()?;

        let log_file: String = Input::with_theme(&theme)
            .with_prompt(Message::PromptLogFile.to_string())
            .default(path_or_empty(&current.log.file))
            .allow_empty(true)
            .interact_text()?;

        let username: String = Input::with_theme(&theme)
            .with_prompt(Message::PromptBootstrapUsername.to_string())
            .default(current.bootstrap.username.clone())
            .interact_text()?;

        let email: String = Input::with_theme(&theme)
            .with_prompt(Message::PromptBootstrapEmail.to_string())
            .default(current.bootstrap.email.clone())
            .interact_text()?;

        Ok(Config {
            database: DatabaseConfig {
                path: empty_to_none(db_path),
                ..current.database
            },
            export: ExportConfig {
                dir: empty_to_none(export_dir),
            },
            log: LogConfig {
                level: LOG_LEVELS[level].to_string(),
                file: empty_to_none(log_file),
            },
            bootstrap: BootstrapConfig {
                username,
                email,
                password: current.bootstrap.password,
            },
        })
    }
}

fn path_or_empty(path: &Option<PathBuf>) -> String {
    path.as_ref().map(|p| p.display().to_string()).unwrap_or_default()
}

fn empty_to_none(value: String) -> Option<PathBuf> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

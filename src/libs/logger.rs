//! `tracing` subscriber set-up.
//!
//! Events go to the configured log file when there is one, otherwise to
//! stderr but only in debug mode (`EMPENHOS_DEBUG` or `RUST_LOG` set).
//! Without either, no subscriber is installed and events are dropped.
//!
//! `RUST_LOG` takes precedence over the configured level.

use super::config::LogConfig;
use super::messages::macros::set_debug_mode;
use anyhow::{Context, Result};
use std::env;
use std::fs::{File, OpenOptions};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Keeps the log file open; syncs it to disk on drop.
#[must_use]
pub struct LoggerGuard {
    file: Option<Arc<File>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            let _ = file.sync_all();
        }
    }
}

pub fn debug_requested() -> bool {
    env::var("EMPENHOS_DEBUG").is_ok() || env::var("RUST_LOG").is_ok()
}

pub fn build_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log level '{}'", level)),
    }
}

/// Installs the global subscriber. Call once, before the first message.
pub fn init(config: &LogConfig) -> Result<LoggerGuard> {
    let debug = debug_requested();
    set_debug_mode(debug);

    if let Some(path) = &config.file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        let file = Arc::new(file);

        tracing_subscriber::fmt()
            .with_env_filter(build_filter(&config.level)?)
            .with_writer(Arc::clone(&file))
            .with_ansi(false)
            .with_target(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;

        return Ok(LoggerGuard { file: Some(file) });
    }

    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(build_filter(&config.level)?)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    Ok(LoggerGuard { file: None })
}

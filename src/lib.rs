//! Registry of public-spending commitment orders (empenhos).
//!
//! - [`db`]: SQLite storage, schema versioning and repositories.
//! - [`libs`]: configuration, domain types, export and terminal output.
//! - [`commands`]: the `empenhos` command-line interface.

pub mod commands;
pub mod db;
pub mod libs;

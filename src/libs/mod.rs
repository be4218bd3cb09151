//! Shared building blocks: configuration, domain types, formatting,
//! export, terminal views and messaging.

pub mod config;
pub mod data_storage;
pub mod empenho;
pub mod error;
pub mod export;
pub mod formatter;
pub mod logger;
pub mod messages;
pub mod user;
pub mod view;

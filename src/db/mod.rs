//! SQLite persistence.
//!
//! - [`db::Db`]: file handle and the transactional [`scope`](db::Db::scope).
//! - [`migrations`]: versioned schema, including adoption of older layouts.
//! - [`schema::ensure_schema`]: start-up entry point, migrations plus the
//!   bootstrap administrator.
//! - [`empenhos`], [`users`], [`credentials`]: repositories. Each borrows a
//!   connection, normally the transaction handed out by a scope.
//!
//! ```rust,no_run
//! use empenhos::db::{db::Db, schema::ensure_schema, users::Users};
//! use empenhos::libs::config::BootstrapConfig;
//!
//! let db = Db::open("empenhos.db");
//! ensure_schema(&db, &BootstrapConfig::default())?;
//! let admins = db.scope(|tx| Users::new(tx).count_admins())?;
//! # Ok::<(), empenhos::libs::error::StoreError>(())
//! ```

pub mod credentials;
pub mod db;
pub mod empenhos;
pub mod migrations;
pub mod schema;
pub mod users;

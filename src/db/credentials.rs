use crate::db::users::{map_user, SELECT_USERS};
use crate::libs::error::{StoreError, StoreResult};
use crate::libs::user::User;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `password`.
///
/// Unsalted, matching the hashes already stored by earlier releases.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Username/password checks against the users table.
pub struct Credentials<'c> {
    conn: &'c Connection,
}

impl<'c> Credentials<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Credentials { conn }
    }

    /// The matching user, or `None`. An unknown username and a wrong
    /// password are indistinguishable to the caller.
    pub fn authenticate(&self, username: &str, password: &str) -> StoreResult<Option<User>> {
        let sql = format!("{} WHERE username = ?1 AND password_hash = ?2", SELECT_USERS);
        let user = self
            .conn
            .query_row(&sql, params![username, hash_password(password)], map_user)
            .optional()?;

        match &user {
            Some(user) => tracing::info!(username = %user.username, role = %user.role, "login succeeded"),
            None => tracing::warn!(username, "login rejected"),
        }
        Ok(user)
    }

    /// Like [`authenticate`](Self::authenticate) but a mismatch is
    /// [`StoreError::AuthFailure`].
    pub fn verify(&self, username: &str, password: &str) -> StoreResult<User> {
        self.authenticate(username, password)?.ok_or(StoreError::AuthFailure)
    }
}

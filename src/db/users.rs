use crate::db::credentials::hash_password;
use crate::libs::error::{StoreError, StoreResult};
use crate::libs::user::{NewUser, Role, User, UserUpdate};
use chrono::Local;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(crate) const SELECT_USERS: &str = "SELECT id, username, email, role, created_at FROM users";

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

pub(crate) fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// User repository.
///
/// At least one administrator always remains: deleting or demoting the last
/// one fails with [`StoreError::LastAdmin`].
pub struct Users<'c> {
    conn: &'c Connection,
}

impl<'c> Users<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Users { conn }
    }

    /// Users ordered by username, optionally narrowed to those whose
    /// username or email contains `filter`.
    pub fn list(&self, filter: Option<&str>) -> StoreResult<Vec<User>> {
        let mut sql = SELECT_USERS.to_string();
        let pattern = filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| format!("%{}%", escape_like(&f.to_lowercase())));

        if pattern.is_some() {
            sql.push_str(" WHERE LOWER(username) LIKE ?1 ESCAPE '\\' OR LOWER(email) LIKE ?1 ESCAPE '\\'");
        }
        sql.push_str(" ORDER BY username");

        let mut stmt = self.conn.prepare(&sql)?;
        let users = match &pattern {
            Some(pattern) => stmt.query_map(params![pattern], map_user)?.collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], map_user)?.collect::<Result<Vec<_>, _>>()?,
        };
        Ok(users)
    }

    pub fn get(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("{} WHERE id = ?1", SELECT_USERS);
        Ok(self.conn.query_row(&sql, params![id], map_user).optional()?)
    }

    pub fn get_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("{} WHERE username = ?1", SELECT_USERS);
        Ok(self.conn.query_row(&sql, params![username], map_user).optional()?)
    }

    pub fn count_admins(&self) -> StoreResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM users WHERE role = ?1", params![Role::Admin], |row| row.get(0))?;
        Ok(count)
    }

    pub fn create(&self, user: &NewUser) -> StoreResult<i64> {
        user.validate()?;
        if self.get_by_username(&user.username)?.is_some() {
            return Err(StoreError::UsernameTaken(user.username.clone()));
        }

        self.conn
            .execute(
                "INSERT INTO users (username, email, password_hash, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.username,
                    user.email,
                    hash_password(&user.password),
                    user.role,
                    Local::now().naive_local()
                ],
            )
            .map_err(|e| unique_username(e.into(), &user.username))?;

        let id = self.conn.last_insert_rowid();
        tracing::info!(id, username = %user.username, role = %user.role, "user created");
        Ok(id)
    }

    /// Replaces username, email and role; the password hash changes only
    /// when `update.password` is set.
    pub fn update(&self, id: i64, update: &UserUpdate) -> StoreResult<()> {
        update.validate()?;
        let current = self.get(id)?.ok_or_else(|| StoreError::not_found("User", id))?;

        if current.is_admin() && update.role != Role::Admin && self.count_admins()? <= 1 {
            return Err(StoreError::LastAdmin);
        }
        if let Some(other) = self.get_by_username(&update.username)? {
            if other.id != id {
                return Err(StoreError::UsernameTaken(update.username.clone()));
            }
        }

        let result = match &update.password {
            Some(password) => self.conn.execute(
                "UPDATE users SET username = ?2, email = ?3, role = ?4, password_hash = ?5 WHERE id = ?1",
                params![id, update.username, update.email, update.role, hash_password(password)],
            ),
            None => self.conn.execute(
                "UPDATE users SET username = ?2, email = ?3, role = ?4 WHERE id = ?1",
                params![id, update.username, update.email, update.role],
            ),
        };
        result.map_err(|e| unique_username(e.into(), &update.username))?;

        tracing::info!(id, username = %update.username, password_changed = update.password.is_some(), "user updated");
        Ok(())
    }

    /// Returns whether a row was removed.
    pub fn delete(&self, id: i64) -> StoreResult<bool> {
        let Some(user) = self.get(id)? else {
            return Ok(false);
        };
        if user.is_admin() && self.count_admins()? <= 1 {
            return Err(StoreError::LastAdmin);
        }

        let removed = self.conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        tracing::info!(id, username = %user.username, "user deleted");
        Ok(removed > 0)
    }
}

/// Maps a UNIQUE violation, e.g. from a concurrent insert, to `UsernameTaken`.
fn unique_username(err: StoreError, username: &str) -> StoreError {
    if err.is_constraint_violation() {
        StoreError::UsernameTaken(username.to_string())
    } else {
        err
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

//! Versioned schema management.
//!
//! Applied versions are recorded in a `migrations` table. On start every
//! pending step runs inside one transaction: either the database reaches the
//! latest version or it is left exactly as it was.
//!
//! The first two steps also adopt databases created before versioning
//! existed. They inspect the live table with `PRAGMA table_info` and, when
//! the layout is an older one, rebuild the table in the current layout while
//! carrying every row across.
//!
//! ```rust,no_run
//! use empenhos::db::migrations::{get_db_version, MigrationManager};
//! use rusqlite::Connection;
//!
//! let mut conn = Connection::open("empenhos.db")?;
//! MigrationManager::new().run_migrations(&mut conn)?;
//! let (current, latest) = get_db_version(&conn)?;
//! # Ok::<(), empenhos::libs::error::StoreError>(())
//! ```

use crate::libs::error::{StoreError, StoreResult};
use crate::libs::formatter::format_date;
use crate::libs::messages::Message;
use crate::{msg_debug, msg_error, msg_info, msg_success};
use chrono::{Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::HashSet;

const MIGRATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

const SCHEMA_USERS: &str = "
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'user')),
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

// Dates stay in their DD/MM/YYYY display form.
const SCHEMA_EMPENHOS: &str = "
CREATE TABLE empenhos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_date TEXT NOT NULL,
    number INTEGER NOT NULL,
    company TEXT NOT NULL,
    sector TEXT NOT NULL,
    note_number TEXT NOT NULL,
    note_date TEXT NOT NULL,
    value REAL NOT NULL,
    exit_date TEXT NOT NULL,
    notes TEXT,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

/// Placeholders for rows carried over from the single-table prototype,
/// which only knew a number, a description and a value.
const PROTOTYPE_COMPANY: &str = "Empresa Anterior";
const PROTOTYPE_SECTOR: &str = "ADMINISTRAÇÃO";
const PROTOTYPE_NOTE_NUMBER: &str = "N/A";

#[derive(Debug, Clone)]
struct Migration {
    version: u32,
    name: &'static str,
    up: fn(&Transaction) -> StoreResult<()>,
}

/// One applied step as recorded in the `migrations` table.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMigration {
    pub version: u32,
    pub name: String,
    pub applied_at: String,
}

pub struct MigrationManager {
    migrations: Vec<Migration>,
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationManager {
    pub fn new() -> Self {
        let mut manager = Self { migrations: Vec::new() };
        manager.register_migrations();
        manager
    }

    fn register_migrations(&mut self) {
        self.add_migration(1, "users_table", migrate_users);
        self.add_migration(2, "empenhos_table", migrate_empenhos);
        self.add_migration(3, "search_indices", |tx| {
            tx.execute("CREATE INDEX IF NOT EXISTS idx_empenhos_number ON empenhos(number)", [])?;
            tx.execute("CREATE INDEX IF NOT EXISTS idx_empenhos_company ON empenhos(company)", [])?;
            tx.execute("CREATE INDEX IF NOT EXISTS idx_users_role ON users(role)", [])?;
            Ok(())
        });
    }

    fn add_migration(&mut self, version: u32, name: &'static str, up: fn(&Transaction) -> StoreResult<()>) {
        self.migrations.push(Migration { version, name, up });
    }

    pub fn latest_version(&self) -> u32 {
        self.migrations.iter().map(|m| m.version).max().unwrap_or(0)
    }

    /// Applies every pending step in a single transaction.
    ///
    /// A failing step aborts the whole run; the transaction is dropped
    /// uncommitted and the database keeps its previous version.
    pub fn run_migrations(&self, conn: &mut Connection) -> StoreResult<()> {
        let tx = conn.transaction()?;
        tx.execute(MIGRATIONS_TABLE, [])?;

        let current_version = current_version(&tx)?;
        let pending: Vec<&Migration> = self.migrations.iter().filter(|m| m.version > current_version).collect();

        if pending.is_empty() {
            msg_debug!(Message::DatabaseUpToDate);
            return Ok(());
        }

        msg_info!(Message::MigrationsFound(pending.len()));

        for migration in pending {
            msg_debug!(Message::RunningMigration(migration.version, migration.name.to_string()));

            if let Err(e) = (migration.up)(&tx) {
                msg_error!(Message::MigrationFailed(migration.version, e.to_string()));
                return Err(StoreError::Migration {
                    version: migration.version,
                    message: e.to_string(),
                });
            }

            tx.execute(
                "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
                params![migration.version, migration.name],
            )?;
            msg_debug!(Message::MigrationCompleted(migration.version));
        }

        tx.commit()?;
        msg_success!(Message::AllMigrationsCompleted);

        Ok(())
    }

    pub fn get_current_version(&self, conn: &Connection) -> StoreResult<u32> {
        current_version(conn)
    }

    pub fn is_migration_applied(&self, conn: &Connection, version: u32) -> StoreResult<bool> {
        if !table_exists(conn, "migrations")? {
            return Ok(false);
        }
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM migrations WHERE version = ?1", params![version], |row| row.get(0))?;
        Ok(count > 0)
    }

    pub fn get_migration_history(&self, conn: &Connection) -> StoreResult<Vec<AppliedMigration>> {
        if !table_exists(conn, "migrations")? {
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare("SELECT version, name, CAST(applied_at AS TEXT) FROM migrations ORDER BY version")?;
        let history = stmt
            .query_map([], |row| {
                Ok(AppliedMigration {
                    version: row.get(0)?,
                    name: row.get(1)?,
                    applied_at: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(history)
    }
}

/// Returns `(current, latest)` schema versions.
pub fn get_db_version(conn: &Connection) -> StoreResult<(u32, u32)> {
    let manager = MigrationManager::new();
    Ok((manager.get_current_version(conn)?, manager.latest_version()))
}

/// Number of steps the next start would apply.
pub fn needs_migration(conn: &Connection) -> StoreResult<usize> {
    let manager = MigrationManager::new();
    let current = manager.get_current_version(conn)?;
    Ok(manager.migrations.iter().filter(|m| m.version > current).count())
}

fn current_version(conn: &Connection) -> StoreResult<u32> {
    if !table_exists(conn, "migrations")? {
        return Ok(0);
    }
    let version: Option<u32> = conn.query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Column names of `table`, empty when the table does not exist.
fn table_columns(conn: &Connection, table: &str) -> StoreResult<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(columns)
}

fn has_all(columns: &HashSet<String>, wanted: &[&str]) -> bool {
    wanted.iter().all(|c| columns.contains(*c))
}

/// Picks the first present column, or the SQL fallback expression.
fn column_or<'a>(columns: &HashSet<String>, candidates: &[&'a str], fallback: &'a str) -> &'a str {
    candidates
        .iter()
        .copied()
        .find(|c| columns.contains(*c))
        .unwrap_or(fallback)
}

/// Moves the live table aside, recreates it and copies rows with `select`.
fn rebuild_table(tx: &Transaction, table: &str, schema: &str, insert: &str, select: &str) -> StoreResult<usize> {
    let legacy = format!("{}_legacy", table);
    tx.execute(&format!("ALTER TABLE {} RENAME TO {}", table, legacy), [])?;
    tx.execute(schema, [])?;
    let copied = tx.execute(&format!("INSERT INTO {} {} {} FROM {}", table, insert, select, legacy), [])?;
    tx.execute(&format!("DROP TABLE {}", legacy), [])?;

    msg_info!(Message::LegacyTableRebuilt(table.to_string(), copied));
    Ok(copied)
}

/// Creates `users`, or rebuilds an older layout that stored the hash in
/// `password` and the role in `user_type`, and may lack `email`.
fn migrate_users(tx: &Transaction) -> StoreResult<()> {
    let columns = table_columns(tx, "users")?;
    if columns.is_empty() {
        tx.execute(SCHEMA_USERS, [])?;
        return Ok(());
    }
    if has_all(&columns, &["id", "username", "email", "password_hash", "role", "created_at"]) {
        return Ok(());
    }
    if !columns.contains("username") {
        return Err(StoreError::Migration {
            version: 1,
            message: "users table has no username column".to_string(),
        });
    }

    let hash = column_or(&columns, &["password_hash", "password"], "");
    if hash.is_empty() {
        return Err(StoreError::Migration {
            version: 1,
            message: "users table has no password column".to_string(),
        });
    }
    let role = column_or(&columns, &["role", "user_type"], "NULL");
    let email = column_or(&columns, &["email"], "NULL");
    let created_at = column_or(&columns, &["created_at"], "NULL");

    let select = format!(
        "SELECT id, username, \
         COALESCE(NULLIF(TRIM({email}), ''), username || '@example.com'), \
         {hash}, \
         CASE WHEN LOWER({role}) IN ('admin', 'user') THEN LOWER({role}) ELSE 'user' END, \
         COALESCE({created_at}, CURRENT_TIMESTAMP)",
        email = email,
        hash = hash,
        role = role,
        created_at = created_at,
    );

    rebuild_table(
        tx,
        "users",
        SCHEMA_USERS,
        "(id, username, email, password_hash, role, created_at)",
        &select,
    )?;
    Ok(())
}

/// Creates `empenhos`, or adopts one of two older layouts: the
/// Portuguese-named columns of the first release, or the prototype's
/// `(id, numero, descricao, valor)` table.
fn migrate_empenhos(tx: &Transaction) -> StoreResult<()> {
    let columns = table_columns(tx, "empenhos")?;
    if columns.is_empty() {
        tx.execute(SCHEMA_EMPENHOS, [])?;
        return Ok(());
    }
    if has_all(&columns, &["entry_date", "number", "company", "sector", "note_number", "value"]) {
        return Ok(());
    }

    let insert = "(id, entry_date, number, company, sector, note_number, note_date, value, exit_date, notes, created_at, updated_at)";

    if has_all(&columns, &["data_entrada", "numero", "empresa", "setor", "numero_nota", "data_nota", "valor", "data_saida"]) {
        let notes = column_or(&columns, &["observacao"], "NULL");
        let created_at = column_or(&columns, &["created_at"], "NULL");
        let updated_at = column_or(&columns, &["updated_at"], "NULL");
        let select = format!(
            "SELECT id, data_entrada, CAST(numero AS INTEGER), empresa, setor, numero_nota, data_nota, valor, data_saida, \
             {notes}, COALESCE({created_at}, CURRENT_TIMESTAMP), COALESCE({updated_at}, {created_at}, CURRENT_TIMESTAMP)",
            notes = notes,
            created_at = created_at,
            updated_at = updated_at,
        );
        rebuild_table(tx, "empenhos", SCHEMA_EMPENHOS, insert, &select)?;
        normalize_legacy_dates(tx)?;
        return Ok(());
    }

    if has_all(&columns, &["numero", "valor"]) {
        let today = format_date(&Local::now().date_naive());
        let notes = column_or(&columns, &["descricao"], "NULL");
        // Literals only: the values are constants or a formatted date.
        let select = format!(
            "SELECT id, '{today}', CAST(numero AS INTEGER), '{company}', '{sector}', '{note}', '{today}', valor, '{today}', \
             {notes}, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP",
            today = today,
            company = PROTOTYPE_COMPANY,
            sector = PROTOTYPE_SECTOR,
            note = PROTOTYPE_NOTE_NUMBER,
            notes = notes,
        );
        rebuild_table(tx, "empenhos", SCHEMA_EMPENHOS, insert, &select)?;
        return Ok(());
    }

    Err(StoreError::Migration {
        version: 2,
        message: format!("unrecognized empenhos layout: {:?}", sorted(&columns)),
    })
}

/// Rewrites the copied date columns as `DD/MM/YYYY`.
///
/// The first release stored whatever was typed into the form. Dates that
/// cannot be read at all fail the step, naming the row and column.
fn normalize_legacy_dates(tx: &Transaction) -> StoreResult<()> {
    let mut stmt = tx.prepare("SELECT id, CAST(entry_date AS TEXT), CAST(note_date AS TEXT), CAST(exit_date AS TEXT) FROM empenhos")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                [
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ],
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut rewritten = 0;
    for (id, dates) in rows {
        let mut canonical = Vec::with_capacity(dates.len());
        for (column, text) in ["data_entrada", "data_nota", "data_saida"].iter().zip(&dates) {
            let text = text.as_deref().unwrap_or_default();
            let date = parse_legacy_date(text).ok_or_else(|| StoreError::Migration {
                version: 2,
                message: format!("empenho {}: unreadable {} '{}', expected DD/MM/YYYY", id, column, text),
            })?;
            canonical.push(format_date(&date));
        }

        let unchanged = dates.iter().zip(&canonical).all(|(old, new)| old.as_deref() == Some(new.as_str()));
        if !unchanged {
            tx.execute(
                "UPDATE empenhos SET entry_date = ?2, note_date = ?3, exit_date = ?4 WHERE id = ?1",
                params![id, canonical[0], canonical[1], canonical[2]],
            )?;
            rewritten += 1;
        }
    }

    if rewritten > 0 {
        msg_info!(Message::LegacyDatesNormalized(rewritten));
    }
    Ok(())
}

/// Reads a date the way people typed them before input was checked:
/// `1/3/2024`, `01-03-2024`, `01.03.24` or ISO `2024-03-01`.
/// Two-digit years are taken as 20YY.
fn parse_legacy_date(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.trim().split(['/', '-', '.']).collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };
    if ![a, b, c].iter().all(|p| !p.is_empty() && p.chars().all(|ch| ch.is_ascii_digit())) {
        return None;
    }

    let (year, month, day) = if a.len() == 4 {
        (a.parse::<i32>().ok()?, b.parse::<u32>().ok()?, c.parse::<u32>().ok()?)
    } else {
        let year = match c.len() {
            2 => 2000 + c.parse::<i32>().ok()?,
            4 => c.parse::<i32>().ok()?,
            _ => return None,
        };
        (year, b.parse::<u32>().ok()?, a.parse::<u32>().ok()?)
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn sorted(columns: &HashSet<String>) -> Vec<&str> {
    let mut names: Vec<&str> = columns.iter().map(String::as_str).collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_latest_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        let manager = MigrationManager::new();

        assert_eq!(manager.get_current_version(&conn).unwrap(), 0);
        manager.run_migrations(&mut conn).unwrap();
        assert_eq!(manager.get_current_version(&conn).unwrap(), manager.latest_version());
        assert!(manager.is_migration_applied(&conn, 2).unwrap());
        assert_eq!(needs_migration(&conn).unwrap(), 0);
    }

    #[test]
    fn column_or_prefers_the_first_present_column() {
        let columns: HashSet<String> = ["password", "user_type"].iter().map(|s| s.to_string()).collect();
        assert_eq!(column_or(&columns, &["password_hash", "password"], ""), "password");
        assert_eq!(column_or(&columns, &["email"], "NULL"), "NULL");
    }

    #[test]
    fn legacy_dates_are_read_leniently() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1);
        for text in ["01/03/2024", "1/3/2024", " 01-03-2024 ", "01.03.24", "2024-03-01"] {
            assert_eq!(parse_legacy_date(text), expected, "{}", text);
        }
        for text in ["", "ontem", "31/02/2024", "01/03", "2024/03/01/02", "1/3/024", "01/0x/2024"] {
            assert_eq!(parse_legacy_date(text), None, "{}", text);
        }
    }

    #[test]
    fn unknown_empenhos_layout_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE empenhos (id INTEGER PRIMARY KEY, whatever TEXT)", []).unwrap();

        let err = MigrationManager::new().run_migrations(&mut conn).unwrap_err();
        assert!(matches!(err, StoreError::Migration { version: 2, .. }));
        // Nothing from the aborted run survives, not even step 1.
        assert!(!table_exists(&conn, "users").unwrap());
        assert_eq!(current_version(&conn).unwrap(), 0);
    }
}

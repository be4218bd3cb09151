use crate::libs::empenho::{Empenho, EmpenhoDraft, EmpenhoFilter};
use crate::libs::error::{StoreError, StoreResult};
use crate::libs::formatter::{format_date, parse_date};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const SELECT_EMPENHOS: &str = "SELECT id, entry_date, number, company, sector, note_number, note_date, value, exit_date, notes, created_at, updated_at FROM empenhos";
// Dates are stored as DD/MM/YYYY, so ordering rebuilds YYYYMMDD from the text.
const ORDER_BY_ENTRY_DATE: &str = "ORDER BY substr(entry_date, 7, 4) || substr(entry_date, 4, 2) || substr(entry_date, 1, 2) DESC, id ASC";
const INSERT_EMPENHO: &str = "INSERT INTO empenhos (entry_date, number, company, sector, note_number, note_date, value, exit_date, notes, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)";
const UPDATE_EMPENHO: &str = "UPDATE empenhos SET entry_date = ?2, number = ?3, company = ?4, sector = ?5, note_number = ?6, note_date = ?7, value = ?8, exit_date = ?9, notes = ?10, updated_at = ?11 WHERE id = ?1";
const DELETE_EMPENHO: &str = "DELETE FROM empenhos WHERE id = ?1";

/// A calendar date in its stored `DD/MM/YYYY` form.
struct StoredDate(NaiveDate);

impl ToSql for StoredDate {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(format_date(&self.0)))
    }
}

impl FromSql for StoredDate {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        parse_date(text)
            .map(StoredDate)
            .ok_or_else(|| FromSqlError::Other(format!("invalid date '{}'", text).into()))
    }
}

/// Empenho repository bound to a connection or scope transaction.
pub struct Empenhos<'c> {
    conn: &'c Connection,
}

impl<'c> Empenhos<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Empenhos { conn }
    }

    /// Newest entry date first; ties keep insertion order.
    ///
    /// With `filter`, only records whose number, company or sector contains
    /// it (ignoring case) are returned. A blank filter lists everything.
    pub fn list(&self, filter: Option<&str>) -> StoreResult<Vec<Empenho>> {
        let all = self.query(&format!("{} {}", SELECT_EMPENHOS, ORDER_BY_ENTRY_DATE), [])?;

        match filter.map(str::trim).filter(|f| !f.is_empty()) {
            None => Ok(all),
            Some(needle) => {
                // Matched here rather than with LIKE: SQLite only folds ASCII
                // case and sector codes carry accents.
                let needle = needle.to_lowercase();
                Ok(all.into_iter().filter(|e| e.matches_search(&needle)).collect())
            }
        }
    }

    /// Records with any of `ids`, in listing order. Unknown ids are skipped.
    pub fn list_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Empenho>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("{} WHERE id IN ({}) {}", SELECT_EMPENHOS, placeholders, ORDER_BY_ENTRY_DATE);
        self.query(&sql, params_from_iter(ids.iter()))
    }

    pub fn fetch(&self, filter: &EmpenhoFilter) -> StoreResult<Vec<Empenho>> {
        match filter {
            EmpenhoFilter::All => self.list(None),
            EmpenhoFilter::Search(text) => self.list(Some(text)),
            EmpenhoFilter::ByIds(ids) => self.list_by_ids(ids),
        }
    }

    pub fn get(&self, id: i64) -> StoreResult<Option<Empenho>> {
        let sql = format!("{} WHERE id = ?1", SELECT_EMPENHOS);
        let empenho = self.conn.query_row(&sql, params![id], map_empenho).optional()?;
        Ok(empenho)
    }

    /// Inserts a validated record and returns its id.
    pub fn create(&self, draft: &EmpenhoDraft) -> StoreResult<i64> {
        draft.validate()?;
        let now = Local::now().naive_local();

        self.conn.execute(
            INSERT_EMPENHO,
            params![
                StoredDate(draft.entry_date),
                draft.number,
                draft.company,
                draft.sector.code(),
                draft.note_number,
                StoredDate(draft.note_date),
                draft.value,
                StoredDate(draft.exit_date),
                draft.notes,
                now,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, number = draft.number, "empenho created");
        Ok(id)
    }

    /// Replaces every mutable field of `id`. `created_at` is kept and
    /// `updated_at` always moves forward.
    pub fn update(&self, id: i64, draft: &EmpenhoDraft) -> StoreResult<()> {
        draft.validate()?;
        let previous = self.get(id)?.ok_or_else(|| StoreError::not_found("Empenho", id))?;
        let updated_at = next_timestamp(previous.updated_at);

        self.conn.execute(
            UPDATE_EMPENHO,
            params![
                id,
                StoredDate(draft.entry_date),
                draft.number,
                draft.company,
                draft.sector.code(),
                draft.note_number,
                StoredDate(draft.note_date),
                draft.value,
                StoredDate(draft.exit_date),
                draft.notes,
                updated_at,
            ],
        )?;

        tracing::debug!(id, "empenho updated");
        Ok(())
    }

    /// Returns whether a row was removed; deleting a missing id is not an error.
    pub fn delete(&self, id: i64) -> StoreResult<bool> {
        let removed = self.conn.execute(DELETE_EMPENHO, params![id])?;
        Ok(removed > 0)
    }

    fn query<P: rusqlite::Params>(&self, sql: &str, params: P) -> StoreResult<Vec<Empenho>> {
        let mut stmt = self.conn.prepare(sql)?;
        let empenhos = stmt.query_map(params, map_empenho)?.collect::<Result<Vec<_>, _>>()?;
        Ok(empenhos)
    }
}

/// Clock reading strictly after `previous`, even when the clock has not
/// advanced since the last write.
fn next_timestamp(previous: NaiveDateTime) -> NaiveDateTime {
    let now = Local::now().naive_local();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

fn map_empenho(row: &Row<'_>) -> rusqlite::Result<Empenho> {
    Ok(Empenho {
        id: row.get(0)?,
        entry_date: row.get::<_, StoredDate>(1)?.0,
        number: row.get(2)?,
        company: row.get(3)?,
        sector: row.get(4)?,
        note_number: row.get(5)?,
        note_date: row.get::<_, StoredDate>(6)?.0,
        value: row.get(7)?,
        exit_date: row.get::<_, StoredDate>(8)?.0,
        notes: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_timestamp_never_repeats() {
        let future = Local::now().naive_local() + Duration::hours(1);
        assert!(next_timestamp(future) > future);

        let past = Local::now().naive_local() - Duration::hours(1);
        assert!(next_timestamp(past) > past);
    }
}

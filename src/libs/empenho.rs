//! Empenho (commitment order) domain types.
//!
//! Three shapes of the same record:
//!
//! - [`EmpenhoForm`]: raw text as typed by a user.
//! - [`EmpenhoDraft`]: typed, validated mutable fields; what create/update take.
//! - [`Empenho`]: a stored record with its id and timestamps.

use crate::libs::config::MAX_NOTES_LENGTH;
use crate::libs::error::{StoreError, StoreResult};
use crate::libs::formatter::{parse_currency, parse_date};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Organizational units an empenho can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sector {
    Semad,
    Semada,
    Semas,
    Semed,
    Licitacao,
    Gabinete,
    Pgm,
    Semel,
    Semob,
    Seplage,
    Semma,
    Semutran,
    Sehab,
    Semics,
    Sinfras,
    Guarda,
    Sefin,
    Secult,
    SubApeu,
    SubJader,
}

impl Sector {
    pub const ALL: [Sector; 20] = [
        Sector::Semad,
        Sector::Semada,
        Sector::Semas,
        Sector::Semed,
        Sector::Licitacao,
        Sector::Gabinete,
        Sector::Pgm,
        Sector::Semel,
        Sector::Semob,
        Sector::Seplage,
        Sector::Semma,
        Sector::Semutran,
        Sector::Sehab,
        Sector::Semics,
        Sector::Sinfras,
        Sector::Guarda,
        Sector::Sefin,
        Sector::Secult,
        Sector::SubApeu,
        Sector::SubJader,
    ];

    /// The code as stored and displayed.
    pub const fn code(self) -> &'static str {
        match self {
            Sector::Semad => "SEMAD",
            Sector::Semada => "SEMADA",
            Sector::Semas => "SEMAS",
            Sector::Semed => "SEMED",
            Sector::Licitacao => "LICITAÇÃO",
            Sector::Gabinete => "GABINETE",
            Sector::Pgm => "PGM",
            Sector::Semel => "SEMEL",
            Sector::Semob => "SEMOB",
            Sector::Seplage => "SEPLAGE",
            Sector::Semma => "SEMMA",
            Sector::Semutran => "SEMUTRAN",
            Sector::Sehab => "SEHAB",
            Sector::Semics => "SEMICS",
            Sector::Sinfras => "SINFRAS",
            Sector::Guarda => "GUARDA",
            Sector::Sefin => "SEFIN",
            Sector::Secult => "SECULT",
            Sector::SubApeu => "SUB-APEU",
            Sector::SubJader => "SUB-JADER",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Sector {
    type Err = StoreError;

    /// Case-insensitive; `LICITACAO` (no accents) and a trailing dot
    /// (`SUB-JADER.`, as older entries were typed) are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_end_matches('.').to_uppercase();
        if wanted == "LICITACAO" {
            return Ok(Sector::Licitacao);
        }
        Sector::ALL
            .into_iter()
            .find(|sector| sector.code() == wanted)
            .ok_or_else(|| StoreError::validation("sector", format!("unknown sector '{}'", s.trim())))
    }
}

/// Mutable fields of an empenho.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpenhoDraft {
    pub entry_date: NaiveDate,
    pub number: i64,
    pub company: String,
    pub sector: Sector,
    pub note_number: String,
    pub note_date: NaiveDate,
    pub value: f64,
    pub exit_date: NaiveDate,
    pub notes: Option<String>,
}

impl EmpenhoDraft {
    /// Checks the invariants every stored empenho must satisfy.
    pub fn validate(&self) -> StoreResult<()> {
        if self.company.trim().is_empty() {
            return Err(StoreError::validation("company", "is required"));
        }
        if self.note_number.trim().is_empty() {
            return Err(StoreError::validation("note_number", "is required"));
        }
        if !self.value.is_finite() || self.value <= 0.0 {
            return Err(StoreError::validation("value", "must be greater than zero"));
        }
        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_LENGTH {
                return Err(StoreError::validation(
                    "notes",
                    format!("must be at most {} characters", MAX_NOTES_LENGTH),
                ));
            }
        }
        Ok(())
    }
}

/// Entry form contents, all as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmpenhoForm {
    pub entry_date: String,
    pub number: String,
    pub company: String,
    pub sector: String,
    pub note_number: String,
    pub note_date: String,
    pub value: String,
    pub exit_date: String,
    pub notes: String,
}

impl EmpenhoForm {
    /// Parses and validates the form, failing on the first bad field.
    pub fn parse(&self) -> StoreResult<EmpenhoDraft> {
        let entry_date = required_date("entry_date", &self.entry_date)?;

        let number = required("number", &self.number)?;
        let number = number
            .parse::<i64>()
            .map_err(|_| StoreError::validation("number", "must contain only digits"))?;

        let company = required("company", &self.company)?.to_string();
        let sector = required("sector", &self.sector)?.parse::<Sector>()?;
        let note_number = required("note_number", &self.note_number)?.to_string();
        let note_date = required_date("note_date", &self.note_date)?;

        let value = required("value", &self.value)?;
        let value = parse_currency(value).ok_or_else(|| StoreError::validation("value", "is not a valid amount"))?;

        let exit_date = required_date("exit_date", &self.exit_date)?;
        let notes = Some(self.notes.trim().to_string()).filter(|n| !n.is_empty());

        let draft = EmpenhoDraft {
            entry_date,
            number,
            company,
            sector,
            note_number,
            note_date,
            value,
            exit_date,
            notes,
        };
        draft.validate()?;
        Ok(draft)
    }
}

impl From<&Empenho> for EmpenhoForm {
    fn from(empenho: &Empenho) -> Self {
        use crate::libs::formatter::{format_currency, format_date};

        EmpenhoForm {
            entry_date: format_date(&empenho.entry_date),
            number: empenho.number.to_string(),
            company: empenho.company.clone(),
            sector: empenho.sector.clone(),
            note_number: empenho.note_number.clone(),
            note_date: format_date(&empenho.note_date),
            value: format_currency(empenho.value),
            exit_date: format_date(&empenho.exit_date),
            notes: empenho.notes.clone().unwrap_or_default(),
        }
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> StoreResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::validation(field, "is required"));
    }
    Ok(value)
}

fn required_date(field: &'static str, value: &str) -> StoreResult<NaiveDate> {
    let value = required(field, value)?;
    parse_date(value).ok_or_else(|| StoreError::validation(field, "must be a date in DD/MM/YYYY format"))
}

/// A stored empenho.
///
/// `sector` keeps the stored text: rows written before sectors were
/// validated may hold codes outside [`Sector::ALL`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Empenho {
    pub id: i64,
    pub entry_date: NaiveDate,
    pub number: i64,
    pub company: String,
    pub sector: String,
    pub note_number: String,
    pub note_date: NaiveDate,
    pub value: f64,
    pub exit_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Empenho {
    /// True when the stored fields equal `draft`.
    pub fn matches(&self, draft: &EmpenhoDraft) -> bool {
        self.entry_date == draft.entry_date
            && self.number == draft.number
            && self.company == draft.company
            && self.sector == draft.sector.code()
            && self.note_number == draft.note_number
            && self.note_date == draft.note_date
            && self.value == draft.value
            && self.exit_date == draft.exit_date
            && self.notes == draft.notes
    }

    /// Whether number, company or sector contains `needle`, which must
    /// already be lowercase.
    pub fn matches_search(&self, needle: &str) -> bool {
        self.number.to_string().contains(needle)
            || self.company.to_lowercase().contains(needle)
            || self.sector.to_lowercase().contains(needle)
    }
}

/// Selection used by listing and export.
#[derive(Debug, Clone, PartialEq)]
pub enum EmpenhoFilter {
    All,
    Search(String),
    ByIds(Vec<i64>),
}

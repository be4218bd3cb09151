use super::empenho::Empenho;
use super::export::ExportFile;
use super::formatter::{format_currency, format_date, format_timestamp};
use super::user::User;
use crate::db::migrations::AppliedMigration;
use prettytable::{row, Table};

pub struct View {}

impl View {
    pub fn empenhos(empenhos: &[Empenho]) {
        let mut table = Table::new();

        table.add_row(row!["ID", "ENTRY", "NUMBER", "COMPANY", "SECTOR", "NOTE", "NOTE DATE", "VALUE", "EXIT"]);
        for e in empenhos {
            table.add_row(row![
                e.id,
                format_date(&e.entry_date),
                e.number,
                e.company,
                e.sector,
                e.note_number,
                format_date(&e.note_date),
                r->format_currency(e.value),
                format_date(&e.exit_date)
            ]);
        }
        table.printstd();
    }

    /// Field-per-row view of a single record.
    pub fn empenho(e: &Empenho) {
        let mut table = Table::new();

        table.add_row(row!["ID", e.id]);
        table.add_row(row!["Entry date", format_date(&e.entry_date)]);
        table.add_row(row!["Number", e.number]);
        table.add_row(row!["Company", e.company]);
        table.add_row(row!["Sector", e.sector]);
        table.add_row(row!["Note number", e.note_number]);
        table.add_row(row!["Note date", format_date(&e.note_date)]);
        table.add_row(row!["Value", format_currency(e.value)]);
        table.add_row(row!["Exit date", format_date(&e.exit_date)]);
        table.add_row(row!["Notes", e.notes.as_deref().unwrap_or("")]);
        table.add_row(row!["Created", format_timestamp(&e.created_at)]);
        table.add_row(row!["Updated", format_timestamp(&e.updated_at)]);
        table.printstd();
    }

    pub fn users(users: &[User]) {
        let mut table = Table::new();

        table.add_row(row!["ID", "USERNAME", "EMAIL", "ROLE", "CREATED"]);
        for user in users {
            table.add_row(row![user.id, user.username, user.email, user.role, format_timestamp(&user.created_at)]);
        }
        table.printstd();
    }

    pub fn files(files: &[ExportFile]) {
        let mut table = Table::new();

        table.add_row(row!["NAME", "SIZE", "MODIFIED"]);
        for file in files {
            let modified = file.modified.as_ref().map(format_timestamp).unwrap_or_default();
            table.add_row(row![file.name, r->format!("{} B", file.size), modified]);
        }
        table.printstd();
    }

    pub fn migrations(history: &[AppliedMigration]) {
        let mut table = Table::new();

        table.add_row(row!["VERSION", "NAME", "APPLIED AT"]);
        for m in history {
            table.add_row(row![m.version, m.name, m.applied_at]);
        }
        table.printstd();
    }
}

//! Display implementation for application messages.
//!
//! All user-facing text is defined here, in one place, so commands and the
//! persistence layer only deal with structured `Message` values.

use super::types::Message;
use std::fmt;

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            // === SCHEMA / MIGRATION MESSAGES ===
            Message::MigrationsFound(count) => format!("Found {} pending migration(s)", count),
            Message::RunningMigration(version, name) => format!("Running migration v{}: {}", version, name),
            Message::MigrationCompleted(version) => format!("Migration v{} completed", version),
            Message::MigrationFailed(version, error) => format!("Migration v{} failed: {}", version, error),
            Message::AllMigrationsCompleted => "All migrations completed successfully".to_string(),
            Message::DatabaseUpToDate => "Database is up to date".to_string(),
            Message::LegacyTableRebuilt(table, rows) => {
                format!("Legacy table '{}' rebuilt with the current schema ({} row(s) preserved)", table, rows)
            }
            Message::LegacyDatesNormalized(rows) => format!("Rewrote legacy dates as DD/MM/YYYY in {} row(s)", rows),
            Message::DefaultAdminCreated(username) => format!("Default administrator '{}' created", username),
            Message::DefaultAdminExists(username) => format!("Default administrator '{}' already exists", username),
            Message::DefaultAdminPromoted(username) => {
                format!("No administrator left after migration; '{}' promoted to admin", username)
            }
            Message::ShippedAdminPassword(var) => {
                format!("Default administrator created with the built-in password; set {} and change it", var)
            }
            Message::DatabaseVersion(current, latest) => format!("Database schema version: {} (latest: {})", current, latest),
            Message::DatabaseNeedsMigration(count) => format!("{} migration(s) pending", count),
            Message::MigrationHistoryHeader => "Migration history:".to_string(),
            Message::NoMigrationsApplied => "No migrations have been applied yet".to_string(),
            Message::SchemaInitFailed(error) => format!("Failed to initialize the database: {}", error),
            Message::ScopeRolledBack(error) => format!("Changes rolled back: {}", error),

            // === EMPENHO MESSAGES ===
            Message::EmpenhoCreated(id) => format!("Empenho #{} created", id),
            Message::EmpenhoUpdated(id) => format!("Empenho #{} updated", id),
            Message::EmpenhoDeleted(id) => format!("Empenho #{} deleted", id),
            Message::EmpenhoNotFound(id) => format!("Empenho #{} not found", id),
            Message::EmpenhosHeader => "Empenhos:".to_string(),
            Message::NoEmpenhosFound => "No empenhos found".to_string(),
            Message::EmpenhoDetails(id) => format!("Empenho #{}", id),
            Message::ConfirmDeleteEmpenho(id) => format!("Delete empenho #{}? This cannot be undone", id),

            // === USER MESSAGES ===
            Message::UserCreated(username) => format!("User '{}' created", username),
            Message::UserUpdated(username) => format!("User '{}' updated", username),
            Message::UserDeleted(username) => format!("User '{}' deleted", username),
            Message::UserNotFound(id) => format!("User #{} not found", id),
            Message::UsersHeader => "Users:".to_string(),
            Message::NoUsersFound => "No users found".to_string(),
            Message::ConfirmDeleteUser(username) => format!("Delete user '{}'?", username),
            Message::UsernameExists(username) => format!("Username '{}' already exists", username),
            Message::LastAdminProtected => "The last administrator cannot be removed or demoted".to_string(),
            Message::AdminRequired => "This command requires an administrator account".to_string(),

            // === AUTHENTICATION MESSAGES ===
            Message::LoginSucceeded(username, role) => format!("Logged in as '{}' ({})", username, role),
            Message::InvalidCredentials => "Invalid username or password".to_string(),
            Message::PasswordsDoNotMatch => "Passwords do not match".to_string(),

            // === EXPORT MESSAGES ===
            Message::ExportingData(rows, format) => format!("Exporting {} empenho(s) as {}...", rows, format),
            Message::ExportCompleted(path) => format!("Export completed: {}", path),
            Message::NoEmpenhosToExport => "Nothing to export".to_string(),
            Message::ExportFilesHeader(dir) => format!("Exported files in {}:", dir),
            Message::NoExportFiles => "No exported files".to_string(),
            Message::ExportFileDeleted(name) => format!("File '{}' deleted", name),
            Message::ExportFileNotFound(name) => format!("File '{}' not found", name),
            Message::ExportPathRejected(name) => format!("'{}' is outside the export directory", name),
            Message::ConfirmDeleteFile(name) => format!("Delete file '{}'?", name),
            Message::InvalidIdList(input) => format!("Invalid id list: '{}'", input),

            // === CONFIGURATION MESSAGES ===
            Message::ConfigSaved => "Configuration saved".to_string(),

            // === PROMPTS ===
            Message::PromptUsername => "Username".to_string(),
            Message::PromptPassword => "Password".to_string(),
            Message::PromptPasswordConfirm => "Confirm password".to_string(),
            Message::PromptNewPassword => "New password (leave empty to keep the current one)".to_string(),
            Message::PromptEmail => "Email".to_string(),
            Message::PromptRole => "Role".to_string(),
            Message::PromptEntryDate => "Entry date (DD/MM/YYYY)".to_string(),
            Message::PromptNumber => "Empenho number".to_string(),
            Message::PromptCompany => "Company".to_string(),
            Message::PromptSector => "Sector".to_string(),
            Message::PromptNoteNumber => "Invoice number".to_string(),
            Message::PromptNoteDate => "Invoice date (DD/MM/YYYY)".to_string(),
            Message::PromptValue => "Value (R$)".to_string(),
            Message::PromptExitDate => "Exit date (DD/MM/YYYY)".to_string(),
            Message::PromptNotes => "Notes".to_string(),
            Message::PromptDatabasePath => "Database file (empty for default)".to_string(),
            Message::PromptExportDir => "Export directory (empty for default)".to_string(),
            Message::PromptLogLevel => "Log level".to_string(),
            Message::PromptLogFile => "Log file (empty to log to the console only)".to_string(),
            Message::PromptBootstrapUsername => "Default administrator username".to_string(),
            Message::PromptBootstrapEmail => "Default administrator email".to_string(),

            // === GENERAL ===
            Message::OperationCancelled => "Operation cancelled".to_string(),
            Message::ValidationFailed(error) => format!("Invalid input: {}", error),
        };
        write!(f, "{}", text)
    }
}

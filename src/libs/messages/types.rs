#[derive(Debug, Clone)]
pub enum Message {
    // === SCHEMA / MIGRATION MESSAGES ===
    MigrationsFound(usize),
    RunningMigration(u32, String),
    MigrationCompleted(u32),
    MigrationFailed(u32, String),
    AllMigrationsCompleted,
    DatabaseUpToDate,
    LegacyTableRebuilt(String, usize), // table, rows preserved
    LegacyDatesNormalized(usize),
    DefaultAdminCreated(String),
    DefaultAdminExists(String),
    DefaultAdminPromoted(String),
    ShippedAdminPassword(String), // env variable
    DatabaseVersion(u32, u32), // current, latest
    DatabaseNeedsMigration(usize),
    MigrationHistoryHeader,
    NoMigrationsApplied,
    SchemaInitFailed(String),
    ScopeRolledBack(String),

    // === EMPENHO MESSAGES ===
    EmpenhoCreated(i64),
    EmpenhoUpdated(i64),
    EmpenhoDeleted(i64),
    EmpenhoNotFound(i64),
    EmpenhosHeader,
    NoEmpenhosFound,
    EmpenhoDetails(i64),
    ConfirmDeleteEmpenho(i64),

    // === USER MESSAGES ===
    UserCreated(String),
    UserUpdated(String),
    UserDeleted(String),
    UserNotFound(i64),
    UsersHeader,
    NoUsersFound,
    ConfirmDeleteUser(String),
    UsernameExists(String),
    LastAdminProtected,
    AdminRequired,

    // === AUTHENTICATION MESSAGES ===
    LoginSucceeded(String, String), // username, role
    InvalidCredentials,
    PasswordsDoNotMatch,

    // === EXPORT MESSAGES ===
    ExportingData(usize, String), // rows, format
    ExportCompleted(String),
    NoEmpenhosToExport,
    ExportFilesHeader(String),
    NoExportFiles,
    ExportFileDeleted(String),
    ExportFileNotFound(String),
    ExportPathRejected(String),
    ConfirmDeleteFile(String),
    InvalidIdList(String),

    // === CONFIGURATION MESSAGES ===
    ConfigSaved,

    // === PROMPTS ===
    PromptUsername,
    PromptPassword,
    PromptPasswordConfirm,
    PromptNewPassword,
    PromptEmail,
    PromptRole,
    PromptEntryDate,
    PromptNumber,
    PromptCompany,
    PromptSector,
    PromptNoteNumber,
    PromptNoteDate,
    PromptValue,
    PromptExitDate,
    PromptNotes,
    PromptDatabasePath,
    PromptExportDir,
    PromptLogLevel,
    PromptLogFile,
    PromptBootstrapUsername,
    PromptBootstrapEmail,

    // === GENERAL ===
    OperationCancelled,
    ValidationFailed(String),
}

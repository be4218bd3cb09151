pub mod empenho;
pub mod export;
pub mod files;
pub mod init;
pub mod login;
pub mod migrations;
pub mod user;

use crate::db::credentials::Credentials;
use crate::db::db::Db;
use crate::db::schema::ensure_schema;
use crate::libs::config::Config;
use crate::libs::data_storage::DataStorage;
use crate::libs::error::StoreError;
use crate::libs::messages::Message;
use crate::libs::user::User;
use crate::{msg_bail_anyhow, msg_error_anyhow};
use anyhow::Result;
use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Input, Password};
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Configuration initialization")]
    Init(init::InitArgs),
    #[command(about = "Check a username and password")]
    Login,
    #[command(about = "Manage empenhos", arg_required_else_help = true)]
    Empenho(empenho::EmpenhoArgs),
    #[command(about = "Manage users (administrators only)", arg_required_else_help = true)]
    User(user::UserArgs),
    #[command(about = "Export empenhos to CSV, JSON, Excel or a PDF protocol")]
    Export(export::ExportArgs),
    #[command(about = "Manage exported files", arg_required_else_help = true)]
    Files(files::FilesArgs),
    #[command(about = "Show the database schema version", arg_required_else_help = true)]
    Migrations(migrations::MigrationsArgs),
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Who may run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No login: setup, the login check itself and schema inspection.
    Open,
    /// Any registered account.
    User,
    Admin,
}

impl Commands {
    fn access(&self) -> Access {
        match self {
            Commands::Init(_) | Commands::Login | Commands::Migrations(_) => Access::Open,
            Commands::Empenho(_) | Commands::Export(_) | Commands::Files(_) => Access::User,
            Commands::User(_) => Access::Admin,
        }
    }
}

impl Cli {
    pub fn menu(config: Config) -> Result<()> {
        let command = match Self::parse().command {
            Commands::Init(args) => return init::cmd(args),
            command => command,
        };

        let ctx = AppContext::open(config)?;
        let session = match command.access() {
            Access::Open => None,
            access => Some(authorize(prompt_login(&ctx)?, access)?),
        };

        match command {
            Commands::Init(_) => Ok(()),
            Commands::Login => login::cmd(&ctx),
            Commands::Migrations(args) => migrations::cmd(&ctx, args),
            Commands::Empenho(args) => empenho::cmd(&ctx, args),
            Commands::Export(args) => export::cmd(&ctx, args),
            Commands::Files(args) => files::cmd(&ctx, args),
            Commands::User(args) => match session {
                Some(admin) => user::cmd(&ctx, &admin, args),
                None => msg_bail_anyhow!(Message::AdminRequired),
            },
        }
    }
}

/// What every command past `init` works with: the loaded configuration and
/// a database already at the latest schema.
pub struct AppContext {
    pub config: Config,
    pub storage: DataStorage,
    pub db: Db,
}

impl AppContext {
    pub fn open(config: Config) -> Result<Self> {
        Self::open_in(config, DataStorage::new())
    }

    pub fn open_in(config: Config, storage: DataStorage) -> Result<Self> {
        let db = Db::new(&config.database, &storage)?;
        ensure_schema(&db, &config.bootstrap)
            .map_err(|e| msg_error_anyhow!(Message::SchemaInitFailed(e.to_string())))?;
        Ok(AppContext { config, storage, db })
    }

    pub fn export_dir(&self) -> Result<PathBuf> {
        Ok(self.config.export.resolve_dir(&self.storage)?)
    }
}

/// Prompts for a username and password and checks them.
pub(crate) fn prompt_login(ctx: &AppContext) -> Result<User> {
    let theme = ColorfulTheme::default();
    let username: String = Input::with_theme(&theme)
        .with_prompt(Message::PromptUsername.to_string())
        .interact_text()?;
    let password = Password::with_theme(&theme)
        .with_prompt(Message::PromptPassword.to_string())
        .interact()?;

    match ctx.db.scope(|tx| Credentials::new(tx).verify(username.trim(), &password)) {
        Ok(user) => Ok(user),
        Err(StoreError::AuthFailure) => msg_bail_anyhow!(Message::InvalidCredentials),
        Err(e) => Err(e.into()),
    }
}

/// Lets `user` through when its role satisfies `access`.
pub(crate) fn authorize(user: User, access: Access) -> Result<User> {
    if access == Access::Admin && !user.is_admin() {
        msg_bail_anyhow!(Message::AdminRequired);
    }
    Ok(user)
}

/// Turns repository errors a user can act on into their message; anything
/// else propagates unchanged.
pub(crate) fn describe(err: StoreError) -> anyhow::Error {
    let message = match &err {
        StoreError::Validation { .. } => Message::ValidationFailed(err.to_string()),
        StoreError::UsernameTaken(name) => Message::UsernameExists(name.clone()),
        StoreError::LastAdmin => Message::LastAdminProtected,
        StoreError::AuthFailure => Message::InvalidCredentials,
        _ => return err.into(),
    };
    msg_error_anyhow!(message)
}

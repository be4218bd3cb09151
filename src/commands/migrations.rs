use super::AppContext;
use crate::{
    db::migrations::{get_db_version, needs_migration, MigrationManager},
    libs::{messages::Message, view::View},
    msg_info, msg_print, msg_success, msg_warning,
};
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct MigrationsArgs {
    #[command(subcommand)]
    command: MigrationsCommand,
}

#[derive(Debug, Subcommand)]
enum MigrationsCommand {
    /// Current and latest schema version
    Status,
    /// Applied migrations
    History,
}

pub fn cmd(ctx: &AppContext, args: MigrationsArgs) -> Result<()> {
    let conn = ctx.db.connect()?;

    match args.command {
        MigrationsCommand::Status => {
            let (current, latest) = get_db_version(&conn)?;
            msg_info!(Message::DatabaseVersion(current, latest));

            match needs_migration(&conn)? {
                0 => msg_success!(Message::DatabaseUpToDate),
                pending => msg_warning!(Message::DatabaseNeedsMigration(pending)),
            }
        }
        MigrationsCommand::History => {
            let history = MigrationManager::new().get_migration_history(&conn)?;
            if history.is_empty() {
                msg_info!(Message::NoMigrationsApplied);
                return Ok(());
            }
            msg_print!(Message::MigrationHistoryHeader, true);
            View::migrations(&history);
        }
    }
    Ok(())
}

use super::AppContext;
use crate::{
    libs::{error::StoreError, export::ExportFiles, messages::Message, view::View},
    msg_error, msg_info, msg_print, msg_success, msg_warning,
};
use anyhow::Result;
use clap::{Args, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm};

#[derive(Debug, Args)]
pub struct FilesArgs {
    #[command(subcommand)]
    command: FilesCommand,
}

#[derive(Debug, Subcommand)]
enum FilesCommand {
    List,
    Delete {
        name: String,
        #[arg(short, long)]
        yes: bool,
    },
}

pub fn cmd(ctx: &AppContext, args: FilesArgs) -> Result<()> {
    let dir = ctx.export_dir()?;
    let files = ExportFiles::new(dir.clone());

    match args.command {
        FilesCommand::List => {
            let list = files.list()?;
            if list.is_empty() {
                msg_info!(Message::NoExportFiles);
                return Ok(());
            }
            msg_print!(Message::ExportFilesHeader(dir.display().to_string()), true);
            View::files(&list);
        }
        FilesCommand::Delete { name, yes } => {
            if let Err(StoreError::Validation { .. }) = files.resolve(&name) {
                msg_error!(Message::ExportPathRejected(name));
                return Ok(());
            }

            if !yes
                && !Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt(Message::ConfirmDeleteFile(name.clone()).to_string())
                    .default(false)
                    .interact()?
            {
                msg_warning!(Message::OperationCancelled);
                return Ok(());
            }

            if files.delete(&name)? {
                msg_success!(Message::ExportFileDeleted(name));
            } else {
                msg_error!(Message::ExportFileNotFound(name));
            }
        }
    }
    Ok(())
}

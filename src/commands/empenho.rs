use super::{describe, AppContext};
use crate::{
    db::empenhos::Empenhos,
    libs::{
        empenho::{EmpenhoForm, Sector},
        error::StoreError,
        formatter::format_date,
        messages::Message,
        view::View,
    },
    msg_error, msg_info, msg_print, msg_success, msg_warning,
};
use anyhow::Result;
use chrono::Local;
use clap::{Args, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

#[derive(Debug, Args)]
pub struct EmpenhoArgs {
    #[command(subcommand)]
    command: EmpenhoCommand,
}

#[derive(Debug, Subcommand)]
enum EmpenhoCommand {
    /// Register a new empenho
    Add,
    /// List empenhos, newest entry date first
    List {
        /// Matches number, company or sector
        filter: Option<String>,
    },
    Show {
        id: i64,
    },
    Edit {
        id: i64,
    },
    Delete {
        id: i64,
        #[arg(short, long)]
        yes: bool,
    },
}

pub fn cmd(ctx: &AppContext, args: EmpenhoArgs) -> Result<()> {
    match args.command {
        EmpenhoCommand::Add => handle_add(ctx),
        EmpenhoCommand::List { filter } => handle_list(ctx, filter.as_deref()),
        EmpenhoCommand::Show { id } => handle_show(ctx, id),
        EmpenhoCommand::Edit { id } => handle_edit(ctx, id),
        EmpenhoCommand::Delete { id, yes } => handle_delete(ctx, id, yes),
    }
}

fn handle_add(ctx: &AppContext) -> Result<()> {
    let today = format_date(&Local::now().date_naive());
    let initial = EmpenhoForm {
        entry_date: today.clone(),
        note_date: today.clone(),
        exit_date: today,
        ..EmpenhoForm::default()
    };

    let draft = prompt_form(&initial)?.parse().map_err(describe)?;
    let id = ctx.db.scope(|tx| Empenhos::new(tx).create(&draft)).map_err(describe)?;

    msg_success!(Message::EmpenhoCreated(id));
    Ok(())
}

fn handle_list(ctx: &AppContext, filter: Option<&str>) -> Result<()> {
    let empenhos = ctx.db.scope(|tx| Empenhos::new(tx).list(filter))?;

    if empenhos.is_empty() {
        msg_info!(Message::NoEmpenhosFound);
        return Ok(());
    }

    msg_print!(Message::EmpenhosHeader, true);
    View::empenhos(&empenhos);
    Ok(())
}

fn handle_show(ctx: &AppContext, id: i64) -> Result<()> {
    match ctx.db.scope(|tx| Empenhos::new(tx).get(id))? {
        Some(empenho) => {
            msg_print!(Message::EmpenhoDetails(id), true);
            View::empenho(&empenho);
        }
        None => msg_error!(Message::EmpenhoNotFound(id)),
    }
    Ok(())
}

fn handle_edit(ctx: &AppContext, id: i64) -> Result<()> {
    let Some(current) = ctx.db.scope(|tx| Empenhos::new(tx).get(id))? else {
        msg_error!(Message::EmpenhoNotFound(id));
        return Ok(());
    };

    let draft = prompt_form(&EmpenhoForm::from(&current))?.parse().map_err(describe)?;
    match ctx.db.scope(|tx| Empenhos::new(tx).update(id, &draft)) {
        Ok(()) => msg_success!(Message::EmpenhoUpdated(id)),
        // Removed by someone else while the form was open.
        Err(StoreError::NotFound { .. }) => msg_error!(Message::EmpenhoNotFound(id)),
        Err(e) => return Err(describe(e)),
    }
    Ok(())
}

fn handle_delete(ctx: &AppContext, id: i64, yes: bool) -> Result<()> {
    if !yes
        && !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::ConfirmDeleteEmpenho(id).to_string())
            .default(false)
            .interact()?
    {
        msg_warning!(Message::OperationCancelled);
        return Ok(());
    }

    if ctx.db.scope(|tx| Empenhos::new(tx).delete(id))? {
        msg_success!(Message::EmpenhoDeleted(id));
    } else {
        msg_error!(Message::EmpenhoNotFound(id));
    }
    Ok(())
}

/// Asks for every field, seeded with `initial`.
fn prompt_form(initial: &EmpenhoForm) -> Result<EmpenhoForm> {
    let theme = ColorfulTheme::default();
    let text = |prompt: Message, default: &str, allow_empty: bool| -> Result<String> {
        let value = Input::<String>::with_theme(&theme)
            .with_prompt(prompt.to_string())
            .with_initial_text(default)
            .allow_empty(allow_empty)
            .interact_text()?;
        Ok(value)
    };

    let entry_date = text(Message::PromptEntryDate, &initial.entry_date, false)?;
    let number = text(Message::PromptNumber, &initial.number, false)?;
    let company = text(Message::PromptCompany, &initial.company, false)?;

    let codes: Vec<&str> = Sector::ALL.iter().map(|s| s.code()).collect();
    let selected = initial
        .sector
        .parse::<Sector>()
        .ok()
        .and_then(|s| Sector::ALL.iter().position(|x| *x == s))
        .unwrap_or(0);
    let sector = Select::with_theme(&theme)
        .with_prompt(Message::PromptSector.to_string())
        .items(&codes)
        .default(selected)
        .interact()?;

    let note_number = text(Message::PromptNoteNumber, &initial.note_number, false)?;
    let note_date = text(Message::PromptNoteDate, &initial.note_date, false)?;
    let value = text(Message::PromptValue, &initial.value, false)?;
    let exit_date = text(Message::PromptExitDate, &initial.exit_date, false)?;
    let notes = text(Message::PromptNotes, &initial.notes, true)?;

    Ok(EmpenhoForm {
        entry_date,
        number,
        company,
        sector: codes[sector].to_string(),
        note_number,
        note_date,
        value,
        exit_date,
        notes,
    })
}

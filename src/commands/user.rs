use super::{describe, AppContext};
use crate::{
    db::users::Users,
    libs::{
        messages::Message,
        user::{NewUser, Role, User, UserUpdate},
        view::View,
    },
    msg_bail_anyhow, msg_error, msg_info, msg_print, msg_success, msg_warning,
};
use anyhow::Result;
use clap::{Args, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};

const ROLES: [Role; 2] = [Role::User, Role::Admin];

#[derive(Debug, Args)]
pub struct UserArgs {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Debug, Subcommand)]
enum UserCommand {
    Add,
    List {
        /// Matches username or email
        filter: Option<String>,
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

/// `admin` is the account that passed the admin login gate.
pub fn cmd(ctx: &AppContext, admin: &User, args: UserArgs) -> Result<()> {
    match args.command {
        UserCommand::Add => handle_add(ctx),
        UserCommand::List { filter } => handle_list(ctx, filter.as_deref()),
        UserCommand::Edit { id } => handle_edit(ctx, id),
        UserCommand::Delete { id, yes } => handle_delete(ctx, admin, id, yes),
    }
}

fn handle_add(ctx: &AppContext) -> Result<()> {
    let theme = ColorfulTheme::default();
    let username: String = Input::with_theme(&theme)
        .with_prompt(Message::PromptUsername.to_string())
        .interact_text()?;
    let email: String = Input::with_theme(&theme)
        .with_prompt(Message::PromptEmail.to_string())
        .interact_text()?;
    let password = prompt_new_password(&theme, Message::PromptPassword)?;
    let role = prompt_role(&theme, Role::User)?;

    let new_user = NewUser::new(username.trim(), email.trim(), &password, role);
    ctx.db.scope(|tx| Users::new(tx).create(&new_user)).map_err(describe)?;

    msg_success!(Message::UserCreated(new_user.username));
    Ok(())
}

fn handle_list(ctx: &AppContext, filter: Option<&str>) -> Result<()> {
    let users = ctx.db.scope(|tx| Users::new(tx).list(filter))?;

    if users.is_empty() {
        msg_info!(Message::NoUsersFound);
        return Ok(());
    }

    msg_print!(Message::UsersHeader, true);
    View::users(&users);
    Ok(())
}

fn handle_edit(ctx: &AppContext, id: i64) -> Result<()> {
    let Some(user) = ctx.db.scope(|tx| Users::new(tx).get(id))? else {
        msg_error!(Message::UserNotFound(id));
        return Ok(());
    };

    let theme = ColorfulTheme::default();
    let current = UserUpdate::from(&user);
    let username: String = Input::with_theme(&theme)
        .with_prompt(Message::PromptUsername.to_string())
        .default(current.username)
        .interact_text()?;
    let email: String = Input::with_theme(&theme)
        .with_prompt(Message::PromptEmail.to_string())
        .default(current.email)
        .interact_text()?;
    let role = prompt_role(&theme, current.role)?;

    // Blank keeps the current password.
    let password = Password::with_theme(&theme)
        .with_prompt(Message::PromptNewPassword.to_string())
        .allow_empty_password(true)
        .interact()?;
    let password = if password.is_empty() {
        None
    } else {
        confirm_password(&theme, &password)?;
        Some(password)
    };

    let update = UserUpdate {
        username: username.trim().to_string(),
        email: email.trim().to_string(),
        password,
        role,
    };
    ctx.db.scope(|tx| Users::new(tx).update(id, &update)).map_err(describe)?;

    msg_success!(Message::UserUpdated(update.username));
    Ok(())
}

fn handle_delete(ctx: &AppContext, admin: &User, id: i64, yes: bool) -> Result<()> {
    let Some(user) = ctx.db.scope(|tx| Users::new(tx).get(id))? else {
        msg_error!(Message::UserNotFound(id));
        return Ok(());
    };

    if !yes
        && !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::ConfirmDeleteUser(user.username.clone()).to_string())
            .default(false)
            .interact()?
    {
        msg_warning!(Message::OperationCancelled);
        return Ok(());
    }

    if ctx.db.scope(|tx| Users::new(tx).delete(id)).map_err(describe)? {
        tracing::info!(by = %admin.username, id, "user removed");
        msg_success!(Message::UserDeleted(user.username));
    } else {
        msg_error!(Message::UserNotFound(id));
    }
    Ok(())
}

fn prompt_role(theme: &ColorfulTheme, current: Role) -> Result<Role> {
    let index = ROLES.iter().position(|r| *r == current).unwrap_or(0);
    let selected = Select::with_theme(theme)
        .with_prompt(Message::PromptRole.to_string())
        .items(&ROLES)
        .default(index)
        .interact()?;
    Ok(ROLES[selected])
}

fn prompt_new_password(theme: &ColorfulTheme, prompt: Message) -> Result<String> {
    let password = Password::with_theme(theme).with_prompt(prompt.to_string()).interact()?;
    confirm_password(theme, &password)?;
    Ok(password)
}

fn confirm_password(theme: &ColorfulTheme, password: &str) -> Result<()> {
    let confirmation = Password::with_theme(theme)
        .with_prompt(Message::PromptPasswordConfirm.to_string())
        .allow_empty_password(true)
        .interact()?;
    if confirmation != password {
        msg_bail_anyhow!(Message::PasswordsDoNotMatch);
    }
    Ok(())
}

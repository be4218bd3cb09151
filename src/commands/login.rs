use super::{prompt_login, AppContext};
use crate::{libs::messages::Message, msg_success};
use anyhow::Result;

pub fn cmd(ctx: &AppContext) -> Result<()> {
    let user = prompt_login(ctx)?;
    msg_success!(Message::LoginSucceeded(user.username, user.role.to_string()));
    Ok(())
}

use crate::db::db::Db;
use crate::db::migrations::MigrationManager;
use crate::db::users::Users;
use crate::libs::config::{BootstrapConfig, PasswordSource, ADMIN_PASSWORD_ENV};
use crate::libs::error::StoreResult;
use crate::libs::messages::Message;
use crate::libs::user::{NewUser, Role, UserUpdate};
use crate::{msg_debug, msg_info, msg_warning};

/// Brings the database to the latest schema and makes sure the bootstrap
/// administrator exists. Safe to call on every start.
///
/// A legacy users table can arrive without any administrator. The bootstrap
/// account is then promoted so user management stays reachable.
///
/// Returns whether the administrator was created by this call.
pub fn ensure_schema(db: &Db, bootstrap: &BootstrapConfig) -> StoreResult<bool> {
    {
        let mut conn = db.connect()?;
        MigrationManager::new().run_migrations(&mut conn)?;
    }

    db.scope(|tx| {
        let users = Users::new(tx);
        if let Some(existing) = users.get_by_username(&bootstrap.username)? {
            if !existing.is_admin() && users.count_admins()? == 0 {
                let promoted = UserUpdate {
                    role: Role::Admin,
                    ..UserUpdate::from(&existing)
                };
                users.update(existing.id, &promoted)?;
                msg_warning!(Message::DefaultAdminPromoted(existing.username));
            } else {
                msg_debug!(Message::DefaultAdminExists(bootstrap.username.clone()));
            }
            return Ok(false);
        }

        let admin = NewUser {
            username: bootstrap.username.clone(),
            email: bootstrap.email.clone(),
            password: bootstrap.resolve_password(),
            role: Role::Admin,
        };
        users.create(&admin)?;
        msg_info!(Message::DefaultAdminCreated(bootstrap.username.clone()));
        if bootstrap.password_source() == PasswordSource::Shipped {
            msg_warning!(Message::ShippedAdminPassword(ADMIN_PASSWORD_ENV.to_string()));
        }
        Ok(true)
    })
}

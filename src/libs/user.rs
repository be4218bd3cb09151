use crate::libs::error::{StoreError, StoreResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(StoreError::validation("role", format!("unknown role '{}'", other))),
        }
    }
}

/// A stored user. The password hash never leaves the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl NewUser {
    pub fn new(username: &str, email: &str, password: &str, role: Role) -> Self {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
        }
    }

    pub fn validate(&self) -> StoreResult<()> {
        validate_identity(&self.username, &self.email)?;
        if self.password.is_empty() {
            return Err(StoreError::validation("password", "is required"));
        }
        Ok(())
    }
}

/// Full replacement of a user's fields; `password: None` keeps the current hash.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    pub password: Option<String>,
    pub role: Role,
}

impl UserUpdate {
    pub fn validate(&self) -> StoreResult<()> {
        validate_identity(&self.username, &self.email)?;
        if matches!(&self.password, Some(p) if p.is_empty()) {
            return Err(StoreError::validation("password", "must not be empty"));
        }
        Ok(())
    }
}

impl From<&User> for UserUpdate {
    fn from(user: &User) -> Self {
        UserUpdate {
            username: user.username.clone(),
            email: user.email.clone(),
            password: None,
            role: user.role,
        }
    }
}

fn validate_identity(username: &str, email: &str) -> StoreResult<()> {
    if username.trim().is_empty() {
        return Err(StoreError::validation("username", "is required"));
    }
    if email.trim().is_empty() {
        return Err(StoreError::validation("email", "is required"));
    }
    Ok(())
}

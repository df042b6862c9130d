use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::require_text;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    /// Anything other than "admin" is an ordinary member.
    pub fn from_db(value: &str) -> Self {
        if value.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::Member
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub level: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(input: NewUser, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: input.username,
            email: input.email,
            password_hash,
            level: input.level,
            role: input.role,
            created_at: Utc::now(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            level: self.level.clone(),
        }
    }
}

/// Public projection: nothing sensitive leaves through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub level: String,
}

/// Account data for a new user. The password arrives separately, already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub level: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub password: Option<String>,
    pub level: Option<String>,
}

impl ProfileChanges {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.password.is_none() && self.level.is_none() {
            return Err(AppError::ValidationError(
                "Nothing to update: provide 'password' and/or 'level'".to_string(),
            ));
        }
        if let Some(password) = &self.password {
            require_text("password", password)?;
        }
        if let Some(level) = &self.level {
            require_text("level", level)?;
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};

use crate::entity::user::{self, Role};
use crate::model::form::FormErrors;

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,      // user id
    pub username: String,
    pub role: String,     // "staff" | "regular"
    pub exp: usize,
    pub iat: usize,
}

/// The authenticated account attached to each request by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

impl SessionUser {
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }
}

impl TryFrom<Claims> for SessionUser {
    type Error = ();

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            id: claims.sub.parse().map_err(|_| ())?,
            role: Role::parse(&claims.role).ok_or(())?,
            username: claims.username,
        })
    }
}

impl From<&user::Model> for SessionUser {
    fn from(model: &user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username.clone(),
            role: model.role,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

impl RegisterForm {
    /// Field checks that need no database access; username uniqueness is
    /// checked by the handler.
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        let username = self.username.trim();

        if username.is_empty() {
            errors.add("username", "This field is required.");
        } else if username.chars().count() > 150 {
            errors.add("username", "Ensure this value has at most 150 characters.");
        } else if !username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            errors.add("username", "Enter a valid username: letters, digits and @/./+/-/_ only.");
        }

        let email = self.email.trim();
        if !email.is_empty() && !email.contains('@') {
            errors.add("email", "Enter a valid email address.");
        }

        if self.password1.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add("password1", "This password is too short. It must contain at least 8 characters.");
        }
        if self.password1 != self.password2 {
            errors.add("password2", "Passwords don't match");
        }

        errors
    }
}

/// Only same-site absolute paths are accepted as post-login redirects.
/// Browsers drop tabs and newlines from URLs, so any whitespace or control
/// character could hide a `//host` prefix and is rejected outright.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(|c| c.is_control() || c.is_whitespace()) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

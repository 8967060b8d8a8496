use serde::{Deserialize, Serialize};

use super::user::UserProfile;

/// Token handed back by OTP verification.
///
/// A `Temporary` token belongs to a new account that still has to complete
/// registration; a `Permanent` token belongs to a fully registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "token", rename_all = "snake_case")]
pub enum AuthToken {
    Permanent(String),
    Temporary(String),
}

impl AuthToken {
    pub fn as_str(&self) -> &str {
        match self {
            AuthToken::Permanent(token) | AuthToken::Temporary(token) => token,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, AuthToken::Temporary(_))
    }
}

/// Result of completing a registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub token: String,
    pub user: Option<UserProfile>,
}

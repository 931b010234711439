use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9.]+$").unwrap();
}

// =============================================================================
// REGISTER
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(
        length(min = 1, max = 64, message = "Username must be 1 to 64 characters"),
        regex(path = *USERNAME_RE, message = "Username can only contain letters, numbers and dots")
    )]
    pub username: String,
    #[validate(
        length(max = 255, message = "Email must be at most 255 characters"),
        email(message = "Invalid email format")
    )]
    pub email: String,
}

// =============================================================================
// MAGIC LINK
// =============================================================================

/// A freshly issued link. The boundary layer emails `magic_token` to `email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MagicLinkIssued {
    pub magic_token: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmResult {
    pub api_token: String,
    pub email: String,
    pub api_token_expires_at: DateTime<Utc>,
}

// =============================================================================
// AUTHENTICATED POSTER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthPoster {
    pub poster_id: i64,
    pub email: String,
    pub username: String,
}

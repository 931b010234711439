use crate::db::StoreError;
use crate::error::{Classify, ErrorClass};
use crate::services::deadline::DeadlineExceeded;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("User not found")]
    UserNotFound,

    #[error("Daily magic link limit reached")]
    RateLimitExceeded,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired or already used")]
    TokenExpiredOrUsed,

    #[error("Email not verified")]
    EmailNotVerified,

    #[error("Token expired")]
    TokenExpired,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Username already exists")]
    UsernameAlreadyExists,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Username can only contain letters, numbers and dots")]
    InvalidUsername,

    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl Classify for AuthError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::UserNotFound => ErrorClass::NotFound,
            Self::RateLimitExceeded => ErrorClass::RateLimited,
            Self::InvalidToken
            | Self::TokenExpiredOrUsed
            | Self::EmailNotVerified
            | Self::TokenExpired => ErrorClass::Unauthorized,
            Self::EmailAlreadyExists | Self::UsernameAlreadyExists => ErrorClass::Conflict,
            Self::InvalidEmail | Self::InvalidUsername => ErrorClass::Validation,
            Self::Timeout(_) => ErrorClass::Timeout,
            Self::Store(_) => ErrorClass::Internal,
        }
    }
}

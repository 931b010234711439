/// Coarse classification shared by every module error.
///
/// The boundary layer maps these onto its own status codes; callers inside
/// the crate match on the concrete variants instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Conflict,
    RateLimited,
    Unauthorized,
    Validation,
    Timeout,
    Internal,
}

impl ErrorClass {
    /// Message safe to show to end users. Internal details never leave the crate.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::Conflict => "already exists",
            Self::RateLimited => "too many requests",
            Self::Unauthorized => "invalid or expired api token",
            Self::Validation => "invalid request",
            Self::Timeout => "request timed out",
            Self::Internal => "internal server error",
        }
    }
}

pub trait Classify: std::error::Error {
    fn class(&self) -> ErrorClass;

    /// Logs the full error when it is about to be collapsed into an opaque response.
    fn log_if_internal(&self) {
        if self.class() == ErrorClass::Internal {
            tracing::error!(error = %self, "internal failure");
        }
    }
}

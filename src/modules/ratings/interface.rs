use crate::db::StoreError;
use crate::error::{Classify, ErrorClass};
use crate::services::deadline::DeadlineExceeded;

#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl Classify for RatingError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout(_) => ErrorClass::Timeout,
            Self::Store(_) => ErrorClass::Internal,
        }
    }
}

use crate::db::StoreError;
use crate::error::{Classify, ErrorClass};
use crate::services::deadline::DeadlineExceeded;

#[derive(Debug, thiserror::Error)]
pub enum BikeError {
    #[error("Numerical id must have 4 to 6 digits, got {0}")]
    InvalidNumericalId(i64),

    #[error("Hash id must be alphanumeric and at most 64 characters")]
    InvalidHashId,

    #[error("Bike {0} already exists")]
    NumericalIdTaken(i64),

    #[error("Hash id {0} already in use")]
    HashIdTaken(String),

    #[error("Bike {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl Classify for BikeError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidNumericalId(_) | Self::InvalidHashId => ErrorClass::Validation,
            Self::NumericalIdTaken(_) | Self::HashIdTaken(_) => ErrorClass::Conflict,
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::Timeout(_) => ErrorClass::Timeout,
            Self::Store(_) => ErrorClass::Internal,
        }
    }
}

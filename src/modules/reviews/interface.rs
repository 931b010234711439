use crate::db::StoreError;
use crate::error::{Classify, ErrorClass};
use crate::modules::ratings::model::RatingSubcategory;
use crate::services::deadline::DeadlineExceeded;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Review too frequent")]
    TooFrequentReview,

    #[error("Invalid score {score} for {subcategory}")]
    InvalidScore {
        subcategory: RatingSubcategory,
        score: i16,
    },

    #[error("Bike image link must be at most 1024 characters")]
    InvalidBikeImg,

    #[error("Review {0} not found")]
    NotFound(i64),

    #[error("Bike {0} not found")]
    BikeNotFound(i64),

    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl Classify for ReviewError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::TooFrequentReview => ErrorClass::RateLimited,
            Self::InvalidScore { .. } | Self::InvalidBikeImg => ErrorClass::Validation,
            Self::NotFound(_) | Self::BikeNotFound(_) => ErrorClass::NotFound,
            Self::Timeout(_) => ErrorClass::Timeout,
            Self::Store(_) => ErrorClass::Internal,
        }
    }
}

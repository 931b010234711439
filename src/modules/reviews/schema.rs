use serde::Deserialize;

use crate::modules::ratings::model::RatingScores;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewInput {
    #[serde(skip)]
    pub poster_id: i64,
    pub bike_id: i64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub bike_img: Option<String>,
    #[serde(flatten)]
    pub scores: RatingScores,
}

/// Fields left as `None` keep their stored values.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReviewInput {
    #[serde(skip)]
    pub review_id: i64,
    #[serde(skip)]
    pub poster_id: i64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub bike_img: Option<String>,
    #[serde(flatten)]
    pub scores: RatingScores,
}

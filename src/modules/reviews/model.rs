use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::modules::ratings::model::RatingSubcategory;

/// Minimum gap between two reviews of the same bike by the same poster.
pub const REVIEW_COOLDOWN: Duration = Duration::minutes(10);

/// Width of `reviews.bike_img`, in characters.
pub const MAX_BIKE_IMG_LEN: usize = 1024;

pub fn is_valid_bike_img(bike_img: &str) -> bool {
    bike_img.chars().count() <= MAX_BIKE_IMG_LEN
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub poster_id: i64,
    pub bike_numerical_id: i64,
    pub comment: Option<String>,
    pub bike_img: Option<String>,
}

/// Which reviews a joined read should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewScope {
    All,
    Bike(i64),
    Review(i64),
}

/// One row of `reviews ⟕ posters ⟕ review_ratings`.
///
/// Rating columns are empty for reviews without ratings; poster columns are
/// empty once the author has been deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    pub review_id: i64,
    pub poster_id: Option<i64>,
    pub username: Option<String>,
    pub bike_numerical_id: i64,
    pub comment: Option<String>,
    pub bike_img: Option<String>,
    pub created_at: DateTime<Utc>,
    pub subcategory: Option<RatingSubcategory>,
    pub score: Option<i16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewWithRatings {
    pub review_id: i64,
    pub poster_id: Option<i64>,
    pub poster_username: Option<String>,
    pub bike_numerical_id: i64,
    pub comment: Option<String>,
    pub bike_img: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ratings: BTreeMap<RatingSubcategory, i16>,
}

/// Groups joined rows by review, keeping the order in which reviews first appear.
pub fn fold_review_rows(rows: Vec<ReviewRow>) -> Vec<ReviewWithRatings> {
    let mut reviews: Vec<ReviewWithRatings> = Vec::new();

    for row in rows {
        let needs_new = reviews
            .last()
            .map_or(true, |last| last.review_id != row.review_id);

        if needs_new {
            reviews.push(ReviewWithRatings {
                review_id: row.review_id,
                poster_id: row.poster_id,
                poster_username: row.username,
                bike_numerical_id: row.bike_numerical_id,
                comment: row.comment,
                bike_img: row.bike_img,
                created_at: row.created_at,
                ratings: BTreeMap::new(),
            });
        }

        if let (Some(subcategory), Some(score), Some(review)) =
            (row.subcategory, row.score, reviews.last_mut())
        {
            review.ratings.insert(subcategory, score);
        }
    }

    reviews
}

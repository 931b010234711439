use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::modules::ratings::model::RatingAggregate;
use crate::modules::reviews::model::ReviewWithRatings;

pub const MIN_NUMERICAL_ID: i64 = 1000;
pub const MAX_NUMERICAL_ID: i64 = 999_999;
pub const MAX_HASH_ID_LEN: usize = 64;

lazy_static! {
    static ref HASH_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9]+$").unwrap();
}

pub fn is_valid_numerical_id(id: i64) -> bool {
    (MIN_NUMERICAL_ID..=MAX_NUMERICAL_ID).contains(&id)
}

pub fn is_valid_hash_id(hash_id: &str) -> bool {
    hash_id.len() <= MAX_HASH_ID_LEN && HASH_ID_RE.is_match(hash_id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bike {
    pub numerical_id: i64,
    pub hash_id: Option<String>,
    pub is_electric: bool,
    pub creator_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A bike together with its overall average, if it has been rated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BikeSummary {
    #[serde(flatten)]
    pub bike: Bike,
    pub average_rating: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BikeDetails {
    #[serde(flatten)]
    pub summary: BikeSummary,
    pub ratings: Vec<RatingAggregate>,
    pub reviews: Vec<ReviewWithRatings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBike {
    pub numerical_id: i64,
    pub hash_id: Option<String>,
    pub is_electric: bool,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BikeChanges {
    pub hash_id: Option<String>,
    pub is_electric: Option<bool>,
}

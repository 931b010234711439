//! Persistence port.
//!
//! The modules talk to storage only through [`Datastore`] and the transaction
//! handle it hands out, [`StoreTx`]. Two adapters implement the port:
//! [`mysql::MySqlStore`] for production and [`memory::MemoryStore`] for tests
//! and local runs.
//!
//! A `StoreTx` dropped without [`StoreTx::commit`] is rolled back.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::modules::auth::model::{MagicLink, NewPoster, Poster, PosterIdentifier};
use crate::modules::bikes::model::{BikeChanges, BikeSummary, NewBike};
use crate::modules::ratings::model::{RatingAggregate, RatingSubcategory, TimedScore};
use crate::modules::reviews::model::{NewReview, ReviewRow, ReviewScope};

/// Names of the keys and foreign keys the modules branch on.
pub mod constraints {
    pub const PRIMARY: &str = "PRIMARY";
    pub const POSTERS_EMAIL: &str = "uq_posters_email";
    pub const POSTERS_USERNAME: &str = "uq_posters_username";
    pub const POSTERS_API_TOKEN: &str = "uq_posters_api_token";
    pub const BIKES_HASH_ID: &str = "uq_bikes_hash_id";
    pub const MAGIC_LINKS_POSTER: &str = "fk_magic_links_poster";
    pub const BIKES_CREATOR: &str = "fk_bikes_creator";
    pub const REVIEWS_POSTER: &str = "fk_reviews_poster";
    pub const REVIEWS_BIKE: &str = "fk_reviews_bike";
    pub const REVIEW_RATINGS_REVIEW: &str = "fk_review_ratings_review";
    pub const RATING_AGGREGATES_BIKE: &str = "fk_rating_aggregates_bike";
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint {constraint} violated")]
    UniqueViolation { constraint: String },

    #[error("foreign key constraint {constraint} violated")]
    ForeignKeyViolation { constraint: String },

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_unique_violation(&self, name: &str) -> bool {
        matches!(self, Self::UniqueViolation { constraint } if constraint == name)
    }

    pub fn is_foreign_key_violation(&self, name: &str) -> bool {
        matches!(self, Self::ForeignKeyViolation { constraint } if constraint == name)
    }
}

/// Reads that run outside a transaction, plus the entry point for writes.
#[async_trait]
pub trait Datastore: Send + Sync {
    type Tx: StoreTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn find_poster_by_api_token(&self, api_token: &str) -> Result<Option<Poster>, StoreError>;
    async fn find_magic_link(&self, token: &str) -> Result<Option<MagicLink>, StoreError>;
    /// Stores the API token handed out when `magic_token` was confirmed.
    async fn record_issued_api_token(&self, magic_token: &str, api_token: &str) -> Result<(), StoreError>;

    async fn latest_review_at(&self, poster_id: i64, bike_id: i64) -> Result<Option<DateTime<Utc>>, StoreError>;
    /// Ordered by bike, review, subcategory.
    async fn list_review_rows(&self, scope: ReviewScope) -> Result<Vec<ReviewRow>, StoreError>;

    /// Ordered by bike, subcategory.
    async fn list_aggregates(&self, bike_id: Option<i64>) -> Result<Vec<RatingAggregate>, StoreError>;
    async fn list_timed_scores(&self, bike_id: i64) -> Result<Vec<TimedScore>, StoreError>;

    /// Ordered by numerical id.
    async fn list_bikes(&self) -> Result<Vec<BikeSummary>, StoreError>;
    async fn find_bike(&self, bike_id: i64) -> Result<Option<BikeSummary>, StoreError>;
}

/// An open transaction.
#[async_trait]
pub trait StoreTx: Send + Sized {
    async fn commit(self) -> Result<(), StoreError>;

    // posters
    async fn insert_poster(&mut self, poster: &NewPoster, now: DateTime<Utc>) -> Result<Poster, StoreError>;
    async fn find_poster(&mut self, identifier: &PosterIdentifier) -> Result<Option<Poster>, StoreError>;
    /// Reads the poster and holds its row lock until the transaction ends.
    async fn lock_poster(&mut self, poster_id: i64) -> Result<Option<Poster>, StoreError>;
    async fn set_api_token(
        &mut self,
        poster_id: i64,
        api_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    async fn mark_email_verified(&mut self, poster_id: i64) -> Result<(), StoreError>;
    async fn delete_poster(&mut self, poster_id: i64) -> Result<u64, StoreError>;

    // magic links
    async fn count_magic_links_since(&mut self, poster_id: i64, since: DateTime<Utc>) -> Result<i64, StoreError>;
    async fn insert_magic_link(&mut self, link: &MagicLink) -> Result<(), StoreError>;
    /// Reads the link and holds its row lock until the transaction ends.
    async fn lock_magic_link(&mut self, token: &str) -> Result<Option<MagicLink>, StoreError>;
    async fn mark_magic_link_consumed(&mut self, token: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
    async fn delete_magic_links_for_poster(&mut self, poster_id: i64) -> Result<u64, StoreError>;

    // bikes
    async fn insert_bike(
        &mut self,
        bike: &NewBike,
        creator_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    async fn update_bike(&mut self, bike_id: i64, changes: &BikeChanges, now: DateTime<Utc>) -> Result<u64, StoreError>;
    async fn delete_bike(&mut self, bike_id: i64) -> Result<u64, StoreError>;
    async fn bike_ids_created_by(&mut self, poster_id: i64) -> Result<Vec<i64>, StoreError>;
    async fn orphan_bikes(&mut self, poster_id: i64) -> Result<u64, StoreError>;

    // reviews
    async fn insert_review(&mut self, review: &NewReview, now: DateTime<Utc>) -> Result<i64, StoreError>;
    /// Bike of `review_id` if the review belongs to `poster_id`. Locks the review.
    async fn find_owned_review_bike(&mut self, review_id: i64, poster_id: i64) -> Result<Option<i64>, StoreError>;
    async fn update_review(
        &mut self,
        review_id: i64,
        comment: Option<&str>,
        bike_img: Option<&str>,
    ) -> Result<(), StoreError>;
    async fn delete_review(&mut self, review_id: i64) -> Result<u64, StoreError>;
    async fn delete_reviews_for_bike(&mut self, bike_id: i64) -> Result<u64, StoreError>;
    async fn bike_ids_reviewed_by(&mut self, poster_id: i64) -> Result<Vec<i64>, StoreError>;
    async fn delete_reviews_by_poster(&mut self, poster_id: i64) -> Result<u64, StoreError>;
    async fn orphan_reviews(&mut self, poster_id: i64) -> Result<u64, StoreError>;

    // ratings
    async fn insert_rating(
        &mut self,
        review_id: i64,
        subcategory: RatingSubcategory,
        score: i16,
    ) -> Result<(), StoreError>;
    async fn upsert_rating(
        &mut self,
        review_id: i64,
        subcategory: RatingSubcategory,
        score: i16,
    ) -> Result<(), StoreError>;
    async fn delete_ratings_for_review(&mut self, review_id: i64) -> Result<u64, StoreError>;
    async fn delete_ratings_for_bike(&mut self, bike_id: i64) -> Result<u64, StoreError>;
    async fn delete_ratings_by_poster(&mut self, poster_id: i64) -> Result<u64, StoreError>;
    /// Every committed score on reviews of the bike. The rows stay locked
    /// until the transaction ends, so the aggregates written from them cannot
    /// miss a concurrent review.
    async fn scores_for_bike(&mut self, bike_id: i64) -> Result<Vec<(RatingSubcategory, i16)>, StoreError>;

    // aggregates
    async fn delete_aggregates_for_bike(&mut self, bike_id: i64) -> Result<u64, StoreError>;
    async fn insert_aggregate(&mut self, aggregate: &RatingAggregate) -> Result<(), StoreError>;
}

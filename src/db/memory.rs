//! In-process datastore.
//!
//! Transactions are serializable: `begin` takes the store's lock and works on
//! a private copy of the state, `commit` writes the copy back, and dropping
//! the transaction discards it. Keys and foreign keys mirror the MySQL schema
//! and are reported under the same constraint names.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{constraints, Datastore, StoreError, StoreTx};
use crate::modules::auth::model::{MagicLink, NewPoster, Poster, PosterIdentifier};
use crate::modules::bikes::model::{Bike, BikeChanges, BikeSummary, NewBike};
use crate::modules::ratings::model::{RatingAggregate, RatingSubcategory, TimedScore};
use crate::modules::reviews::model::{NewReview, ReviewRow, ReviewScope};

#[derive(Debug, Clone)]
struct StoredReview {
    review_id: i64,
    poster_id: Option<i64>,
    bike_numerical_id: i64,
    comment: Option<String>,
    bike_img: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    posters: BTreeMap<i64, Poster>,
    last_poster_id: i64,
    magic_links: BTreeMap<String, MagicLink>,
    bikes: BTreeMap<i64, Bike>,
    reviews: BTreeMap<i64, StoredReview>,
    last_review_id: i64,
    ratings: BTreeMap<(i64, RatingSubcategory), i16>,
    aggregates: BTreeMap<(i64, RatingSubcategory), RatingAggregate>,
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

fn foreign_key(constraint: &str) -> StoreError {
    StoreError::ForeignKeyViolation {
        constraint: constraint.to_string(),
    }
}

impl MemoryState {
    fn summary(&self, bike: &Bike) -> BikeSummary {
        BikeSummary {
            bike: bike.clone(),
            average_rating: self
                .aggregates
                .get(&(bike.numerical_id, RatingSubcategory::Overall))
                .map(|agg| agg.average_rating),
        }
    }

    fn review_rows(&self, scope: ReviewScope) -> Vec<ReviewRow> {
        let mut reviews: Vec<&StoredReview> = self
            .reviews
            .values()
            .filter(|r| match scope {
                ReviewScope::All => true,
                ReviewScope::Bike(bike_id) => r.bike_numerical_id == bike_id,
                ReviewScope::Review(review_id) => r.review_id == review_id,
            })
            .collect();
        reviews.sort_by_key(|r| (r.bike_numerical_id, r.review_id));

        let mut rows = Vec::new();
        for review in reviews {
            let username = review
                .poster_id
                .and_then(|id| self.posters.get(&id))
                .map(|p| p.username.clone());
            let base = ReviewRow {
                review_id: review.review_id,
                poster_id: review.poster_id,
                username,
                bike_numerical_id: review.bike_numerical_id,
                comment: review.comment.clone(),
                bike_img: review.bike_img.clone(),
                created_at: review.created_at,
                subcategory: None,
                score: None,
            };

            let ratings: Vec<_> = self.ratings_of(review.review_id).collect();
            if ratings.is_empty() {
                rows.push(base);
                continue;
            }
            for (subcategory, score) in ratings {
                rows.push(ReviewRow {
                    subcategory: Some(subcategory),
                    score: Some(score),
                    ..base.clone()
                });
            }
        }
        rows
    }

    fn ratings_of(&self, review_id: i64) -> impl Iterator<Item = (RatingSubcategory, i16)> + '_ {
        self.ratings
            .range((review_id, RatingSubcategory::ALL[0])..=(review_id, RatingSubcategory::ALL[5]))
            .map(|(&(_, sub), &score)| (sub, score))
    }

    fn reviews_of_bike(&self, bike_id: i64) -> impl Iterator<Item = &StoredReview> + '_ {
        self.reviews
            .values()
            .filter(move |r| r.bike_numerical_id == bike_id)
    }

    fn timed_scores(&self, bike_id: i64) -> Vec<TimedScore> {
        let mut scores: Vec<TimedScore> = self
            .reviews_of_bike(bike_id)
            .flat_map(|review| {
                self.ratings_of(review.review_id).map(move |(subcategory, score)| TimedScore {
                    subcategory,
                    score,
                    created_at: review.created_at,
                })
            })
            .collect();
        scores.sort_by_key(|s| s.subcategory);
        scores
    }

    fn review_has_ratings(&self, review_id: i64) -> bool {
        self.ratings_of(review_id).next().is_some()
    }

    fn remove_reviews(&mut self, pick: impl Fn(&StoredReview) -> bool) -> Result<u64, StoreError> {
        let ids: Vec<i64> = self.reviews.values().filter(|r| pick(r)).map(|r| r.review_id).collect();
        if ids.iter().any(|&id| self.review_has_ratings(id)) {
            return Err(foreign_key(constraints::REVIEW_RATINGS_REVIEW));
        }
        for id in &ids {
            self.reviews.remove(id);
        }
        Ok(ids.len() as u64)
    }

    fn remove_ratings(&mut self, pick: impl Fn(&StoredReview) -> bool) -> u64 {
        let review_ids: Vec<i64> = self.reviews.values().filter(|r| pick(r)).map(|r| r.review_id).collect();
        let before = self.ratings.len();
        self.ratings.retain(|(review_id, _), _| !review_ids.contains(review_id));
        (before - self.ratings.len()) as u64
    }
}

/// Shared in-process store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    begin_latency: Option<Duration>,
    fail_issued_token_records: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every `begin` by `latency`, for exercising deadlines.
    pub fn with_begin_latency(mut self, latency: Duration) -> Self {
        self.begin_latency = Some(latency);
        self
    }

    /// Makes `record_issued_api_token` fail until switched off again.
    pub fn fail_issued_token_records(&self, fail: bool) {
        self.fail_issued_token_records.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        if let Some(latency) = self.begin_latency {
            tokio::time::sleep(latency).await;
        }
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx { guard, working })
    }

    async fn find_poster_by_api_token(&self, api_token: &str) -> Result<Option<Poster>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .posters
            .values()
            .find(|p| p.api_token.as_deref() == Some(api_token))
            .cloned())
    }

    async fn find_magic_link(&self, token: &str) -> Result<Option<MagicLink>, StoreError> {
        Ok(self.state.lock().await.magic_links.get(token).cloned())
    }

    async fn record_issued_api_token(&self, magic_token: &str, api_token: &str) -> Result<(), StoreError> {
        if self.fail_issued_token_records.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.state.lock().await;
        if let Some(link) = state.magic_links.get_mut(magic_token) {
            link.api_token = Some(api_token.to_string());
        }
        Ok(())
    }

    async fn latest_review_at(&self, poster_id: i64, bike_id: i64) -> Result<Option<DateTime<Utc>>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .reviews_of_bike(bike_id)
            .filter(|r| r.poster_id == Some(poster_id))
            .map(|r| r.created_at)
            .max())
    }

    async fn list_review_rows(&self, scope: ReviewScope) -> Result<Vec<ReviewRow>, StoreError> {
        Ok(self.state.lock().await.review_rows(scope))
    }

    async fn list_aggregates(&self, bike_id: Option<i64>) -> Result<Vec<RatingAggregate>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .aggregates
            .values()
            .filter(|agg| bike_id.map_or(true, |id| agg.bike_numerical_id == id))
            .cloned()
            .collect())
    }

    async fn list_timed_scores(&self, bike_id: i64) -> Result<Vec<TimedScore>, StoreError> {
        Ok(self.state.lock().await.timed_scores(bike_id))
    }

    async fn list_bikes(&self) -> Result<Vec<BikeSummary>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.bikes.values().map(|bike| state.summary(bike)).collect())
    }

    async fn find_bike(&self, bike_id: i64) -> Result<Option<BikeSummary>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.bikes.get(&bike_id).map(|bike| state.summary(bike)))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(self) -> Result<(), StoreError> {
        let MemoryTx { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn insert_poster(&mut self, poster: &NewPoster, now: DateTime<Utc>) -> Result<Poster, StoreError> {
        let state = &mut self.working;
        if state.posters.values().any(|p| p.email == poster.email) {
            return Err(unique(constraints::POSTERS_EMAIL));
        }
        if state.posters.values().any(|p| p.username == poster.username) {
            return Err(unique(constraints::POSTERS_USERNAME));
        }

        state.last_poster_id += 1;
        let created = Poster {
            poster_id: state.last_poster_id,
            email: poster.email.clone(),
            username: poster.username.clone(),
            api_token: None,
            api_token_expires_at: None,
            email_verified: false,
            created_at: now,
        };
        state.posters.insert(created.poster_id, created.clone());
        Ok(created)
    }

    async fn find_poster(&mut self, identifier: &PosterIdentifier) -> Result<Option<Poster>, StoreError> {
        Ok(self
            .working
            .posters
            .values()
            .find(|p| match identifier {
                PosterIdentifier::Email(email) => &p.email == email,
                PosterIdentifier::Username(username) => &p.username == username,
            })
            .cloned())
    }

    async fn lock_poster(&mut self, poster_id: i64) -> Result<Option<Poster>, StoreError> {
        Ok(self.working.posters.get(&poster_id).cloned())
    }

    async fn set_api_token(
        &mut self,
        poster_id: i64,
        api_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let taken = self
            .working
            .posters
            .values()
            .any(|p| p.poster_id != poster_id && p.api_token.as_deref() == Some(api_token));
        if taken {
            return Err(unique(constraints::POSTERS_API_TOKEN));
        }
        if let Some(poster) = self.working.posters.get_mut(&poster_id) {
            poster.api_token = Some(api_token.to_string());
            poster.api_token_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn mark_email_verified(&mut self, poster_id: i64) -> Result<(), StoreError> {
        if let Some(poster) = self.working.posters.get_mut(&poster_id) {
            poster.email_verified = true;
        }
        Ok(())
    }

    async fn delete_poster(&mut self, poster_id: i64) -> Result<u64, StoreError> {
        let state = &mut self.working;
        if state.magic_links.values().any(|l| l.poster_id == poster_id) {
            return Err(foreign_key(constraints::MAGIC_LINKS_POSTER));
        }
        if state.bikes.values().any(|b| b.creator_id == Some(poster_id)) {
            return Err(foreign_key(constraints::BIKES_CREATOR));
        }
        if state.reviews.values().any(|r| r.poster_id == Some(poster_id)) {
            return Err(foreign_key(constraints::REVIEWS_POSTER));
        }
        Ok(state.posters.remove(&poster_id).map_or(0, |_| 1))
    }

    async fn count_magic_links_since(&mut self, poster_id: i64, since: DateTime<Utc>) -> Result<i64, StoreError> {
        Ok(self
            .working
            .magic_links
            .values()
            .filter(|l| l.poster_id == poster_id && l.created_at > since)
            .count() as i64)
    }

    async fn insert_magic_link(&mut self, link: &MagicLink) -> Result<(), StoreError> {
        let state = &mut self.working;
        if state.magic_links.contains_key(&link.token) {
            return Err(unique(constraints::PRIMARY));
        }
        if !state.posters.contains_key(&link.poster_id) {
            return Err(foreign_key(constraints::MAGIC_LINKS_POSTER));
        }
        state.magic_links.insert(link.token.clone(), link.clone());
        Ok(())
    }

    async fn lock_magic_link(&mut self, token: &str) -> Result<Option<MagicLink>, StoreError> {
        Ok(self.working.magic_links.get(token).cloned())
    }

    async fn mark_magic_link_consumed(&mut self, token: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(link) = self.working.magic_links.get_mut(token) {
            link.consumed_at = Some(at);
        }
        Ok(())
    }

    async fn delete_magic_links_for_poster(&mut self, poster_id: i64) -> Result<u64, StoreError> {
        let links = &mut self.working.magic_links;
        let before = links.len();
        links.retain(|_, l| l.poster_id != poster_id);
        Ok((before - links.len()) as u64)
    }

    async fn insert_bike(
        &mut self,
        bike: &NewBike,
        creator_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let state = &mut self.working;
        if state.bikes.contains_key(&bike.numerical_id) {
            return Err(unique(constraints::PRIMARY));
        }
        if let Some(hash_id) = &bike.hash_id {
            if state.bikes.values().any(|b| b.hash_id.as_ref() == Some(hash_id)) {
                return Err(unique(constraints::BIKES_HASH_ID));
            }
        }
        if let Some(creator_id) = creator_id {
            if !state.posters.contains_key(&creator_id) {
                return Err(foreign_key(constraints::BIKES_CREATOR));
            }
        }

        state.bikes.insert(
            bike.numerical_id,
            Bike {
                numerical_id: bike.numerical_id,
                hash_id: bike.hash_id.clone(),
                is_electric: bike.is_electric,
                creator_id,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn update_bike(&mut self, bike_id: i64, changes: &BikeChanges, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let state = &mut self.working;
        if let Some(hash_id) = &changes.hash_id {
            let taken = state
                .bikes
                .values()
                .any(|b| b.numerical_id != bike_id && b.hash_id.as_ref() == Some(hash_id));
            if taken {
                return Err(unique(constraints::BIKES_HASH_ID));
            }
        }

        let Some(bike) = state.bikes.get_mut(&bike_id) else {
            return Ok(0);
        };
        if let Some(hash_id) = &changes.hash_id {
            bike.hash_id = Some(hash_id.clone());
        }
        if let Some(is_electric) = changes.is_electric {
            bike.is_electric = is_electric;
        }
        bike.updated_at = now;
        Ok(1)
    }

    async fn delete_bike(&mut self, bike_id: i64) -> Result<u64, StoreError> {
        let state = &mut self.working;
        if state.reviews_of_bike(bike_id).next().is_some() {
            return Err(foreign_key(constraints::REVIEWS_BIKE));
        }
        if state.aggregates.keys().any(|(id, _)| *id == bike_id) {
            return Err(foreign_key(constraints::RATING_AGGREGATES_BIKE));
        }
        Ok(state.bikes.remove(&bike_id).map_or(0, |_| 1))
    }

    async fn bike_ids_created_by(&mut self, poster_id: i64) -> Result<Vec<i64>, StoreError> {
        Ok(self
            .working
            .bikes
            .values()
            .filter(|b| b.creator_id == Some(poster_id))
            .map(|b| b.numerical_id)
            .collect())
    }

    async fn orphan_bikes(&mut self, poster_id: i64) -> Result<u64, StoreError> {
        let mut changed = 0;
        for bike in self.working.bikes.values_mut() {
            if bike.creator_id == Some(poster_id) {
                bike.creator_id = None;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn insert_review(&mut self, review: &NewReview, now: DateTime<Utc>) -> Result<i64, StoreError> {
        let state = &mut self.working;
        if !state.posters.contains_key(&review.poster_id) {
            return Err(foreign_key(constraints::REVIEWS_POSTER));
        }
        if !state.bikes.contains_key(&review.bike_numerical_id) {
            return Err(foreign_key(constraints::REVIEWS_BIKE));
        }

        state.last_review_id += 1;
        let review_id = state.last_review_id;
        state.reviews.insert(
            review_id,
            StoredReview {
                review_id,
                poster_id: Some(review.poster_id),
                bike_numerical_id: review.bike_numerical_id,
                comment: review.comment.clone(),
                bike_img: review.bike_img.clone(),
                created_at: now,
            },
        );
        Ok(review_id)
    }

    async fn find_owned_review_bike(&mut self, review_id: i64, poster_id: i64) -> Result<Option<i64>, StoreError> {
        Ok(self
            .working
            .reviews
            .get(&review_id)
            .filter(|r| r.poster_id == Some(poster_id))
            .map(|r| r.bike_numerical_id))
    }

    async fn update_review(
        &mut self,
        review_id: i64,
        comment: Option<&str>,
        bike_img: Option<&str>,
    ) -> Result<(), StoreError> {
        if let Some(review) = self.working.reviews.get_mut(&review_id) {
            if let Some(comment) = comment {
                review.comment = Some(comment.to_string());
            }
            if let Some(bike_img) = bike_img {
                review.bike_img = Some(bike_img.to_string());
            }
        }
        Ok(())
    }

    async fn delete_review(&mut self, review_id: i64) -> Result<u64, StoreError> {
        self.working.remove_reviews(|r| r.review_id == review_id)
    }

    async fn delete_reviews_for_bike(&mut self, bike_id: i64) -> Result<u64, StoreError> {
        self.working.remove_reviews(|r| r.bike_numerical_id == bike_id)
    }

    async fn bike_ids_reviewed_by(&mut self, poster_id: i64) -> Result<Vec<i64>, StoreError> {
        let mut ids: Vec<i64> = self
            .working
            .reviews
            .values()
            .filter(|r| r.poster_id == Some(poster_id))
            .map(|r| r.bike_numerical_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn delete_reviews_by_poster(&mut self, poster_id: i64) -> Result<u64, StoreError> {
        self.working.remove_reviews(|r| r.poster_id == Some(poster_id))
    }

    async fn orphan_reviews(&mut self, poster_id: i64) -> Result<u64, StoreError> {
        let mut changed = 0;
        for review in self.working.reviews.values_mut() {
            if review.poster_id == Some(poster_id) {
                review.poster_id = None;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn insert_rating(
        &mut self,
        review_id: i64,
        subcategory: RatingSubcategory,
        score: i16,
    ) -> Result<(), StoreError> {
        let state = &mut self.working;
        if !state.reviews.contains_key(&review_id) {
            return Err(foreign_key(constraints::REVIEW_RATINGS_REVIEW));
        }
        if state.ratings.contains_key(&(review_id, subcategory)) {
            return Err(unique(constraints::PRIMARY));
        }
        state.ratings.insert((review_id, subcategory), score);
        Ok(())
    }

    async fn upsert_rating(
        &mut self,
        review_id: i64,
        subcategory: RatingSubcategory,
        score: i16,
    ) -> Result<(), StoreError> {
        let state = &mut self.working;
        if !state.reviews.contains_key(&review_id) {
            return Err(foreign_key(constraints::REVIEW_RATINGS_REVIEW));
        }
        state.ratings.insert((review_id, subcategory), score);
        Ok(())
    }

    async fn delete_ratings_for_review(&mut self, review_id: i64) -> Result<u64, StoreError> {
        Ok(self.working.remove_ratings(|r| r.review_id == review_id))
    }

    async fn delete_ratings_for_bike(&mut self, bike_id: i64) -> Result<u64, StoreError> {
        Ok(self.working.remove_ratings(|r| r.bike_numerical_id == bike_id))
    }

    async fn delete_ratings_by_poster(&mut self, poster_id: i64) -> Result<u64, StoreError> {
        Ok(self.working.remove_ratings(|r| r.poster_id == Some(poster_id)))
    }

    async fn scores_for_bike(&mut self, bike_id: i64) -> Result<Vec<(RatingSubcategory, i16)>, StoreError> {
        let state = &self.working;
        Ok(state
            .reviews_of_bike(bike_id)
            .flat_map(|review| state.ratings_of(review.review_id))
            .collect())
    }

    async fn delete_aggregates_for_bike(&mut self, bike_id: i64) -> Result<u64, StoreError> {
        let aggregates = &mut self.working.aggregates;
        let before = aggregates.len();
        aggregates.retain(|(id, _), _| *id != bike_id);
        Ok((before - aggregates.len()) as u64)
    }

    async fn insert_aggregate(&mut self, aggregate: &RatingAggregate) -> Result<(), StoreError> {
        let state = &mut self.working;
        let key = (aggregate.bike_numerical_id, aggregate.subcategory);
        if !state.bikes.contains_key(&aggregate.bike_numerical_id) {
            return Err(foreign_key(constraints::RATING_AGGREGATES_BIKE));
        }
        if state.aggregates.contains_key(&key) {
            return Err(unique(constraints::PRIMARY));
        }
        state.aggregates.insert(key, aggregate.clone());
        Ok(())
    }
}

use crate::db::{constraints, Datastore, StoreTx};
use crate::modules::ratings::crud::recompute_aggregates_for_bike;
use crate::modules::ratings::model::{is_valid_score, RatingScores, RatingSubcategory};
use crate::modules::reviews::interface::ReviewError;
use crate::modules::reviews::model::{
    fold_review_rows, is_valid_bike_img, NewReview, ReviewScope, ReviewWithRatings, REVIEW_COOLDOWN,
};
use crate::modules::reviews::schema::{CreateReviewInput, UpdateReviewInput};
use crate::services::deadline::with_deadline;
use crate::AppState;

pub struct ReviewCrud<'a, S: Datastore> {
    state: &'a AppState<S>,
}

fn check_scores(scores: &RatingScores) -> impl Iterator<Item = Result<(RatingSubcategory, i16), ReviewError>> {
    scores.provided().into_iter().map(|(subcategory, score)| {
        if is_valid_score(score) {
            Ok((subcategory, score))
        } else {
            Err(ReviewError::InvalidScore { subcategory, score })
        }
    })
}

fn check_bike_img(bike_img: Option<&str>) -> Result<(), ReviewError> {
    match bike_img {
        Some(img) if !is_valid_bike_img(img) => Err(ReviewError::InvalidBikeImg),
        _ => Ok(()),
    }
}

impl<'a, S: Datastore> ReviewCrud<'a, S> {
    pub fn new(state: &'a AppState<S>) -> Self {
        Self { state }
    }

    /// Creates a review and its ratings, then rebuilds the bike's aggregates.
    ///
    /// The cooldown check runs before the transaction and is not locked, so two
    /// concurrent submissions can both pass it.
    pub async fn create_review_with_ratings(&self, input: CreateReviewInput) -> Result<i64, ReviewError> {
        check_bike_img(input.bike_img.as_deref())?;
        with_deadline(
            "create_review_with_ratings",
            self.state.deadlines.review_write,
            self.create(input),
        )
        .await
    }

    async fn create(&self, input: CreateReviewInput) -> Result<i64, ReviewError> {
        let now = self.state.now();
        let bike_id = input.bike_id;

        if let Some(last) = self.state.store.latest_review_at(input.poster_id, bike_id).await? {
            if now - last < REVIEW_COOLDOWN {
                tracing::warn!(poster_id = input.poster_id, bike_id, "review rejected by cooldown");
                return Err(ReviewError::TooFrequentReview);
            }
        }

        let mut tx = self.state.store.begin().await?;

        let review = NewReview {
            poster_id: input.poster_id,
            bike_numerical_id: bike_id,
            comment: input.comment,
            bike_img: input.bike_img,
        };
        let review_id = tx.insert_review(&review, now).await.map_err(|e| {
            if e.is_foreign_key_violation(constraints::REVIEWS_BIKE) {
                ReviewError::BikeNotFound(bike_id)
            } else {
                ReviewError::Store(e)
            }
        })?;

        for rating in check_scores(&input.scores) {
            let (subcategory, score) = rating?;
            tx.insert_rating(review_id, subcategory, score).await?;
        }

        recompute_aggregates_for_bike(&mut tx, bike_id).await?;
        tx.commit().await?;

        tracing::info!(review_id, poster_id = input.poster_id, bike_id, "review created");
        Ok(review_id)
    }

    /// Coalesces the text fields, upserts the provided scores and rebuilds aggregates.
    pub async fn update_review_with_ratings(&self, input: UpdateReviewInput) -> Result<(), ReviewError> {
        check_bike_img(input.bike_img.as_deref())?;
        with_deadline(
            "update_review_with_ratings",
            self.state.deadlines.review_write,
            self.update(input),
        )
        .await
    }

    async fn update(&self, input: UpdateReviewInput) -> Result<(), ReviewError> {
        let mut tx = self.state.store.begin().await?;
        let bike_id = owned_review_bike(&mut tx, input.review_id, input.poster_id).await?;

        tx.update_review(input.review_id, input.comment.as_deref(), input.bike_img.as_deref())
            .await?;

        for rating in check_scores(&input.scores) {
            let (subcategory, score) = rating?;
            tx.upsert_rating(input.review_id, subcategory, score).await?;
        }

        recompute_aggregates_for_bike(&mut tx, bike_id).await?;
        tx.commit().await?;

        tracing::info!(review_id = input.review_id, bike_id, "review updated");
        Ok(())
    }

    pub async fn delete_review(&self, review_id: i64, poster_id: i64) -> Result<(), ReviewError> {
        with_deadline(
            "delete_review",
            self.state.deadlines.review_write,
            self.delete(review_id, poster_id),
        )
        .await
    }

    async fn delete(&self, review_id: i64, poster_id: i64) -> Result<(), ReviewError> {
        let mut tx = self.state.store.begin().await?;
        let bike_id = owned_review_bike(&mut tx, review_id, poster_id).await?;

        tx.delete_ratings_for_review(review_id).await?;
        tx.delete_review(review_id).await?;

        recompute_aggregates_for_bike(&mut tx, bike_id).await?;
        tx.commit().await?;

        tracing::info!(review_id, bike_id, "review deleted");
        Ok(())
    }

    pub async fn get_review_with_ratings_by_id(&self, review_id: i64) -> Result<ReviewWithRatings, ReviewError> {
        self.read("get_review_with_ratings_by_id", ReviewScope::Review(review_id))
            .await?
            .into_iter()
            .next()
            .ok_or(ReviewError::NotFound(review_id))
    }

    pub async fn list_reviews_with_ratings(&self) -> Result<Vec<ReviewWithRatings>, ReviewError> {
        self.read("list_reviews_with_ratings", ReviewScope::All).await
    }

    pub async fn list_reviews_with_ratings_by_bike(&self, bike_id: i64) -> Result<Vec<ReviewWithRatings>, ReviewError> {
        self.read("list_reviews_with_ratings_by_bike", ReviewScope::Bike(bike_id))
            .await
    }

    async fn read(&self, operation: &'static str, scope: ReviewScope) -> Result<Vec<ReviewWithRatings>, ReviewError> {
        let rows = self.state.store.list_review_rows(scope);
        let rows = with_deadline(operation, self.state.deadlines.read, async {
            rows.await.map_err(ReviewError::from)
        })
        .await?;
        Ok(fold_review_rows(rows))
    }
}

/// Bike of the review, provided the review belongs to `poster_id`.
async fn owned_review_bike<T: StoreTx>(tx: &mut T, review_id: i64, poster_id: i64) -> Result<i64, ReviewError> {
    tx.find_owned_review_bike(review_id, poster_id)
        .await?
        .ok_or(ReviewError::NotFound(review_id))
}

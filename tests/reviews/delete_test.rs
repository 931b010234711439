use chrono::Duration;
use rottenbikes::modules::ratings::model::{RatingScores, RatingSubcategory};
use rottenbikes::modules::reviews::ReviewError;

use crate::common::TestContext;

const BIKE: i64 = 8080;

#[tokio::test]
async fn delete_review_removes_ratings_and_recomputes() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;
    let id = poster.poster.poster_id;
    ctx.create_bike(id, BIKE).await;

    let first = ctx
        .review(id, BIKE, RatingScores::default().with(RatingSubcategory::Overall, 1))
        .await;
    ctx.advance(Duration::minutes(15));
    ctx.review(id, BIKE, RatingScores::default().with(RatingSubcategory::Overall, 5))
        .await;

    ctx.reviews().delete_review(first, id).await.unwrap();

    let missing = ctx.reviews().get_review_with_ratings_by_id(first).await;
    assert!(matches!(missing, Err(ReviewError::NotFound(rid)) if rid == first));

    let aggregates = ctx.ratings().list_rating_aggregates_by_bike(BIKE).await.unwrap();
    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0].rating_sum, 5);
    assert_eq!(aggregates[0].rating_count, 1);
}

#[tokio::test]
async fn deleting_last_review_clears_aggregates() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;
    let id = poster.poster.poster_id;
    ctx.create_bike(id, BIKE).await;
    let review_id = ctx
        .review(id, BIKE, RatingScores::default().with(RatingSubcategory::Overall, 4))
        .await;

    ctx.reviews().delete_review(review_id, id).await.unwrap();

    assert!(ctx.ratings().list_rating_aggregates_by_bike(BIKE).await.unwrap().is_empty());
    assert_eq!(ctx.bikes().get_bike(BIKE).await.unwrap().average_rating, None);
}

#[tokio::test]
async fn delete_by_another_poster_is_not_found() {
    let ctx = TestContext::new().await;
    let author = ctx.register_verified_poster().await;
    let stranger = ctx.register_verified_poster().await;
    ctx.create_bike(author.poster.poster_id, BIKE).await;
    let review_id = ctx
        .review(author.poster.poster_id, BIKE, RatingScores::default())
        .await;

    let result = ctx.reviews().delete_review(review_id, stranger.poster.poster_id).await;

    assert!(matches!(result, Err(ReviewError::NotFound(_))));
    assert!(ctx.reviews().get_review_with_ratings_by_id(review_id).await.is_ok());
}

#[tokio::test]
async fn delete_missing_review_is_not_found() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;

    let result = ctx.reviews().delete_review(777, poster.poster.poster_id).await;

    assert!(matches!(result, Err(ReviewError::NotFound(777))));
}

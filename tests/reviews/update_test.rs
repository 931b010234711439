use rottenbikes::modules::ratings::model::{RatingScores, RatingSubcategory};
use rottenbikes::modules::reviews::schema::UpdateReviewInput;
use rottenbikes::modules::reviews::ReviewError;
use rust_decimal::Decimal;

use crate::common::TestContext;

const BIKE: i64 = 5150;

fn update(review_id: i64, poster_id: i64) -> UpdateReviewInput {
    UpdateReviewInput {
        review_id,
        poster_id,
        comment: None,
        bike_img: None,
        scores: RatingScores::default(),
    }
}

#[tokio::test]
async fn update_upserts_scores_and_recomputes() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;
    let id = poster.poster.poster_id;
    ctx.create_bike(id, BIKE).await;
    let review_id = ctx
        .review(id, BIKE, RatingScores::default().with(RatingSubcategory::Overall, 2))
        .await;

    ctx.reviews()
        .update_review_with_ratings(UpdateReviewInput {
            scores: RatingScores::default()
                .with(RatingSubcategory::Overall, 5)
                .with(RatingSubcategory::Power, 3),
            ..update(review_id, id)
        })
        .await
        .unwrap();

    let review = ctx.reviews().get_review_with_ratings_by_id(review_id).await.unwrap();
    assert_eq!(review.ratings[&RatingSubcategory::Overall], 5);
    assert_eq!(review.ratings[&RatingSubcategory::Power], 3);

    let aggregates = ctx.ratings().list_rating_aggregates_by_bike(BIKE).await.unwrap();
    assert_eq!(aggregates.len(), 2);
    assert_eq!(aggregates[0].subcategory, RatingSubcategory::Overall);
    assert_eq!(aggregates[0].rating_sum, 5);
    assert_eq!(aggregates[0].rating_count, 1);
    assert_eq!(aggregates[0].average_rating, Decimal::new(500, 2));
}

#[tokio::test]
async fn update_keeps_fields_that_are_not_provided() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;
    let id = poster.poster.poster_id;
    ctx.create_bike(id, BIKE).await;
    let review_id = ctx
        .review(id, BIKE, RatingScores::default().with(RatingSubcategory::Seat, 4))
        .await;

    ctx.reviews()
        .update_review_with_ratings(UpdateReviewInput {
            bike_img: Some("https://img.example.com/bike.jpg".to_string()),
            ..update(review_id, id)
        })
        .await
        .unwrap();

    let review = ctx.reviews().get_review_with_ratings_by_id(review_id).await.unwrap();
    assert_eq!(review.comment.as_deref(), Some("rides well"));
    assert_eq!(review.bike_img.as_deref(), Some("https://img.example.com/bike.jpg"));
    assert_eq!(review.ratings[&RatingSubcategory::Seat], 4);
}

#[tokio::test]
async fn update_by_another_poster_is_not_found() {
    let ctx = TestContext::new().await;
    let author = ctx.register_verified_poster().await;
    let stranger = ctx.register_verified_poster().await;
    ctx.create_bike(author.poster.poster_id, BIKE).await;
    let review_id = ctx
        .review(author.poster.poster_id, BIKE, RatingScores::default())
        .await;

    let result = ctx
        .reviews()
        .update_review_with_ratings(UpdateReviewInput {
            comment: Some("hijacked".to_string()),
            ..update(review_id, stranger.poster.poster_id)
        })
        .await;
    assert!(matches!(result, Err(ReviewError::NotFound(rid)) if rid == review_id));

    let review = ctx.reviews().get_review_with_ratings_by_id(review_id).await.unwrap();
    assert_eq!(review.comment.as_deref(), Some("rides well"));
}

#[tokio::test]
async fn update_with_invalid_score_rolls_back() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;
    let id = poster.poster.poster_id;
    ctx.create_bike(id, BIKE).await;
    let review_id = ctx
        .review(id, BIKE, RatingScores::default().with(RatingSubcategory::Overall, 3))
        .await;

    let result = ctx
        .reviews()
        .update_review_with_ratings(UpdateReviewInput {
            comment: Some("changed".to_string()),
            scores: RatingScores::default()
                .with(RatingSubcategory::Overall, 5)
                .with(RatingSubcategory::Breaks, 9),
            ..update(review_id, id)
        })
        .await;
    assert!(matches!(result, Err(ReviewError::InvalidScore { score: 9, .. })));

    let review = ctx.reviews().get_review_with_ratings_by_id(review_id).await.unwrap();
    assert_eq!(review.comment.as_deref(), Some("rides well"));
    assert_eq!(review.ratings[&RatingSubcategory::Overall], 3);
}

#[tokio::test]
async fn update_with_overlong_image_link_changes_nothing() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;
    let id = poster.poster.poster_id;
    ctx.create_bike(id, BIKE).await;
    let review_id = ctx.review(id, BIKE, RatingScores::default()).await;

    let result = ctx
        .reviews()
        .update_review_with_ratings(UpdateReviewInput {
            comment: Some("changed".to_string()),
            bike_img: Some("i".repeat(1025)),
            ..update(review_id, id)
        })
        .await;
    assert!(matches!(result, Err(ReviewError::InvalidBikeImg)));

    let review = ctx.reviews().get_review_with_ratings_by_id(review_id).await.unwrap();
    assert_eq!(review.comment.as_deref(), Some("rides well"));
    assert_eq!(review.bike_img, None);
}

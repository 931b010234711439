use rottenbikes::modules::auth::AuthError;
use rottenbikes::modules::bikes::BikeError;
use rottenbikes::modules::ratings::model::{RatingScores, RatingSubcategory};
use rust_decimal::Decimal;

use crate::common::{random_bike_id, TestContext};

fn overall(score: i16) -> RatingScores {
    RatingScores::default().with(RatingSubcategory::Overall, score)
}

#[tokio::test]
async fn aggregates_match_stored_scores() {
    let Some(ctx) = TestContext::mysql().await else {
        return;
    };
    let owner = ctx.register_verified_poster().await;
    let bike = random_bike_id();
    ctx.create_bike(owner.poster.poster_id, bike).await;

    let mut riders = Vec::new();
    for score in [2, 3, 3] {
        let rider = ctx.register_verified_poster().await;
        ctx.review(rider.poster.poster_id, bike, overall(score)).await;
        riders.push(rider);
    }

    let aggregates = ctx.ratings().list_rating_aggregates_by_bike(bike).await.unwrap();
    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0].rating_sum, 8);
    assert_eq!(aggregates[0].rating_count, 3);
    assert_eq!(aggregates[0].average_rating, Decimal::new(267, 2));
    assert_eq!(
        ctx.bikes().get_bike(bike).await.unwrap().average_rating,
        Some(Decimal::new(267, 2))
    );

    for rider in riders {
        ctx.accounts().delete_poster(rider.poster.poster_id, true).await.unwrap();
    }
    ctx.accounts().delete_poster(owner.poster.poster_id, true).await.unwrap();
}

#[tokio::test]
async fn purge_removes_content_and_rebuilds_aggregates() {
    let Some(ctx) = TestContext::mysql().await else {
        return;
    };
    let leaving = ctx.register_verified_poster().await;
    let staying = ctx.register_verified_poster().await;
    let owned = random_bike_id();
    let reviewed = random_bike_id();
    ctx.create_bike(leaving.poster.poster_id, owned).await;
    ctx.create_bike(staying.poster.poster_id, reviewed).await;
    ctx.review(leaving.poster.poster_id, reviewed, overall(5)).await;
    ctx.review(staying.poster.poster_id, reviewed, overall(3)).await;
    ctx.review(staying.poster.poster_id, owned, overall(4)).await;

    ctx.accounts().delete_poster(leaving.poster.poster_id, true).await.unwrap();

    assert!(matches!(ctx.bikes().get_bike(owned).await, Err(BikeError::NotFound(_))));
    assert!(ctx.ratings().list_rating_aggregates_by_bike(owned).await.unwrap().is_empty());

    let reviews = ctx.reviews().list_reviews_with_ratings_by_bike(reviewed).await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].poster_id, Some(staying.poster.poster_id));

    let aggregates = ctx.ratings().list_rating_aggregates_by_bike(reviewed).await.unwrap();
    assert_eq!(aggregates[0].rating_sum, 3);
    assert_eq!(aggregates[0].rating_count, 1);

    let token = ctx.verifier().get_poster_by_api_token(&leaving.api_token).await;
    assert!(matches!(token, Err(AuthError::InvalidToken)));

    ctx.accounts().delete_poster(staying.poster.poster_id, true).await.unwrap();
}

#[tokio::test]
async fn orphan_keeps_reviews_and_aggregates() {
    let Some(ctx) = TestContext::mysql().await else {
        return;
    };
    let leaving = ctx.register_verified_poster().await;
    let staying = ctx.register_verified_poster().await;
    let bike = random_bike_id();
    ctx.create_bike(leaving.poster.poster_id, bike).await;
    ctx.review(leaving.poster.poster_id, bike, overall(5)).await;
    ctx.review(staying.poster.poster_id, bike, overall(3)).await;

    ctx.accounts().delete_poster(leaving.poster.poster_id, false).await.unwrap();

    assert_eq!(ctx.bikes().get_bike(bike).await.unwrap().bike.creator_id, None);

    let reviews = ctx.reviews().list_reviews_with_ratings_by_bike(bike).await.unwrap();
    assert_eq!(reviews.len(), 2);
    let orphaned = reviews.iter().find(|r| r.poster_id.is_none()).expect("orphaned review");
    assert_eq!(orphaned.poster_username, None);

    let aggregates = ctx.ratings().list_rating_aggregates_by_bike(bike).await.unwrap();
    assert_eq!(aggregates[0].rating_count, 2);
    assert_eq!(aggregates[0].average_rating, Decimal::new(400, 2));

    // Orphaned rows are not reachable through any poster, so the bike goes directly.
    ctx.bikes().delete_bike(bike).await.unwrap();
    ctx.accounts().delete_poster(staying.poster.poster_id, true).await.unwrap();
}

#[tokio::test]
async fn confirm_succeeds_once_and_status_reports_the_token() {
    let Some(ctx) = TestContext::mysql().await else {
        return;
    };
    let (input, issued) = ctx.register().await;

    let confirmed = ctx.auth().confirm_magic_link(&issued.magic_token).await.unwrap();
    let again = ctx.auth().confirm_magic_link(&issued.magic_token).await;
    assert!(matches!(again, Err(AuthError::TokenExpiredOrUsed)));

    let status = ctx.verifier().check_magic_link_status(&issued.magic_token).await.unwrap();
    assert_eq!(status, confirmed.api_token);

    let poster = ctx.verifier().get_poster_by_api_token(&confirmed.api_token).await.unwrap();
    assert_eq!(poster.username, input.username);
    ctx.accounts().delete_poster(poster.poster_id, true).await.unwrap();
}

#[tokio::test]
async fn identifiers_with_trailing_whitespace_do_not_match() {
    let Some(ctx) = TestContext::mysql().await else {
        return;
    };
    let (input, issued) = ctx.register().await;

    let username = ctx.auth().create_magic_link(&format!("{} ", input.username)).await;
    assert!(matches!(username, Err(AuthError::UserNotFound)));

    let email = ctx.auth().create_magic_link(&format!("  {}\t", input.email)).await;
    assert!(matches!(email, Err(AuthError::UserNotFound)));

    let confirmed = ctx.auth().confirm_magic_link(&issued.magic_token).await.unwrap();
    let poster = ctx.verifier().get_poster_by_api_token(&confirmed.api_token).await.unwrap();
    ctx.accounts().delete_poster(poster.poster_id, true).await.unwrap();
}

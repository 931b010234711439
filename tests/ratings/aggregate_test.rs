use rottenbikes::modules::ratings::model::{RatingScores, RatingSubcategory};
use rust_decimal::Decimal;

use crate::common::TestContext;

#[tokio::test]
async fn aggregates_average_to_two_decimals() {
    let ctx = TestContext::new().await;
    let owner = ctx.register_verified_poster().await;
    ctx.create_bike(owner.poster.poster_id, 1500).await;

    for score in [2, 3, 3] {
        let rider = ctx.register_verified_poster().await;
        ctx.review(
            rider.poster.poster_id,
            1500,
            RatingScores::default().with(RatingSubcategory::Overall, score),
        )
        .await;
    }

    let aggregates = ctx.ratings().list_rating_aggregates_by_bike(1500).await.unwrap();

    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0].rating_sum, 8);
    assert_eq!(aggregates[0].rating_count, 3);
    assert_eq!(aggregates[0].average_rating, Decimal::new(267, 2));

    let bike = ctx.bikes().get_bike(1500).await.unwrap();
    assert_eq!(bike.average_rating, Some(Decimal::new(267, 2)));
}

#[tokio::test]
async fn list_all_aggregates_is_ordered_by_bike_then_subcategory() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;
    let id = poster.poster.poster_id;
    ctx.create_bike(id, 2500).await;
    ctx.create_bike(id, 1500).await;

    let scores = RatingScores::default()
        .with(RatingSubcategory::Seat, 3)
        .with(RatingSubcategory::Overall, 4)
        .with(RatingSubcategory::Breaks, 5);
    ctx.review(id, 2500, scores).await;
    ctx.review(id, 1500, RatingScores::default().with(RatingSubcategory::Power, 1))
        .await;

    let aggregates = ctx.ratings().list_rating_aggregates().await.unwrap();

    let keys: Vec<(i64, RatingSubcategory)> = aggregates
        .iter()
        .map(|a| (a.bike_numerical_id, a.subcategory))
        .collect();
    assert_eq!(
        keys,
        vec![
            (1500, RatingSubcategory::Power),
            (2500, RatingSubcategory::Breaks),
            (2500, RatingSubcategory::Overall),
            (2500, RatingSubcategory::Seat),
        ]
    );
}

#[tokio::test]
async fn unrated_bike_has_no_aggregates() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;
    ctx.create_bike(poster.poster.poster_id, 1600).await;
    ctx.review(poster.poster.poster_id, 1600, RatingScores::default()).await;

    assert!(ctx.ratings().list_rating_aggregates_by_bike(1600).await.unwrap().is_empty());
    assert_eq!(ctx.bikes().get_bike(1600).await.unwrap().average_rating, None);
}

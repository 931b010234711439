use rottenbikes::config::Deadlines;
use rottenbikes::db::memory::MemoryStore;
use rottenbikes::modules::bikes::model::{BikeChanges, NewBike};
use rottenbikes::modules::bikes::BikeError;
use rottenbikes::modules::ratings::model::{RatingScores, RatingSubcategory};
use std::time::Duration;

use crate::common::TestContext;

fn new_bike(numerical_id: i64, hash_id: Option<&str>) -> NewBike {
    NewBike {
        numerical_id,
        hash_id: hash_id.map(str::to_string),
        is_electric: true,
    }
}

#[tokio::test]
async fn create_bike_returns_unrated_summary() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;

    let created = ctx
        .bikes()
        .create_bike(new_bike(1234, Some("abc123")), poster.poster.poster_id)
        .await
        .unwrap();

    assert_eq!(created.bike.numerical_id, 1234);
    assert_eq!(created.bike.hash_id.as_deref(), Some("abc123"));
    assert_eq!(created.bike.creator_id, Some(poster.poster.poster_id));
    assert_eq!(created.average_rating, None);
    assert_eq!(ctx.bikes().get_bike(1234).await.unwrap(), created);
}

#[tokio::test]
async fn create_bike_validates_identifiers() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;
    let id = poster.poster.poster_id;

    let short = ctx.bikes().create_bike(new_bike(999, None), id).await;
    assert!(matches!(short, Err(BikeError::InvalidNumericalId(999))));

    let long = ctx.bikes().create_bike(new_bike(1_000_000, None), id).await;
    assert!(matches!(long, Err(BikeError::InvalidNumericalId(1_000_000))));

    let bad_hash = ctx.bikes().create_bike(new_bike(1234, Some("ab-12")), id).await;
    assert!(matches!(bad_hash, Err(BikeError::InvalidHashId)));

    let wide_hash = "h".repeat(65);
    let wide = ctx.bikes().create_bike(new_bike(1234, Some(&wide_hash)), id).await;
    assert!(matches!(wide, Err(BikeError::InvalidHashId)));

    let empty_hash = ctx.bikes().create_bike(new_bike(1234, Some("")), id).await.unwrap();
    assert_eq!(empty_hash.bike.hash_id, None);
}

#[tokio::test]
async fn create_bike_rejects_duplicates() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;
    let id = poster.poster.poster_id;
    ctx.bikes().create_bike(new_bike(1234, Some("dup")), id).await.unwrap();

    let same_id = ctx.bikes().create_bike(new_bike(1234, None), id).await;
    assert!(matches!(same_id, Err(BikeError::NumericalIdTaken(1234))));

    let same_hash = ctx.bikes().create_bike(new_bike(5678, Some("dup")), id).await;
    assert!(matches!(same_hash, Err(BikeError::HashIdTaken(h)) if h == "dup"));
}

#[tokio::test]
async fn list_bikes_is_ordered_by_numerical_id() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;
    for id in [7000, 1000, 4000] {
        ctx.create_bike(poster.poster.poster_id, id).await;
    }

    let ids: Vec<i64> = ctx
        .bikes()
        .list_bikes()
        .await
        .unwrap()
        .iter()
        .map(|b| b.bike.numerical_id)
        .collect();

    assert_eq!(ids, vec![1000, 4000, 7000]);
}

#[tokio::test]
async fn bike_details_include_ratings_and_reviews() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;
    ctx.create_bike(poster.poster.poster_id, 3333).await;
    ctx.review(
        poster.poster.poster_id,
        3333,
        RatingScores::default()
            .with(RatingSubcategory::Overall, 4)
            .with(RatingSubcategory::Power, 2),
    )
    .await;

    let details = ctx.bikes().get_bike_details(3333).await.unwrap();

    assert_eq!(details.summary.bike.numerical_id, 3333);
    assert_eq!(details.ratings.len(), 2);
    assert_eq!(details.reviews.len(), 1);
    assert_eq!(details.reviews[0].ratings.len(), 2);

    let missing = ctx.bikes().get_bike_details(4444).await;
    assert!(matches!(missing, Err(BikeError::NotFound(4444))));
}

#[tokio::test]
async fn update_bike_applies_partial_changes() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;
    let id = poster.poster.poster_id;
    ctx.bikes().create_bike(new_bike(1234, Some("first")), id).await.unwrap();
    ctx.bikes().create_bike(new_bike(5678, Some("second")), id).await.unwrap();

    ctx.bikes()
        .update_bike(
            1234,
            BikeChanges {
                is_electric: Some(false),
                ..BikeChanges::default()
            },
        )
        .await
        .unwrap();
    let bike = ctx.bikes().get_bike(1234).await.unwrap().bike;
    assert!(!bike.is_electric);
    assert_eq!(bike.hash_id.as_deref(), Some("first"));

    let taken = ctx
        .bikes()
        .update_bike(
            1234,
            BikeChanges {
                hash_id: Some("second".to_string()),
                ..BikeChanges::default()
            },
        )
        .await;
    assert!(matches!(taken, Err(BikeError::HashIdTaken(_))));

    let missing = ctx.bikes().update_bike(9999, BikeChanges::default()).await;
    assert!(matches!(missing, Err(BikeError::NotFound(9999))));
}

#[tokio::test]
async fn delete_bike_removes_its_reviews() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;
    ctx.create_bike(poster.poster.poster_id, 2222).await;
    ctx.review(
        poster.poster.poster_id,
        2222,
        RatingScores::default().with(RatingSubcategory::Seat, 5),
    )
    .await;

    ctx.bikes().delete_bike(2222).await.unwrap();

    assert!(matches!(ctx.bikes().get_bike(2222).await, Err(BikeError::NotFound(2222))));
    assert!(ctx.reviews().list_reviews_with_ratings().await.unwrap().is_empty());
    assert!(ctx.ratings().list_rating_aggregates().await.unwrap().is_empty());

    let again = ctx.bikes().delete_bike(2222).await;
    assert!(matches!(again, Err(BikeError::NotFound(2222))));
}

#[tokio::test]
async fn slow_store_times_out_and_writes_nothing() {
    let store = MemoryStore::new().with_begin_latency(Duration::from_millis(200));
    let deadlines = Deadlines {
        bike_write: Duration::from_millis(20),
        ..Deadlines::default()
    };
    let ctx = TestContext::with_store(store, deadlines);

    let result = ctx.bikes().create_bike(new_bike(1234, None), 1).await;

    assert!(matches!(result, Err(BikeError::Timeout(_))));
    assert!(ctx.bikes().list_bikes().await.unwrap().is_empty());
}

#[tokio::test]
async fn bike_writes_ignore_the_auth_deadline() {
    let base = TestContext::new().await;
    let poster = base.register_verified_poster().await;
    let id = poster.poster.poster_id;

    let deadlines = Deadlines {
        auth: Duration::from_millis(20),
        ..Deadlines::default()
    };
    let ctx = TestContext::with_store(base.store.clone().with_begin_latency(Duration::from_millis(50)), deadlines);

    ctx.bikes().create_bike(new_bike(1234, None), id).await.unwrap();
    ctx.bikes()
        .update_bike(
            1234,
            BikeChanges {
                is_electric: Some(false),
                ..BikeChanges::default()
            },
        )
        .await
        .unwrap();
    ctx.bikes().delete_bike(1234).await.unwrap();
}

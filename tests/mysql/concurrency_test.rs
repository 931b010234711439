use rottenbikes::modules::ratings::crud::aggregate_scores;
use rottenbikes::modules::ratings::model::{RatingScores, RatingSubcategory};
use rottenbikes::modules::reviews::schema::UpdateReviewInput;
use rottenbikes::modules::reviews::ReviewError;

use crate::common::{random_bike_id, review_input, TestContext};

fn overall(score: i16) -> RatingScores {
    RatingScores::default().with(RatingSubcategory::Overall, score)
}

/// An update and a create on the same bike race; whichever commits last must
/// have seen the other's scores when it rebuilt the aggregates.
#[tokio::test]
async fn racing_update_and_create_leave_consistent_aggregates() {
    let Some(ctx) = TestContext::mysql().await else {
        return;
    };
    let author = ctx.register_verified_poster().await;
    let author_id = author.poster.poster_id;

    for round in 0..10 {
        let newcomer = ctx.register_verified_poster().await;
        let bike = random_bike_id();
        ctx.create_bike(author_id, bike).await;
        let review_id = ctx.review(author_id, bike, overall(1)).await;

        let reviews = ctx.reviews();
        let update = reviews.update_review_with_ratings(UpdateReviewInput {
            review_id,
            poster_id: author_id,
            comment: None,
            bike_img: None,
            scores: overall(4),
        });
        let create =
            reviews.create_review_with_ratings(review_input(newcomer.poster.poster_id, bike, overall(5)));
        let (updated, created) = tokio::join!(update, create);

        // InnoDB may pick either side as a deadlock victim; that side rolls back whole.
        for failure in [updated.err(), created.err()].into_iter().flatten() {
            assert!(matches!(failure, ReviewError::Store(_)), "round {round}: {failure}");
        }

        let scores: Vec<(RatingSubcategory, i16)> = ctx
            .reviews()
            .list_reviews_with_ratings_by_bike(bike)
            .await
            .unwrap()
            .iter()
            .flat_map(|r| r.ratings.iter().map(|(sub, score)| (*sub, *score)))
            .collect();
        let stored = ctx.ratings().list_rating_aggregates_by_bike(bike).await.unwrap();
        assert_eq!(stored, aggregate_scores(bike, &scores), "round {round}");

        ctx.accounts().delete_poster(newcomer.poster.poster_id, true).await.unwrap();
    }

    ctx.accounts().delete_poster(author_id, true).await.unwrap();
}

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

use crate::db::{Datastore, StoreError, StoreTx};
use crate::modules::ratings::interface::RatingError;
use crate::modules::ratings::model::{
    RatingAggregate, RatingSubcategory, RatingWindow, TimedScore, WindowedRating,
};
use crate::services::deadline::with_deadline;
use crate::AppState;

/// Mean rounded half away from zero to two decimals, matching SQL `ROUND(AVG(x), 2)`.
fn average(sum: i64, count: i64) -> Decimal {
    (Decimal::from(sum) / Decimal::from(count))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Folds raw scores into one aggregate per subcategory present, ordered by subcategory.
pub fn aggregate_scores(bike_id: i64, scores: &[(RatingSubcategory, i16)]) -> Vec<RatingAggregate> {
    let mut totals: BTreeMap<RatingSubcategory, (i64, i64)> = BTreeMap::new();
    for &(subcategory, score) in scores {
        let entry = totals.entry(subcategory).or_insert((0, 0));
        entry.0 += i64::from(score);
        entry.1 += 1;
    }

    totals
        .into_iter()
        .map(|(subcategory, (sum, count))| RatingAggregate {
            bike_numerical_id: bike_id,
            subcategory,
            rating_sum: sum,
            rating_count: count,
            average_rating: average(sum, count),
        })
        .collect()
}

/// Averages over the trailing week, the trailing two weeks and all time.
/// Windows without ratings are left out.
pub fn windowed_ratings(bike_id: i64, scores: &[TimedScore], now: DateTime<Utc>) -> Vec<WindowedRating> {
    let windows = [
        (RatingWindow::OneWeek, Some(now - Duration::weeks(1))),
        (RatingWindow::TwoWeeks, Some(now - Duration::weeks(2))),
        (RatingWindow::Overall, None),
    ];

    let mut by_subcategory: BTreeMap<RatingSubcategory, Vec<&TimedScore>> = BTreeMap::new();
    for score in scores {
        by_subcategory.entry(score.subcategory).or_default().push(score);
    }

    let mut out = Vec::new();
    for (subcategory, scores) in by_subcategory {
        for (window, since) in windows {
            let (sum, count) = scores
                .iter()
                .filter(|s| since.map_or(true, |since| s.created_at >= since))
                .fold((0i64, 0i64), |(sum, count), s| (sum + i64::from(s.score), count + 1));

            if count > 0 {
                out.push(WindowedRating {
                    bike_numerical_id: bike_id,
                    subcategory,
                    window,
                    average_rating: average(sum, count),
                });
            }
        }
    }
    out
}

/// Rebuilds every aggregate row of `bike_id` from the live ratings visible to `tx`.
pub async fn recompute_aggregates_for_bike<T: StoreTx>(tx: &mut T, bike_id: i64) -> Result<(), StoreError> {
    tx.delete_aggregates_for_bike(bike_id).await?;

    let scores = tx.scores_for_bike(bike_id).await?;
    let aggregates = aggregate_scores(bike_id, &scores);
    for aggregate in &aggregates {
        tx.insert_aggregate(aggregate).await?;
    }

    tracing::debug!(bike_id, subcategories = aggregates.len(), "recomputed rating aggregates");
    Ok(())
}

pub struct RatingCrud<'a, S: Datastore> {
    state: &'a AppState<S>,
}

impl<'a, S: Datastore> RatingCrud<'a, S> {
    pub fn new(state: &'a AppState<S>) -> Self {
        Self { state }
    }

    pub async fn list_rating_aggregates(&self) -> Result<Vec<RatingAggregate>, RatingError> {
        let read = self.state.store.list_aggregates(None);
        with_deadline("list_rating_aggregates", self.state.deadlines.read, async {
            read.await.map_err(RatingError::from)
        })
        .await
    }

    pub async fn list_rating_aggregates_by_bike(&self, bike_id: i64) -> Result<Vec<RatingAggregate>, RatingError> {
        let read = self.state.store.list_aggregates(Some(bike_id));
        with_deadline("list_rating_aggregates_by_bike", self.state.deadlines.read, async {
            read.await.map_err(RatingError::from)
        })
        .await
    }

    pub async fn list_windowed_ratings_by_bike(&self, bike_id: i64) -> Result<Vec<WindowedRating>, RatingError> {
        let read = self.state.store.list_timed_scores(bike_id);
        let scores = with_deadline("list_windowed_ratings_by_bike", self.state.deadlines.read, async {
            read.await.map_err(RatingError::from)
        })
        .await?;
        Ok(windowed_ratings(bike_id, &scores, self.state.now()))
    }
}

use crate::db::{constraints, Datastore, StoreError, StoreTx};
use crate::modules::bikes::interface::BikeError;
use crate::modules::bikes::model::{
    is_valid_hash_id, is_valid_numerical_id, Bike, BikeChanges, BikeDetails, BikeSummary, NewBike,
};
use crate::modules::reviews::model::{fold_review_rows, ReviewScope};
use crate::services::deadline::with_deadline;
use crate::AppState;

/// Removes a bike with everything hanging off it: ratings, reviews and aggregates.
/// Returns the number of bike rows deleted.
pub(crate) async fn purge_bike<T: StoreTx>(tx: &mut T, bike_id: i64) -> Result<u64, StoreError> {
    tx.delete_ratings_for_bike(bike_id).await?;
    tx.delete_reviews_for_bike(bike_id).await?;
    tx.delete_aggregates_for_bike(bike_id).await?;
    tx.delete_bike(bike_id).await
}

fn normalize_hash_id(hash_id: Option<String>) -> Result<Option<String>, BikeError> {
    match hash_id.filter(|h| !h.is_empty()) {
        Some(h) if !is_valid_hash_id(&h) => Err(BikeError::InvalidHashId),
        other => Ok(other),
    }
}

pub struct BikeCrud<'a, S: Datastore> {
    state: &'a AppState<S>,
}

impl<'a, S: Datastore> BikeCrud<'a, S> {
    pub fn new(state: &'a AppState<S>) -> Self {
        Self { state }
    }

    pub async fn create_bike(&self, bike: NewBike, creator_id: i64) -> Result<BikeSummary, BikeError> {
        if !is_valid_numerical_id(bike.numerical_id) {
            return Err(BikeError::InvalidNumericalId(bike.numerical_id));
        }
        let bike = NewBike {
            hash_id: normalize_hash_id(bike.hash_id)?,
            ..bike
        };

        with_deadline("create_bike", self.state.deadlines.bike_write, self.insert(bike, creator_id)).await
    }

    async fn insert(&self, bike: NewBike, creator_id: i64) -> Result<BikeSummary, BikeError> {
        let now = self.state.now();
        let mut tx = self.state.store.begin().await?;

        tx.insert_bike(&bike, Some(creator_id), now)
            .await
            .map_err(|e| {
                if e.is_unique_violation(constraints::PRIMARY) {
                    BikeError::NumericalIdTaken(bike.numerical_id)
                } else if e.is_unique_violation(constraints::BIKES_HASH_ID) {
                    BikeError::HashIdTaken(bike.hash_id.clone().unwrap_or_default())
                } else {
                    BikeError::Store(e)
                }
            })?;
        tx.commit().await?;

        tracing::info!(bike_id = bike.numerical_id, creator_id, "bike created");
        Ok(BikeSummary {
            bike: Bike {
                numerical_id: bike.numerical_id,
                hash_id: bike.hash_id,
                is_electric: bike.is_electric,
                creator_id: Some(creator_id),
                created_at: now,
                updated_at: now,
            },
            average_rating: None,
        })
    }

    pub async fn list_bikes(&self) -> Result<Vec<BikeSummary>, BikeError> {
        let read = self.state.store.list_bikes();
        with_deadline("list_bikes", self.state.deadlines.read, async {
            read.await.map_err(BikeError::from)
        })
        .await
    }

    pub async fn get_bike(&self, bike_id: i64) -> Result<BikeSummary, BikeError> {
        let read = self.state.store.find_bike(bike_id);
        with_deadline("get_bike", self.state.deadlines.read, async {
            read.await.map_err(BikeError::from)
        })
        .await?
        .ok_or(BikeError::NotFound(bike_id))
    }

    /// The bike with its per-subcategory aggregates and all its reviews.
    pub async fn get_bike_details(&self, bike_id: i64) -> Result<BikeDetails, BikeError> {
        with_deadline("get_bike_details", self.state.deadlines.read, self.details(bike_id)).await
    }

    async fn details(&self, bike_id: i64) -> Result<BikeDetails, BikeError> {
        let store = &self.state.store;
        let summary = store
            .find_bike(bike_id)
            .await?
            .ok_or(BikeError::NotFound(bike_id))?;
        let ratings = store.list_aggregates(Some(bike_id)).await?;
        let reviews = fold_review_rows(store.list_review_rows(ReviewScope::Bike(bike_id)).await?);

        Ok(BikeDetails {
            summary,
            ratings,
            reviews,
        })
    }

    pub async fn update_bike(&self, bike_id: i64, changes: BikeChanges) -> Result<(), BikeError> {
        let changes = BikeChanges {
            hash_id: normalize_hash_id(changes.hash_id)?,
            ..changes
        };
        with_deadline("update_bike", self.state.deadlines.bike_write, self.update(bike_id, changes)).await
    }

    async fn update(&self, bike_id: i64, changes: BikeChanges) -> Result<(), BikeError> {
        let mut tx = self.state.store.begin().await?;

        let updated = tx
            .update_bike(bike_id, &changes, self.state.now())
            .await
            .map_err(|e| {
                if e.is_unique_violation(constraints::BIKES_HASH_ID) {
                    BikeError::HashIdTaken(changes.hash_id.clone().unwrap_or_default())
                } else {
                    BikeError::Store(e)
                }
            })?;
        if updated == 0 {
            return Err(BikeError::NotFound(bike_id));
        }
        tx.commit().await?;

        tracing::info!(bike_id, "bike updated");
        Ok(())
    }

    /// Deletes the bike together with its reviews, ratings and aggregates.
    pub async fn delete_bike(&self, bike_id: i64) -> Result<(), BikeError> {
        with_deadline("delete_bike", self.state.deadlines.bike_write, self.delete(bike_id)).await
    }

    async fn delete(&self, bike_id: i64) -> Result<(), BikeError> {
        let mut tx = self.state.store.begin().await?;
        if purge_bike(&mut tx, bike_id).await? == 0 {
            return Err(BikeError::NotFound(bike_id));
        }
        tx.commit().await?;

        tracing::info!(bike_id, "bike deleted");
        Ok(())
    }
}

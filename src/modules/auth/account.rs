use crate::db::{Datastore, StoreError, StoreTx};
use crate::modules::auth::interface::AuthError;
use crate::modules::auth::model::DeletionStrategy;
use crate::modules::bikes::crud::purge_bike;
use crate::modules::ratings::crud::recompute_aggregates_for_bike;
use crate::services::deadline::with_deadline;
use crate::AppState;

pub struct AccountCrud<'a, S: Datastore> {
    state: &'a AppState<S>,
}

/// Deletes the poster's ratings and reviews, rebuilds the aggregates of every
/// bike they reviewed, then removes the bikes they created.
async fn purge_content<T: StoreTx>(tx: &mut T, poster_id: i64) -> Result<(), StoreError> {
    let reviewed = tx.bike_ids_reviewed_by(poster_id).await?;

    tx.delete_ratings_by_poster(poster_id).await?;
    tx.delete_reviews_by_poster(poster_id).await?;
    for bike_id in reviewed {
        recompute_aggregates_for_bike(tx, bike_id).await?;
    }

    for bike_id in tx.bike_ids_created_by(poster_id).await? {
        purge_bike(tx, bike_id).await?;
    }
    Ok(())
}

/// Detaches the poster's bikes and reviews. Ratings stay, so aggregates are untouched.
async fn orphan_content<T: StoreTx>(tx: &mut T, poster_id: i64) -> Result<(), StoreError> {
    tx.orphan_bikes(poster_id).await?;
    tx.orphan_reviews(poster_id).await?;
    Ok(())
}

impl<'a, S: Datastore> AccountCrud<'a, S> {
    pub fn new(state: &'a AppState<S>) -> Self {
        Self { state }
    }

    /// Removes the poster. `delete_content` selects between purging and orphaning
    /// their bikes and reviews.
    pub async fn delete_poster(&self, poster_id: i64, delete_content: bool) -> Result<(), AuthError> {
        let strategy = DeletionStrategy::from_flag(delete_content);
        with_deadline(
            "delete_poster",
            self.state.deadlines.poster_delete,
            self.delete(poster_id, strategy),
        )
        .await
    }

    async fn delete(&self, poster_id: i64, strategy: DeletionStrategy) -> Result<(), AuthError> {
        let mut tx = self.state.store.begin().await?;

        match strategy {
            DeletionStrategy::PurgeContent => purge_content(&mut tx, poster_id).await?,
            DeletionStrategy::OrphanContent => orphan_content(&mut tx, poster_id).await?,
        }

        tx.delete_magic_links_for_poster(poster_id).await?;
        if tx.delete_poster(poster_id).await? == 0 {
            return Err(AuthError::UserNotFound);
        }
        tx.commit().await?;

        tracing::info!(poster_id, ?strategy, "poster deleted");
        Ok(())
    }
}

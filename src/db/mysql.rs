use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::error::ErrorKind;
use sqlx::{FromRow, MySql, Pool, Transaction};

use super::{Datastore, StoreError, StoreTx};
use crate::modules::auth::model::{MagicLink, NewPoster, Poster, PosterIdentifier};
use crate::modules::bikes::model::{Bike, BikeChanges, BikeSummary, NewBike};
use crate::modules::ratings::model::{RatingAggregate, RatingSubcategory, TimedScore, UnknownSubcategory};
use crate::modules::reviews::model::{NewReview, ReviewRow, ReviewScope};

const POSTER_COLUMNS: &str =
    "poster_id, email, username, api_token, api_token_expires_at, email_verified, created_at";

const MAGIC_LINK_COLUMNS: &str = "token, poster_id, created_at, expires_at, consumed_at, api_token";

const BIKE_SUMMARY_SELECT: &str = r#"
    SELECT
        b.numerical_id,
        b.hash_id,
        b.is_electric,
        b.creator_id,
        b.created_at,
        b.updated_at,
        ra.average_rating
    FROM bikes b
    LEFT JOIN rating_aggregates ra
        ON ra.bike_numerical_id = b.numerical_id
        AND ra.subcategory = 'overall'
"#;

const REVIEW_ROW_SELECT: &str = r#"
    SELECT
        r.review_id,
        r.poster_id,
        p.username,
        r.bike_numerical_id,
        r.comment,
        r.bike_img,
        r.created_at,
        rr.subcategory,
        rr.score
    FROM reviews r
    LEFT JOIN posters p ON p.poster_id = r.poster_id
    LEFT JOIN review_ratings rr ON rr.review_id = r.review_id
"#;

const REVIEW_ROW_ORDER: &str = "ORDER BY r.bike_numerical_id, r.review_id, rr.subcategory";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let message = db_err.message();
            match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    if let Some(constraint) = db_err.constraint().map(str::to_string).or_else(|| duplicate_key_name(message)) {
                        return StoreError::UniqueViolation { constraint };
                    }
                }
                ErrorKind::ForeignKeyViolation => {
                    if let Some(constraint) = db_err.constraint().map(str::to_string).or_else(|| foreign_key_name(message)) {
                        return StoreError::ForeignKeyViolation { constraint };
                    }
                }
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

/// Key name from MySQL error 1062, e.g. `... for key 'posters.uq_posters_email'`.
/// MySQL 8 prefixes the table name; 5.7 does not.
fn duplicate_key_name(message: &str) -> Option<String> {
    let start = message.rfind("for key '")? + "for key '".len();
    let key = message[start..].trim_end_matches('\'');
    let key = key.rsplit('.').next().unwrap_or(key);
    (!key.is_empty()).then(|| key.to_string())
}

/// Constraint name from MySQL errors 1451/1452, e.g. ``CONSTRAINT `fk_reviews_bike` FOREIGN KEY``.
fn foreign_key_name(message: &str) -> Option<String> {
    let start = message.find("CONSTRAINT `")? + "CONSTRAINT `".len();
    let len = message[start..].find('`')?;
    Some(message[start..start + len].to_string())
}

fn parse_subcategory(raw: &str) -> Result<RatingSubcategory, StoreError> {
    raw.parse()
        .map_err(|e: UnknownSubcategory| StoreError::Corrupt(e.to_string()))
}

#[derive(FromRow)]
struct BikeSummaryRow {
    numerical_id: i64,
    hash_id: Option<String>,
    is_electric: bool,
    creator_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    average_rating: Option<Decimal>,
}

impl From<BikeSummaryRow> for BikeSummary {
    fn from(row: BikeSummaryRow) -> Self {
        BikeSummary {
            bike: Bike {
                numerical_id: row.numerical_id,
                hash_id: row.hash_id,
                is_electric: row.is_electric,
                creator_id: row.creator_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            average_rating: row.average_rating,
        }
    }
}

#[derive(FromRow)]
struct ReviewRowRaw {
    review_id: i64,
    poster_id: Option<i64>,
    username: Option<String>,
    bike_numerical_id: i64,
    comment: Option<String>,
    bike_img: Option<String>,
    created_at: DateTime<Utc>,
    subcategory: Option<String>,
    score: Option<i16>,
}

impl TryFrom<ReviewRowRaw> for ReviewRow {
    type Error = StoreError;

    fn try_from(raw: ReviewRowRaw) -> Result<Self, Self::Error> {
        Ok(ReviewRow {
            review_id: raw.review_id,
            poster_id: raw.poster_id,
            username: raw.username,
            bike_numerical_id: raw.bike_numerical_id,
            comment: raw.comment,
            bike_img: raw.bike_img,
            created_at: raw.created_at,
            subcategory: raw.subcategory.as_deref().map(parse_subcategory).transpose()?,
            score: raw.score,
        })
    }
}

#[derive(FromRow)]
struct AggregateRow {
    bike_numerical_id: i64,
    subcategory: String,
    rating_sum: i64,
    rating_count: i64,
    average_rating: Decimal,
}

impl TryFrom<AggregateRow> for RatingAggregate {
    type Error = StoreError;

    fn try_from(row: AggregateRow) -> Result<Self, Self::Error> {
        Ok(RatingAggregate {
            bike_numerical_id: row.bike_numerical_id,
            subcategory: parse_subcategory(&row.subcategory)?,
            rating_sum: row.rating_sum,
            rating_count: row.rating_count,
            average_rating: row.average_rating,
        })
    }
}

#[derive(Clone)]
pub struct MySqlStore {
    pool: Pool<MySql>,
}

impl MySqlStore {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Datastore for MySqlStore {
    type Tx = MySqlTx;

    async fn begin(&self) -> Result<MySqlTx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(MySqlTx { tx })
    }

    async fn find_poster_by_api_token(&self, api_token: &str) -> Result<Option<Poster>, StoreError> {
        let sql = format!("SELECT {} FROM posters WHERE api_token = ?", POSTER_COLUMNS);
        let poster = sqlx::query_as::<_, Poster>(&sql)
            .bind(api_token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(poster)
    }

    async fn find_magic_link(&self, token: &str) -> Result<Option<MagicLink>, StoreError> {
        let sql = format!("SELECT {} FROM magic_links WHERE token = ?", MAGIC_LINK_COLUMNS);
        let link = sqlx::query_as::<_, MagicLink>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(link)
    }

    async fn record_issued_api_token(&self, magic_token: &str, api_token: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE magic_links SET api_token = ? WHERE token = ?")
            .bind(api_token)
            .bind(magic_token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn latest_review_at(&self, poster_id: i64, bike_id: i64) -> Result<Option<DateTime<Utc>>, StoreError> {
        let latest: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            SELECT created_at
            FROM reviews
            WHERE poster_id = ? AND bike_numerical_id = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(poster_id)
        .bind(bike_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(latest.map(|(at,)| at))
    }

    async fn list_review_rows(&self, scope: ReviewScope) -> Result<Vec<ReviewRow>, StoreError> {
        let rows = match scope {
            ReviewScope::All => {
                let sql = format!("{} {}", REVIEW_ROW_SELECT, REVIEW_ROW_ORDER);
                sqlx::query_as::<_, ReviewRowRaw>(&sql).fetch_all(&self.pool).await?
            }
            ReviewScope::Bike(bike_id) => {
                let sql = format!("{} WHERE r.bike_numerical_id = ? {}", REVIEW_ROW_SELECT, REVIEW_ROW_ORDER);
                sqlx::query_as::<_, ReviewRowRaw>(&sql)
                    .bind(bike_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            ReviewScope::Review(review_id) => {
                let sql = format!("{} WHERE r.review_id = ? {}", REVIEW_ROW_SELECT, REVIEW_ROW_ORDER);
                sqlx::query_as::<_, ReviewRowRaw>(&sql)
                    .bind(review_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(ReviewRow::try_from).collect()
    }

    async fn list_aggregates(&self, bike_id: Option<i64>) -> Result<Vec<RatingAggregate>, StoreError> {
        let rows = sqlx::query_as::<_, AggregateRow>(
            r#"
            SELECT bike_numerical_id, subcategory, rating_sum, rating_count, average_rating
            FROM rating_aggregates
            WHERE (? IS NULL OR bike_numerical_id = ?)
            ORDER BY bike_numerical_id, subcategory
            "#,
        )
        .bind(bike_id)
        .bind(bike_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RatingAggregate::try_from).collect()
    }

    async fn list_timed_scores(&self, bike_id: i64) -> Result<Vec<TimedScore>, StoreError> {
        let rows: Vec<(String, i16, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT rr.subcategory, rr.score, r.created_at
            FROM review_ratings rr
            JOIN reviews r ON r.review_id = rr.review_id
            WHERE r.bike_numerical_id = ?
            ORDER BY rr.subcategory
            "#,
        )
        .bind(bike_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(subcategory, score, created_at)| {
                Ok(TimedScore {
                    subcategory: parse_subcategory(&subcategory)?,
                    score,
                    created_at,
                })
            })
            .collect()
    }

    async fn list_bikes(&self) -> Result<Vec<BikeSummary>, StoreError> {
        let sql = format!("{} ORDER BY b.numerical_id", BIKE_SUMMARY_SELECT);
        let rows = sqlx::query_as::<_, BikeSummaryRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(BikeSummary::from).collect())
    }

    async fn find_bike(&self, bike_id: i64) -> Result<Option<BikeSummary>, StoreError> {
        let sql = format!("{} WHERE b.numerical_id = ?", BIKE_SUMMARY_SELECT);
        let row = sqlx::query_as::<_, BikeSummaryRow>(&sql)
            .bind(bike_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(BikeSummary::from))
    }
}

pub struct MySqlTx {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl StoreTx for MySqlTx {
    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn insert_poster(&mut self, poster: &NewPoster, now: DateTime<Utc>) -> Result<Poster, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO posters (email, username, email_verified, created_at)
            VALUES (?, ?, FALSE, ?)
            "#,
        )
        .bind(&poster.email)
        .bind(&poster.username)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        Ok(Poster {
            poster_id: result.last_insert_id() as i64,
            email: poster.email.clone(),
            username: poster.username.clone(),
            api_token: None,
            api_token_expires_at: None,
            email_verified: false,
            created_at: now,
        })
    }

    async fn find_poster(&mut self, identifier: &PosterIdentifier) -> Result<Option<Poster>, StoreError> {
        let (column, value) = match identifier {
            PosterIdentifier::Email(email) => ("email", email),
            PosterIdentifier::Username(username) => ("username", username),
        };
        let sql = format!("SELECT {} FROM posters WHERE {} = ?", POSTER_COLUMNS, column);
        let poster = sqlx::query_as::<_, Poster>(&sql)
            .bind(value)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(poster)
    }

    async fn lock_poster(&mut self, poster_id: i64) -> Result<Option<Poster>, StoreError> {
        let sql = format!("SELECT {} FROM posters WHERE poster_id = ? FOR UPDATE", POSTER_COLUMNS);
        let poster = sqlx::query_as::<_, Poster>(&sql)
            .bind(poster_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(poster)
    }

    async fn set_api_token(
        &mut self,
        poster_id: i64,
        api_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE posters SET api_token = ?, api_token_expires_at = ? WHERE poster_id = ?")
            .bind(api_token)
            .bind(expires_at)
            .bind(poster_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn mark_email_verified(&mut self, poster_id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE posters SET email_verified = TRUE WHERE poster_id = ?")
            .bind(poster_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_poster(&mut self, poster_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM posters WHERE poster_id = ?")
            .bind(poster_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_magic_links_since(&mut self, poster_id: i64, since: DateTime<Utc>) -> Result<i64, StoreError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM magic_links WHERE poster_id = ? AND created_at > ?")
                .bind(poster_id)
                .bind(since)
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(count)
    }

    async fn insert_magic_link(&mut self, link: &MagicLink) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO magic_links (token, poster_id, created_at, expires_at, consumed_at, api_token)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&link.token)
        .bind(link.poster_id)
        .bind(link.created_at)
        .bind(link.expires_at)
        .bind(link.consumed_at)
        .bind(&link.api_token)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn lock_magic_link(&mut self, token: &str) -> Result<Option<MagicLink>, StoreError> {
        let sql = format!("SELECT {} FROM magic_links WHERE token = ? FOR UPDATE", MAGIC_LINK_COLUMNS);
        let link = sqlx::query_as::<_, MagicLink>(&sql)
            .bind(token)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(link)
    }

    async fn mark_magic_link_consumed(&mut self, token: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE magic_links SET consumed_at = ? WHERE token = ?")
            .bind(at)
            .bind(token)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_magic_links_for_poster(&mut self, poster_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM magic_links WHERE poster_id = ?")
            .bind(poster_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_bike(
        &mut self,
        bike: &NewBike,
        creator_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO bikes (numerical_id, hash_id, is_electric, creator_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(bike.numerical_id)
        .bind(&bike.hash_id)
        .bind(bike.is_electric)
        .bind(creator_id)
        .bind(now)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_bike(&mut self, bike_id: i64, changes: &BikeChanges, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE bikes
            SET hash_id = COALESCE(?, hash_id),
                is_electric = COALESCE(?, is_electric),
                updated_at = ?
            WHERE numerical_id = ?
            "#,
        )
        .bind(&changes.hash_id)
        .bind(changes.is_electric)
        .bind(now)
        .bind(bike_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_bike(&mut self, bike_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM bikes WHERE numerical_id = ?")
            .bind(bike_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn bike_ids_created_by(&mut self, poster_id: i64) -> Result<Vec<i64>, StoreError> {
        let ids: Vec<(i64,)> =
            sqlx::query_as("SELECT numerical_id FROM bikes WHERE creator_id = ? ORDER BY numerical_id FOR SHARE")
                .bind(poster_id)
                .fetch_all(&mut *self.tx)
                .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn orphan_bikes(&mut self, poster_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE bikes SET creator_id = NULL WHERE creator_id = ?")
            .bind(poster_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_review(&mut self, review: &NewReview, now: DateTime<Utc>) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO reviews (poster_id, bike_numerical_id, comment, bike_img, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(review.poster_id)
        .bind(review.bike_numerical_id)
        .bind(&review.comment)
        .bind(&review.bike_img)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_id() as i64)
    }

    async fn find_owned_review_bike(&mut self, review_id: i64, poster_id: i64) -> Result<Option<i64>, StoreError> {
        let bike: Option<(i64,)> =
            sqlx::query_as("SELECT bike_numerical_id FROM reviews WHERE review_id = ? AND poster_id = ? FOR UPDATE")
                .bind(review_id)
                .bind(poster_id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(bike.map(|(id,)| id))
    }

    async fn update_review(
        &mut self,
        review_id: i64,
        comment: Option<&str>,
        bike_img: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE reviews
            SET comment = COALESCE(?, comment),
                bike_img = COALESCE(?, bike_img)
            WHERE review_id = ?
            "#,
        )
        .bind(comment)
        .bind(bike_img)
        .bind(review_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_review(&mut self, review_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM reviews WHERE review_id = ?")
            .bind(review_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_reviews_for_bike(&mut self, bike_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM reviews WHERE bike_numerical_id = ?")
            .bind(bike_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn bike_ids_reviewed_by(&mut self, poster_id: i64) -> Result<Vec<i64>, StoreError> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            "SELECT DISTINCT bike_numerical_id FROM reviews WHERE poster_id = ? ORDER BY bike_numerical_id FOR SHARE",
        )
        .bind(poster_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn delete_reviews_by_poster(&mut self, poster_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM reviews WHERE poster_id = ?")
            .bind(poster_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn orphan_reviews(&mut self, poster_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE reviews SET poster_id = NULL WHERE poster_id = ?")
            .bind(poster_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_rating(
        &mut self,
        review_id: i64,
        subcategory: RatingSubcategory,
        score: i16,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO review_ratings (review_id, subcategory, score) VALUES (?, ?, ?)")
            .bind(review_id)
            .bind(subcategory.as_str())
            .bind(score)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn upsert_rating(
        &mut self,
        review_id: i64,
        subcategory: RatingSubcategory,
        score: i16,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO review_ratings (review_id, subcategory, score)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE score = VALUES(score)
            "#,
        )
        .bind(review_id)
        .bind(subcategory.as_str())
        .bind(score)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_ratings_for_review(&mut self, review_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM review_ratings WHERE review_id = ?")
            .bind(review_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_ratings_for_bike(&mut self, bike_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE rr FROM review_ratings rr
            JOIN reviews r ON r.review_id = rr.review_id
            WHERE r.bike_numerical_id = ?
            "#,
        )
        .bind(bike_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_ratings_by_poster(&mut self, poster_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE rr FROM review_ratings rr
            JOIN reviews r ON r.review_id = rr.review_id
            WHERE r.poster_id = ?
            "#,
        )
        .bind(poster_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    // Locking read: a plain SELECT would use the snapshot taken by the
    // transaction's first read and miss ratings committed since.
    async fn scores_for_bike(&mut self, bike_id: i64) -> Result<Vec<(RatingSubcategory, i16)>, StoreError> {
        let rows: Vec<(String, i16)> = sqlx::query_as(
            r#"
            SELECT rr.subcategory, rr.score
            FROM review_ratings rr
            JOIN reviews r ON r.review_id = rr.review_id
            WHERE r.bike_numerical_id = ?
            FOR SHARE
            "#,
        )
        .bind(bike_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|(subcategory, score)| Ok((parse_subcategory(&subcategory)?, score)))
            .collect()
    }

    async fn delete_aggregates_for_bike(&mut self, bike_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM rating_aggregates WHERE bike_numerical_id = ?")
            .bind(bike_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_aggregate(&mut self, aggregate: &RatingAggregate) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO rating_aggregates
                (bike_numerical_id, subcategory, rating_sum, rating_count, average_rating)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(aggregate.bike_numerical_id)
        .bind(aggregate.subcategory.as_str())
        .bind(aggregate.rating_sum)
        .bind(aggregate.rating_count)
        .bind(aggregate.average_rating)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}

use sqlx::{mysql::MySqlPoolOptions, MySql, Pool};

use super::environment::Config;

pub type DbPool = Pool<MySql>;

/// Connects to MySQL and brings the schema up to date.
pub async fn init_db(config: &Config) -> Result<DbPool, sqlx::Error> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

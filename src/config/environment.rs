use std::env;
use std::time::Duration;

/// Environment configuration
/// Loads and validates environment variables
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub deadlines: Deadlines,
    pub email: EmailConfig,
}

/// Upper bounds on how long each class of operation may hold a transaction open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    pub auth: Duration,
    pub confirm: Duration,
    pub verify: Duration,
    pub review_write: Duration,
    /// Bike catalogue create, update and delete.
    pub bike_write: Duration,
    pub read: Duration,
    pub poster_delete: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            auth: Duration::from_secs(5),
            confirm: Duration::from_secs(5),
            verify: Duration::from_secs(3),
            review_write: Duration::from_secs(5),
            bike_write: Duration::from_secs(5),
            read: Duration::from_secs(3),
            poster_delete: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Mailtrap API token; `None` selects the no-op sender.
    pub mailtrap_token: Option<String>,
    pub from_address: String,
    pub from_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            mailtrap_token: None,
            from_address: "hello@rottenbik.es".to_string(),
            from_name: "RottenBikes".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let database_max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse::<u32>()
                .map_err(|_| format!("DATABASE_MAX_CONNECTIONS must be a positive integer, got {}", raw))?,
            Err(_) => 10,
        };

        let defaults = Deadlines::default();
        let deadlines = Deadlines {
            auth: deadline_from_env("DEADLINE_AUTH_MS", defaults.auth)?,
            confirm: deadline_from_env("DEADLINE_CONFIRM_MS", defaults.confirm)?,
            verify: deadline_from_env("DEADLINE_VERIFY_MS", defaults.verify)?,
            review_write: deadline_from_env("DEADLINE_REVIEW_WRITE_MS", defaults.review_write)?,
            bike_write: deadline_from_env("DEADLINE_BIKE_WRITE_MS", defaults.bike_write)?,
            read: deadline_from_env("DEADLINE_READ_MS", defaults.read)?,
            poster_delete: deadline_from_env("DEADLINE_POSTER_DELETE_MS", defaults.poster_delete)?,
        };

        let email_defaults = EmailConfig::default();
        let email = EmailConfig {
            mailtrap_token: env::var("EMAIL_SENDER_TOKEN_MAILTRAP")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            from_address: env::var("EMAIL_FROM_ADDRESS").unwrap_or(email_defaults.from_address),
            from_name: env::var("EMAIL_FROM_NAME").unwrap_or(email_defaults.from_name),
        };

        Ok(Self {
            database_url,
            database_max_connections,
            deadlines,
            email,
        })
    }
}

fn deadline_from_env(key: &str, default: Duration) -> Result<Duration, String> {
    match env::var(key) {
        Ok(raw) => parse_millis(&raw).ok_or_else(|| format!("{} must be a positive number of milliseconds, got {}", key, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_millis(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(ms) => Some(Duration::from_millis(ms)),
    }
}

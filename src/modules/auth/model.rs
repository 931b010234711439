use chrono::{DateTime, Duration, Months, Utc};
use sqlx::FromRow;

/// Lifetime of a magic link from the moment it is issued.
pub const MAGIC_LINK_TTL: Duration = Duration::minutes(30);

/// Magic links a poster may request per trailing window.
pub const DAILY_MAGIC_LINK_LIMIT: i64 = 2;
pub const MAGIC_LINK_LIMIT_WINDOW: Duration = Duration::hours(24);

const API_TOKEN_TTL_MONTHS: u32 = 2;

/// Expiry for an API token issued or refreshed at `now`.
pub fn api_token_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(API_TOKEN_TTL_MONTHS))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Poster {
    pub poster_id: i64,
    pub email: String,
    pub username: String,
    pub api_token: Option<String>,
    pub api_token_expires_at: Option<DateTime<Utc>>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl Poster {
    pub fn token_state(&self, now: DateTime<Utc>) -> ApiTokenState {
        match (self.api_token.as_deref(), self.api_token_expires_at) {
            (None, _) | (Some(""), _) => ApiTokenState::NoToken,
            (Some(token), Some(expires_at)) if expires_at > now => ApiTokenState::Active {
                token: token.to_string(),
                expires_at,
            },
            _ => ApiTokenState::Expired,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPoster {
    pub email: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiTokenState {
    NoToken,
    Active {
        token: String,
        expires_at: DateTime<Utc>,
    },
    Expired,
}

/// How a caller names a poster when asking for a magic link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PosterIdentifier {
    Email(String),
    Username(String),
}

impl PosterIdentifier {
    /// Anything containing `@` is an email address; everything else is a username.
    /// The input is matched as given, surrounding whitespace included.
    pub fn parse(raw: &str) -> Self {
        if raw.contains('@') {
            Self::Email(raw.to_string())
        } else {
            Self::Username(raw.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MagicLink {
    pub token: String,
    pub poster_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub api_token: Option<String>,
}

impl MagicLink {
    pub fn issue(token: String, poster_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            token,
            poster_id,
            created_at: now,
            expires_at: now + MAGIC_LINK_TTL,
            consumed_at: None,
            api_token: None,
        }
    }

    pub fn state(&self, now: DateTime<Utc>) -> MagicLinkState {
        if self.consumed_at.is_some() {
            MagicLinkState::Consumed
        } else if now > self.expires_at {
            MagicLinkState::Expired
        } else {
            MagicLinkState::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicLinkState {
    Pending,
    Consumed,
    Expired,
}

/// What happens to a poster's bikes and reviews when the poster is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionStrategy {
    /// Remove the poster's reviews and ratings and the bikes they created.
    PurgeContent,
    /// Keep the content but detach it from the poster.
    OrphanContent,
}

impl DeletionStrategy {
    pub fn from_flag(delete_content: bool) -> Self {
        if delete_content {
            Self::PurgeContent
        } else {
            Self::OrphanContent
        }
    }
}

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::db::{constraints, Datastore, StoreError, StoreTx};
use crate::modules::auth::interface::AuthError;
use crate::modules::auth::model::{
    api_token_expiry, ApiTokenState, MagicLink, MagicLinkState, NewPoster, Poster, PosterIdentifier,
    DAILY_MAGIC_LINK_LIMIT, MAGIC_LINK_LIMIT_WINDOW,
};
use crate::modules::auth::schema::{ConfirmResult, MagicLinkIssued, RegisterInput};
use crate::services::deadline::with_deadline;
use crate::services::token::random_token;
use crate::AppState;

/// Registration, magic-link issuance and confirmation.
pub struct AuthCrud<'a, S: Datastore> {
    state: &'a AppState<S>,
}

fn validate_registration(input: &RegisterInput) -> Result<(), AuthError> {
    match input.validate() {
        Ok(()) => Ok(()),
        Err(errors) if errors.field_errors().contains_key("email") => Err(AuthError::InvalidEmail),
        Err(_) => Err(AuthError::InvalidUsername),
    }
}

fn poster_conflict(err: StoreError) -> AuthError {
    if err.is_unique_violation(constraints::POSTERS_EMAIL) {
        AuthError::EmailAlreadyExists
    } else if err.is_unique_violation(constraints::POSTERS_USERNAME) {
        AuthError::UsernameAlreadyExists
    } else {
        AuthError::Store(err)
    }
}

/// Ensures the poster holds an API token valid for two more months, then
/// stores a new pending magic link and returns its token.
///
/// An active token keeps its value; a missing or expired one is replaced.
async fn issue_magic_link<T: StoreTx>(tx: &mut T, poster: &Poster, now: DateTime<Utc>) -> Result<String, StoreError> {
    let api_token = match poster.token_state(now) {
        ApiTokenState::Active { token, .. } => token,
        ApiTokenState::NoToken | ApiTokenState::Expired => random_token(),
    };
    tx.set_api_token(poster.poster_id, &api_token, api_token_expiry(now))
        .await?;

    let link = MagicLink::issue(random_token(), poster.poster_id, now);
    tx.insert_magic_link(&link).await?;
    Ok(link.token)
}

impl<'a, S: Datastore> AuthCrud<'a, S> {
    pub fn new(state: &'a AppState<S>) -> Self {
        Self { state }
    }

    pub async fn register(&self, input: RegisterInput) -> Result<MagicLinkIssued, AuthError> {
        validate_registration(&input)?;
        with_deadline("register", self.state.deadlines.auth, self.register_poster(input)).await
    }

    async fn register_poster(&self, input: RegisterInput) -> Result<MagicLinkIssued, AuthError> {
        let now = self.state.now();
        let mut tx = self.state.store.begin().await?;

        let poster = tx
            .insert_poster(
                &NewPoster {
                    email: input.email,
                    username: input.username,
                },
                now,
            )
            .await
            .map_err(poster_conflict)?;

        let magic_token = issue_magic_link(&mut tx, &poster, now).await?;
        tx.commit().await?;

        tracing::info!(poster_id = poster.poster_id, "poster registered, magic link issued");
        Ok(MagicLinkIssued {
            magic_token,
            email: poster.email,
        })
    }

    /// Issues a magic link for the poster named by `identifier` (email or username).
    pub async fn create_magic_link(&self, identifier: &str) -> Result<MagicLinkIssued, AuthError> {
        let identifier = PosterIdentifier::parse(identifier);
        with_deadline("create_magic_link", self.state.deadlines.auth, self.create_link(identifier)).await
    }

    async fn create_link(&self, identifier: PosterIdentifier) -> Result<MagicLinkIssued, AuthError> {
        let now = self.state.now();
        let mut tx = self.state.store.begin().await?;

        let poster = tx
            .find_poster(&identifier)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        // Unlocked count: two concurrent requests may both pass.
        let recent = tx
            .count_magic_links_since(poster.poster_id, now - MAGIC_LINK_LIMIT_WINDOW)
            .await?;
        if recent >= DAILY_MAGIC_LINK_LIMIT {
            tracing::warn!(poster_id = poster.poster_id, recent, "magic link rate limit reached");
            return Err(AuthError::RateLimitExceeded);
        }

        let magic_token = issue_magic_link(&mut tx, &poster, now).await?;
        tx.commit().await?;

        tracing::info!(poster_id = poster.poster_id, "magic link issued");
        Ok(MagicLinkIssued {
            magic_token,
            email: poster.email,
        })
    }

    /// Redeems a pending magic link, verifying the poster's email and returning
    /// a valid API token. A link can be redeemed once.
    pub async fn confirm_magic_link(&self, token: &str) -> Result<ConfirmResult, AuthError> {
        let result = with_deadline("confirm_magic_link", self.state.deadlines.confirm, self.confirm(token)).await?;

        // Outside the transaction; pollers see "" until this lands.
        if let Err(e) = self
            .state
            .store
            .record_issued_api_token(token, &result.api_token)
            .await
        {
            tracing::warn!(error = %e, "failed to record issued api token on magic link");
        }

        Ok(result)
    }

    async fn confirm(&self, token: &str) -> Result<ConfirmResult, AuthError> {
        let now = self.state.now();
        let mut tx = self.state.store.begin().await?;

        let link = tx
            .lock_magic_link(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if link.state(now) != MagicLinkState::Pending {
            tracing::warn!(poster_id = link.poster_id, "rejected expired or used magic link");
            return Err(AuthError::TokenExpiredOrUsed);
        }

        let poster = tx
            .lock_poster(link.poster_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let (api_token, api_token_expires_at) = match poster.token_state(now) {
            ApiTokenState::Active { token, expires_at } => (token, expires_at),
            ApiTokenState::NoToken | ApiTokenState::Expired => {
                let fresh = random_token();
                let expires_at = api_token_expiry(now);
                tx.set_api_token(poster.poster_id, &fresh, expires_at).await?;
                (fresh, expires_at)
            }
        };

        tx.mark_email_verified(poster.poster_id).await?;
        tx.mark_magic_link_consumed(token, now).await?;
        tx.commit().await?;

        tracing::info!(poster_id = poster.poster_id, "magic link confirmed");
        Ok(ConfirmResult {
            api_token,
            email: poster.email,
            api_token_expires_at,
        })
    }
}

use crate::db::Datastore;
use crate::modules::auth::interface::AuthError;
use crate::modules::auth::schema::AuthPoster;
use crate::services::deadline::with_deadline;
use crate::AppState;

/// Read-only checks on API tokens and magic-link status.
pub struct TokenVerifier<'a, S: Datastore> {
    state: &'a AppState<S>,
}

impl<'a, S: Datastore> TokenVerifier<'a, S> {
    pub fn new(state: &'a AppState<S>) -> Self {
        Self { state }
    }

    /// Resolves a bearer token to its poster.
    ///
    /// Fails with `InvalidToken` for unknown tokens, `EmailNotVerified` before the
    /// first confirmation, and `TokenExpired` once the expiry has passed.
    pub async fn get_poster_by_api_token(&self, token: &str) -> Result<AuthPoster, AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let lookup = self.state.store.find_poster_by_api_token(token);
        let poster = with_deadline("get_poster_by_api_token", self.state.deadlines.verify, async {
            lookup.await.map_err(AuthError::from)
        })
        .await?
        .ok_or(AuthError::InvalidToken)?;

        if !poster.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        match poster.api_token_expires_at {
            Some(expires_at) if self.state.now() <= expires_at => {}
            _ => return Err(AuthError::TokenExpired),
        }

        Ok(AuthPoster {
            poster_id: poster.poster_id,
            email: poster.email,
            username: poster.username,
        })
    }

    /// The API token issued for a confirmed link, or `""` while the link is
    /// unknown, pending, or its token has not been recorded yet.
    pub async fn check_magic_link_status(&self, token: &str) -> Result<String, AuthError> {
        let lookup = self.state.store.find_magic_link(token);
        let link = with_deadline("check_magic_link_status", self.state.deadlines.read, async {
            lookup.await.map_err(AuthError::from)
        })
        .await?;

        Ok(link
            .filter(|link| link.consumed_at.is_some())
            .and_then(|link| link.api_token)
            .unwrap_or_default())
    }
}

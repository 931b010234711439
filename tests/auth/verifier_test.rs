use chrono::Duration;
use rottenbikes::db::{Datastore, StoreTx};
use rottenbikes::modules::auth::model::PosterIdentifier;
use rottenbikes::modules::auth::AuthError;

use crate::common::TestContext;

/// Reads the token stored for a poster that has not confirmed yet.
async fn pending_api_token(ctx: &TestContext, email: &str) -> String {
    let mut tx = ctx.store.begin().await.unwrap();
    let poster = tx
        .find_poster(&PosterIdentifier::Email(email.to_string()))
        .await
        .unwrap()
        .expect("poster should exist");
    poster.api_token.expect("registration should set an api token")
}

#[tokio::test]
async fn verified_poster_resolves_from_api_token() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;

    let resolved = ctx.verifier().get_poster_by_api_token(&poster.api_token).await.unwrap();

    assert_eq!(resolved, poster.poster);
}

#[tokio::test]
async fn unverified_poster_is_rejected_until_confirmed() {
    let ctx = TestContext::new().await;
    let (input, issued) = ctx.register().await;
    let token = pending_api_token(&ctx, &input.email).await;

    let before = ctx.verifier().get_poster_by_api_token(&token).await;
    assert!(matches!(before, Err(AuthError::EmailNotVerified)));

    ctx.auth().confirm_magic_link(&issued.magic_token).await.unwrap();

    let after = ctx.verifier().get_poster_by_api_token(&token).await.unwrap();
    assert_eq!(after.email, input.email);
    assert_eq!(after.username, input.username);
}

#[tokio::test]
async fn unknown_or_empty_token_is_invalid() {
    let ctx = TestContext::new().await;
    ctx.register_verified_poster().await;

    let empty = ctx.verifier().get_poster_by_api_token("").await;
    assert!(matches!(empty, Err(AuthError::InvalidToken)));

    let unknown = ctx.verifier().get_poster_by_api_token("not-a-token").await;
    assert!(matches!(unknown, Err(AuthError::InvalidToken)));
}

#[tokio::test]
async fn expired_api_token_is_rejected() {
    let ctx = TestContext::new().await;
    let poster = ctx.register_verified_poster().await;

    ctx.advance(Duration::days(62));
    let result = ctx.verifier().get_poster_by_api_token(&poster.api_token).await;

    assert!(matches!(result, Err(AuthError::TokenExpired)));
}

#[tokio::test]
async fn magic_link_status_for_unknown_link_is_empty() {
    let ctx = TestContext::new().await;

    let status = ctx.verifier().check_magic_link_status("missing").await.unwrap();

    assert_eq!(status, "");
}

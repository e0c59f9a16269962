use crate::core::security::{generate_session_token, hash_session_token};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::repositories;

/// Creates a login session for `user_id` and returns the raw cookie token.
pub(crate) async fn issue(state: &AppState, user_id: &str) -> Result<String, sqlx::Error> {
    let now = primitive_now_utc();
    let max_age = state.settings().session().max_age();
    let token = generate_session_token();
    let token_hash = hash_session_token(&token);

    let purged = repositories::sessions::delete_expired_for_user(state.db(), user_id, now).await?;
    if purged > 0 {
        tracing::debug!(user_id, purged, "Removed expired sessions");
    }

    repositories::sessions::create(
        state.db(),
        repositories::sessions::CreateSession {
            token_hash: &token_hash,
            user_id,
            created_at: now,
            expires_at: now.saturating_add(max_age),
        },
    )
    .await?;

    Ok(token)
}

/// Looks up the user behind a cookie token. Expired sessions are removed.
pub(crate) async fn resolve(state: &AppState, token: &str) -> Result<Option<User>, sqlx::Error> {
    let token_hash = hash_session_token(token);
    let Some(session) =
        repositories::sessions::find_by_token_hash(state.db(), &token_hash).await?
    else {
        return Ok(None);
    };

    if session.expires_at <= primitive_now_utc() {
        repositories::sessions::delete(state.db(), &session.token_hash).await?;
        tracing::debug!(user_id = %session.user_id, "Session expired");
        return Ok(None);
    }

    repositories::users::find_by_id(state.db(), &session.user_id).await
}

pub(crate) async fn revoke(state: &AppState, token: &str) -> Result<(), sqlx::Error> {
    repositories::sessions::delete(state.db(), &hash_session_token(token)).await
}

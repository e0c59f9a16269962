use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

use crate::api::cookies;
use crate::api::errors::ApiError;
use crate::api::htmx::is_htmx;
use crate::core::state::AppState;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::services::auth_sessions;

pub(crate) struct CurrentUser(pub(crate) User);
pub(crate) struct CurrentTeacher(pub(crate) User);
pub(crate) struct CurrentStudent(pub(crate) User);

/// The logged-in user when there is one. Never rejects on a missing session.
pub(crate) struct MaybeUser(pub(crate) Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let htmx = is_htmx(&parts.headers);
        let jar = CookieJar::from_headers(&parts.headers);

        let Some(token) = cookies::session_token(&jar, state.settings()) else {
            return Err(ApiError::LoginRequired { htmx, clear_cookie: None });
        };

        let user = auth_sessions::resolve(state, &token)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to resolve session"))?;

        match user {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(ApiError::LoginRequired {
                htmx,
                clear_cookie: Some(state.settings().session().cookie_name.clone()),
            }),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = require_role(parts, state, UserRole::Teacher).await?;
        Ok(CurrentTeacher(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = require_role(parts, state, UserRole::Student).await?;
        Ok(CurrentStudent(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(CurrentUser(user)) => Ok(MaybeUser(Some(user))),
            Err(ApiError::LoginRequired { .. }) => Ok(MaybeUser(None)),
            Err(err) => Err(err),
        }
    }
}

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    role: UserRole,
) -> Result<User, ApiError> {
    let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

    if user.role == role {
        Ok(user)
    } else {
        tracing::debug!(user_id = %user.id, required = role.as_str(), "Role mismatch");
        Err(ApiError::WrongRole { role: user.role, htmx: is_htmx(&parts.headers) })
    }
}

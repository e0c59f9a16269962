use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use axum_extra::extract::cookie::CookieJar;

use crate::api::cookies;
use crate::api::errors::ApiError;
use crate::api::guards::MaybeUser;
use crate::api::htmx::{is_htmx, redirect_to};
use crate::api::views::{render, FormErrorTemplate, LoginTemplate, Nav};
use crate::core::{security, state::AppState};
use crate::repositories;
use crate::schemas::user::LoginForm;
use crate::services::auth_sessions;

const LOGIN_RATE_LIMIT: u64 = 10;
const LOGIN_RATE_WINDOW_SECONDS: u64 = 60;
const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/login", get(login_page).post(login)).route("/logout", post(logout))
}

async fn login_page(MaybeUser(user): MaybeUser, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(user) = user {
        return Ok(redirect_to(user.role.dashboard_path(), is_htmx(&headers)));
    }
    Ok(render(&LoginTemplate { nav: Nav::guest() })?.into_response())
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let email = form.normalized_email();

    let rate_key = format!("rl:login:{email}");
    let allowed = state
        .redis()
        .rate_limit(&rate_key, LOGIN_RATE_LIMIT, LOGIN_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let user = repositories::users::find_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?;

    let Some(user) = user else {
        tracing::info!("Login rejected for unknown email");
        return form_error(INVALID_CREDENTIALS);
    };

    let verified = security::verify_password(&form.password, &user.hashed_password)
        .map_err(|e| ApiError::internal(e, "Failed to verify password"))?;
    if !verified {
        tracing::info!(user_id = %user.id, "Login rejected for wrong password");
        return form_error(INVALID_CREDENTIALS);
    }

    let token = auth_sessions::issue(&state, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create session"))?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User logged in");

    let jar = jar.add(cookies::session_cookie(state.settings(), token));
    Ok((jar, redirect_to(user.role.dashboard_path(), is_htmx(&headers))).into_response())
}

async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = cookies::session_token(&jar, state.settings()) {
        auth_sessions::revoke(&state, &token)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to delete session"))?;
    }

    let jar = jar
        .remove(cookies::removal(state.settings().session().cookie_name.clone()))
        .remove(cookies::removal(cookies::ATTEMPT_COOKIE));
    Ok((jar, redirect_to("/login", is_htmx(&headers))).into_response())
}

pub(crate) fn form_error(message: impl Into<String>) -> Result<Response, ApiError> {
    Ok(render(&FormErrorTemplate { message: message.into() })?.into_response())
}

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use uuid::Uuid;
use validator::Validate;

use crate::api::auth::form_error;
use crate::api::errors::ApiError;
use crate::api::guards::MaybeUser;
use crate::api::htmx::{is_htmx, redirect_to};
use crate::api::views::{render, Nav, RegisterSuccessTemplate, RegisterTemplate};
use crate::core::{security, state::AppState, time::primitive_now_utc};
use crate::repositories;
use crate::schemas::first_validation_message;
use crate::schemas::user::RegisterForm;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/register", get(register_page).post(register))
}

async fn register_page(
    MaybeUser(user): MaybeUser,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(user) = user {
        return Ok(redirect_to(user.role.dashboard_path(), is_htmx(&headers)));
    }
    Ok(render(&RegisterTemplate { nav: Nav::guest() })?.into_response())
}

async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, ApiError> {
    let form = form.normalized();
    if let Err(errors) = form.validate() {
        return form_error(first_validation_message(&errors));
    }
    let Some(role) = form.parsed_role() else {
        return form_error("Please choose whether you are a teacher or a student");
    };

    let existing = repositories::users::find_by_email(state.db(), &form.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if existing.is_some() {
        return form_error("An account with this email already exists");
    }

    let hashed_password = security::hash_password(&form.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let now = primitive_now_utc();
    let user_id = Uuid::new_v4().to_string();
    let created = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &user_id,
            email: &form.email,
            full_name: &form.full_name,
            hashed_password,
            role,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?;

    // Lost a race with a concurrent registration for the same email.
    let Some(user) = created else {
        return form_error("An account with this email already exists");
    };

    tracing::info!(user_id = %user.id, role = role.as_str(), "User registered");

    let page = RegisterSuccessTemplate { full_name: user.full_name, role_label: role.label() };
    Ok((StatusCode::CREATED, render(&page)?).into_response())
}

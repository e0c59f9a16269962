use askama::Template;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use crate::api::cookies;
use crate::api::htmx::{redirect_to, HX_RETARGET};
use crate::api::views::{ErrorTemplate, Nav};
use crate::db::types::UserRole;
use crate::services::ServiceError;

#[derive(Debug)]
pub(crate) enum ApiError {
    /// Not logged in. `clear_cookie` names a stale session cookie to drop.
    LoginRequired { htmx: bool, clear_cookie: Option<String> },
    /// Logged in with the other role; sent back to their own dashboard.
    WrongRole { role: UserRole, htmx: bool },
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(message) => Self::NotFound(message),
            ServiceError::Forbidden(message) => Self::Forbidden(message),
            ServiceError::Invalid(message) => Self::BadRequest(message),
            ServiceError::Conflict(message) => Self::Conflict(message),
            ServiceError::Upstream { service, source } => {
                tracing::error!(service, error = %format!("{source:#}"), "Upstream service failed");
                Self::BadGateway(format!(
                    "The {service} service is unavailable right now. Please try again later."
                ))
            }
            ServiceError::Database(err) => Self::internal(err, "Database operation failed"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::LoginRequired { htmx, clear_cookie } => {
                let mut response = redirect_to("/login", htmx);
                if let Some(name) = clear_cookie {
                    if let Ok(value) = HeaderValue::from_str(&cookies::removal(name).to_string()) {
                        response.headers_mut().append(header::SET_COOKIE, value);
                    }
                }
                return response;
            }
            ApiError::WrongRole { role, htmx } => return redirect_to(role.dashboard_path(), htmx),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.to_string()),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::TooManyRequests(message) => {
                (StatusCode::TOO_MANY_REQUESTS, message.to_string())
            }
            ApiError::BadGateway(message) => (StatusCode::BAD_GATEWAY, message),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong on our side".to_string())
            }
        };

        error_page(status, message)
    }
}

fn error_page(status: StatusCode, message: String) -> Response {
    let page = ErrorTemplate {
        nav: Nav::guest(),
        status_code: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("Error").to_string(),
        message,
    };

    let body = match page.render() {
        Ok(html) => Html(html),
        Err(err) => {
            tracing::error!(error = %err, "Failed to render error page");
            Html(format!("<h1>{}</h1>", status.as_u16()))
        }
    };

    (status, [(HX_RETARGET, HeaderValue::from_static("body"))], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn not_found_renders_html_page() {
        let response = ApiError::NotFound("Exam not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[HX_RETARGET], "body");

        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let html = String::from_utf8_lossy(&body);
        assert!(html.contains("404"), "body: {html}");
        assert!(html.contains("Exam not found"), "body: {html}");
    }

    #[test]
    fn login_required_clears_stale_cookie() {
        let response = ApiError::LoginRequired {
            htmx: false,
            clear_cookie: Some("saygenfix_session".to_string()),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
        let cookie = response.headers()[header::SET_COOKIE].to_str().expect("cookie");
        assert!(cookie.starts_with("saygenfix_session="));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn upstream_failures_become_bad_gateway() {
        let err = ApiError::from(ServiceError::Upstream {
            service: "scoring",
            source: anyhow::anyhow!("connection refused"),
        });
        assert!(matches!(err, ApiError::BadGateway(message) if message.contains("scoring")));
    }
}

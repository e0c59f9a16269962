use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

pub(crate) const HX_REQUEST: HeaderName = HeaderName::from_static("hx-request");
pub(crate) const HX_REDIRECT: HeaderName = HeaderName::from_static("hx-redirect");
pub(crate) const HX_RETARGET: HeaderName = HeaderName::from_static("hx-retarget");

pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get(HX_REQUEST)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

/// HTMX clients get `200` with `HX-Redirect`, everything else a `303`.
pub(crate) fn redirect_to(location: &str, htmx: bool) -> Response {
    let Ok(value) = HeaderValue::from_str(location) else {
        tracing::error!(location, "Refusing to redirect to an invalid location");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    if htmx {
        (StatusCode::OK, [(HX_REDIRECT, value)]).into_response()
    } else {
        (StatusCode::SEE_OTHER, [(header::LOCATION, value)]).into_response()
    }
}

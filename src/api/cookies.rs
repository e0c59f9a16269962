use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::core::config::Settings;

pub(crate) const ATTEMPT_COOKIE: &str = "exam_attempt_id";

pub(crate) fn session_cookie(settings: &Settings, token: String) -> Cookie<'static> {
    let session = settings.session();
    Cookie::build((session.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(session.cookie_secure)
        .max_age(session.max_age())
        .build()
}

pub(crate) fn attempt_cookie(settings: &Settings, attempt_id: String) -> Cookie<'static> {
    Cookie::build((ATTEMPT_COOKIE, attempt_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.session().cookie_secure)
        .max_age(settings.exam().attempt_cookie_max_age())
        .build()
}

/// A cookie that makes the browser drop `name` for the whole site.
pub(crate) fn removal(name: impl Into<String>) -> Cookie<'static> {
    Cookie::build((name.into(), "")).path("/").max_age(Duration::ZERO).build()
}

pub(crate) fn session_token(jar: &CookieJar, settings: &Settings) -> Option<String> {
    non_empty(jar, &settings.session().cookie_name)
}

pub(crate) fn attempt_id(jar: &CookieJar) -> Option<String> {
    non_empty(jar, ATTEMPT_COOKIE)
}

fn non_empty(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name).map(|cookie| cookie.value().trim().to_string()).filter(|value| !value.is_empty())
}

pub(crate) mod auth;
pub(crate) mod cookies;
pub(crate) mod errors;
pub(crate) mod forms;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod htmx;
pub(crate) mod router;
pub(crate) mod student;
pub(crate) mod teacher;
pub(crate) mod users;
pub(crate) mod views;

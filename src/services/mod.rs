use thiserror::Error;

pub(crate) mod auth_sessions;
pub(crate) mod exam_attempts;
pub(crate) mod exam_authoring;
pub(crate) mod exam_codes;
pub(crate) mod qa_generation;
pub(crate) mod results;
pub(crate) mod scoring;

#[derive(Debug, Error)]
pub(crate) enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{service} request failed: {source:#}")]
    Upstream { service: &'static str, source: anyhow::Error },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

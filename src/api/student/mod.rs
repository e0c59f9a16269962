use axum::routing::{get, post};
use axum::Router;

use crate::core::state::AppState;

mod results;
mod taking;

#[cfg(test)]
mod tests;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(taking::dashboard))
        .route("/take-exam/:exam_id", get(taking::take_exam))
        .route("/question/:exam_id/:number", get(taking::question))
        .route("/submit-exam/:exam_id", post(taking::submit_exam))
        .route("/exam-result", get(results::score_list))
        .route("/exam-result/:exam_id", get(results::exam_result))
}

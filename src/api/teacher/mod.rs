use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;

use crate::core::state::AppState;

mod exams;
mod review;


/// Multipart overhead allowed on top of the PDF itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub(crate) fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(exams::dashboard))
        .route("/upload", get(exams::upload_page))
        .route(
            "/generate-and-create-exam",
            post(exams::create_exam)
                .layer(DefaultBodyLimit::max(max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES))),
        )
        .route("/toggle-exam/:exam_id", put(exams::toggle_exam))
        .route("/check-exam/:exam_id", get(review::check_exam))
        .route("/edit-exam/:exam_id", get(review::edit_exam_page).post(review::edit_exam))
        .route("/exam-result/:student_id", get(review::student_result))
}

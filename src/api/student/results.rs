use axum::extract::{Path, State};
use axum::response::Html;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::api::views::{
    render, Nav, ResultView, ScoreListTemplate, ScoreRowView, StudentExamResultTemplate,
};
use crate::core::state::AppState;
use crate::repositories;
use crate::services::results;

pub(super) async fn exam_result(
    State(state): State<AppState>,
    CurrentStudent(student): CurrentStudent,
    Path(exam_id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let result = results::best_result_for_exam(&state, &exam_id, &student.id).await?;

    render(&StudentExamResultTemplate {
        nav: Nav::for_user(&student),
        result: ResultView::from(&result),
    })
}

pub(super) async fn score_list(
    State(state): State<AppState>,
    CurrentStudent(student): CurrentStudent,
) -> Result<Html<String>, ApiError> {
    let rows = repositories::attempts::list_best_per_exam(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load scores"))?;

    render(&ScoreListTemplate {
        nav: Nav::for_user(&student),
        scores: rows.into_iter().map(ScoreRowView::from).collect(),
    })
}

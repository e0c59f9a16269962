use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;

use crate::api::cookies;
use crate::api::errors::ApiError;
use crate::api::forms::answers_from_pairs;
use crate::api::guards::CurrentStudent;
use crate::api::htmx::{is_htmx, redirect_to};
use crate::api::views::{
    render, AvailableExamView, Nav, QuestionPageView, QuestionPartialTemplate,
    StudentDashboardTemplate, TakeExamTemplate,
};
use crate::core::state::AppState;
use crate::repositories;
use crate::services::exam_attempts;

pub(super) async fn dashboard(
    State(state): State<AppState>,
    CurrentStudent(student): CurrentStudent,
) -> Result<Html<String>, ApiError> {
    let exams = repositories::exams::list_active_with_teacher(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list active exams"))?;

    render(&StudentDashboardTemplate {
        nav: Nav::for_user(&student),
        exams: exams.into_iter().map(AvailableExamView::from).collect(),
    })
}

pub(super) async fn take_exam(
    State(state): State<AppState>,
    CurrentStudent(student): CurrentStudent,
    Path(exam_id): Path<String>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let active = exam_attempts::start_attempt(&state, &student.id, &exam_id).await?;
    let saved = exam_attempts::saved_answers(&state, &active.attempt.id).await?;

    let page = QuestionPageView::build(&active, 1, &saved)
        .ok_or_else(|| ApiError::NotFound("This exam has no questions".to_string()))?;

    let jar = jar.add(cookies::attempt_cookie(state.settings(), active.attempt.id.clone()));
    let html = render(&TakeExamTemplate { nav: Nav::for_user(&student), page })?;
    Ok((jar, html).into_response())
}

pub(super) async fn question(
    State(state): State<AppState>,
    CurrentStudent(student): CurrentStudent,
    Path((exam_id, number)): Path<(String, String)>,
    Query(pairs): Query<Vec<(String, String)>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Html<String>, ApiError> {
    let attempt_id = cookies::attempt_id(&jar)
        .ok_or(ApiError::Unauthorized("No exam attempt in progress. Start the exam again."))?;

    let number: usize = number
        .parse()
        .map_err(|_| ApiError::NotFound("Question not found".to_string()))?;

    let active =
        exam_attempts::load_active_attempt(&state, &student.id, &exam_id, &attempt_id).await?;
    let answers = answers_from_pairs(&pairs);
    let page = QuestionPageView::build(&active, number, &answers)
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    if is_htmx(&headers) {
        render(&QuestionPartialTemplate { page })
    } else {
        render(&TakeExamTemplate { nav: Nav::for_user(&student), page })
    }
}

pub(super) async fn submit_exam(
    State(state): State<AppState>,
    CurrentStudent(student): CurrentStudent,
    Path(exam_id): Path<String>,
    jar: CookieJar,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let attempt_id = cookies::attempt_id(&jar)
        .ok_or(ApiError::Unauthorized("No exam attempt in progress. Start the exam again."))?;

    let answers = answers_from_pairs(&pairs);
    exam_attempts::submit_attempt(&state, &student.id, &exam_id, &attempt_id, &answers).await?;

    let jar = jar.remove(cookies::removal(cookies::ATTEMPT_COOKIE));
    let location = format!("/student/exam-result/{exam_id}");
    Ok((jar, redirect_to(&location, is_htmx(&headers))).into_response())
}

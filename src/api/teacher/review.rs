use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, Response};
use axum::Form;
use serde::Deserialize;

use crate::api::auth::form_error;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::htmx::{is_htmx, redirect_to};
use crate::api::views::{
    render, CheckExamTemplate, EditExamTemplate, ExamCardView, Nav, QuestionEditView, ResultView,
    StudentScoreView, TeacherStudentResultTemplate,
};
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::exam::parse_exam_edit;
use crate::services::{exam_authoring, results};

#[derive(Debug, Deserialize)]
pub(super) struct CheckExamQuery {
    #[serde(default)]
    status: Option<String>,
}

pub(super) async fn check_exam(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(exam_id): Path<String>,
    Query(query): Query<CheckExamQuery>,
) -> Result<Html<String>, ApiError> {
    let exam = exam_authoring::find_owned_exam(&state, &teacher.id, &exam_id).await?;

    let questions = repositories::questions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;
    let students = repositories::attempts::list_best_per_student(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student scores"))?;

    render(&CheckExamTemplate {
        nav: Nav::for_user(&teacher),
        exam: ExamCardView::from(&exam),
        question_count: questions.len(),
        students: students.into_iter().map(StudentScoreView::from).collect(),
        updated: query.status.as_deref() == Some("updated"),
    })
}

pub(super) async fn edit_exam_page(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(exam_id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let exam = exam_authoring::find_owned_exam(&state, &teacher.id, &exam_id).await?;
    let questions = repositories::questions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    render(&EditExamTemplate {
        nav: Nav::for_user(&teacher),
        exam: ExamCardView::from(&exam),
        questions: questions
            .into_iter()
            .map(|question| QuestionEditView {
                id: question.id,
                position: question.position,
                question: question.question,
                correct_answer: question.correct_answer,
            })
            .collect(),
    })
}

pub(super) async fn edit_exam(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(exam_id): Path<String>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let edit = match parse_exam_edit(&pairs) {
        Ok(edit) => edit,
        Err(message) => return form_error(message),
    };

    exam_authoring::update_exam(&state, &teacher.id, &exam_id, edit).await?;

    Ok(redirect_to(&format!("/teacher/check-exam/{exam_id}?status=updated"), is_htmx(&headers)))
}

#[derive(Debug, Deserialize)]
pub(super) struct StudentResultQuery {
    exam_id: String,
}

pub(super) async fn student_result(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(student_id): Path<String>,
    Query(query): Query<StudentResultQuery>,
) -> Result<Html<String>, ApiError> {
    let exam = exam_authoring::find_owned_exam(&state, &teacher.id, &query.exam_id).await?;

    let student = repositories::users::find_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    let result = results::best_result(&state, exam, &student.id).await?;

    render(&TeacherStudentResultTemplate {
        nav: Nav::for_user(&teacher),
        student_name: student.full_name,
        student_email: student.email,
        result: ResultView::from(&result),
    })
}

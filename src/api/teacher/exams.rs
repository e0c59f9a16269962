use axum::extract::{Multipart, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, Response};
use serde::Deserialize;

use crate::api::auth::form_error;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::htmx::{is_htmx, redirect_to};
use crate::api::views::{
    render, ExamCardTemplate, ExamCardView, Nav, TeacherDashboardTemplate, UploadTemplate,
};
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::exam::{validate_pdf_upload, ExamUploadFields};
use crate::services::exam_authoring::{self, NewExam};

#[derive(Debug, Deserialize)]
pub(super) struct DashboardQuery {
    #[serde(default)]
    year: Option<String>,
}

pub(super) async fn dashboard(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, ApiError> {
    let selected_year = query.year.as_deref().and_then(|year| year.trim().parse::<i32>().ok());

    let exams = repositories::exams::list_by_teacher(state.db(), &teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;
    let years = repositories::exams::list_years_by_teacher(state.db(), &teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exam years"))?;

    let exams = exams
        .iter()
        .filter(|exam| selected_year.map_or(true, |year| exam.year == year))
        .map(ExamCardView::from)
        .collect();

    render(&TeacherDashboardTemplate { nav: Nav::for_user(&teacher), exams, years, selected_year })
}

pub(super) async fn upload_page(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Html<String>, ApiError> {
    render(&UploadTemplate {
        nav: Nav::for_user(&teacher),
        max_questions: state.settings().exam().max_questions_per_exam,
        max_upload_mb: state.settings().storage().max_upload_size_mb,
    })
}

struct UploadedPdf {
    filename: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

pub(super) async fn create_exam(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let (fields, pdf) = match read_upload_form(&state, multipart).await {
        Ok(parsed) => parsed,
        Err(message) => return form_error(message),
    };

    let max_questions = state.settings().exam().max_questions_per_exam;
    let (details, question_count) = match fields.validate(max_questions) {
        Ok(validated) => validated,
        Err(message) => return form_error(message),
    };

    let Some(pdf) = pdf else {
        return form_error("Please choose a PDF file");
    };
    if let Err(message) =
        validate_pdf_upload(pdf.filename.as_deref(), pdf.content_type.as_deref(), &pdf.data)
    {
        return form_error(message);
    }

    let exam = exam_authoring::create_exam_from_pdf(
        &state,
        &teacher.id,
        NewExam {
            room_name: details.room_name,
            year: details.year,
            duration_minutes: details.duration_minutes,
            question_count,
            pdf: pdf.data,
        },
    )
    .await?;

    tracing::info!(exam_id = %exam.id, teacher_id = %teacher.id, "Exam created from PDF");

    Ok(redirect_to("/teacher/dashboard", is_htmx(&headers)))
}

/// Reads the text fields and the `pdf_file` part. `Err` carries a message for the form.
async fn read_upload_form(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<(ExamUploadFields, Option<UploadedPdf>), String> {
    let max_bytes = state.settings().storage().max_upload_bytes();
    let max_mb = state.settings().storage().max_upload_size_mb;

    let mut fields = ExamUploadFields::default();
    let mut pdf = None;

    while let Some(mut field) =
        multipart.next_field().await.map_err(|_| "Invalid form data".to_string())?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "pdf_file" {
            let filename = field.file_name().map(|s| s.to_string());
            let content_type = field.content_type().map(|s| s.to_string());
            let mut data = Vec::new();
            while let Some(chunk) =
                field.chunk().await.map_err(|_| format!("File size exceeds {max_mb}MB limit"))?
            {
                if data.len() + chunk.len() > max_bytes {
                    return Err(format!("File size exceeds {max_mb}MB limit"));
                }
                data.extend_from_slice(&chunk);
            }
            pdf = Some(UploadedPdf { filename, content_type, data });
        } else {
            let text = field.text().await.map_err(|_| "Invalid form data".to_string())?;
            fields.set(&name, text);
        }
    }

    Ok((fields, pdf))
}

pub(super) async fn toggle_exam(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(exam_id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let exam = exam_authoring::toggle_exam(&state, &teacher.id, &exam_id).await?;
    render(&ExamCardTemplate { exam: ExamCardView::from(&exam) })
}

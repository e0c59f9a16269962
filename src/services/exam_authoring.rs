use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Exam;
use crate::repositories;
use crate::repositories::questions::NewQuestion;
use crate::services::exam_codes::generate_exam_code;
use crate::services::ServiceError;

const MAX_CODE_ATTEMPTS: usize = 5;

pub(crate) struct NewExam {
    pub(crate) room_name: String,
    pub(crate) year: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) question_count: u32,
    pub(crate) pdf: Vec<u8>,
}

pub(crate) struct ExamEdit {
    pub(crate) room_name: String,
    pub(crate) year: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) questions: Vec<QuestionEdit>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuestionEdit {
    pub(crate) id: String,
    pub(crate) question: String,
    pub(crate) correct_answer: String,
}

/// Generates questions from the PDF, then stores the exam and its questions together.
pub(crate) async fn create_exam_from_pdf(
    state: &AppState,
    teacher_id: &str,
    request: NewExam,
) -> Result<Exam, ServiceError> {
    let generated = state
        .qa_generator()
        .generate(&request.pdf, request.question_count)
        .await
        .map_err(|source| ServiceError::Upstream { service: "question generation", source })?;

    let now = primitive_now_utc();
    let mut tx = state.db().begin().await?;

    let mut created = None;
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate_exam_code();
        created = repositories::exams::create(
            &mut *tx,
            repositories::exams::CreateExam {
                id: &code,
                room_name: &request.room_name,
                year: request.year,
                duration_minutes: request.duration_minutes,
                teacher_id,
                created_at: now,
            },
        )
        .await?;
        if created.is_some() {
            break;
        }
        tracing::warn!(code = %code, "Exam code collision, regenerating");
    }

    let Some(exam) = created else {
        return Err(ServiceError::Conflict("Could not allocate a unique exam code".to_string()));
    };

    let rows: Vec<NewQuestion<'_>> = generated
        .iter()
        .map(|item| NewQuestion {
            id: Uuid::new_v4().to_string(),
            question: &item.question,
            correct_answer: &item.answer,
        })
        .collect();
    repositories::questions::insert_many(&mut *tx, &exam.id, &rows).await?;

    tx.commit().await?;

    tracing::info!(
        exam_id = %exam.id,
        teacher_id,
        questions = rows.len(),
        requested = request.question_count,
        "Exam created from PDF"
    );

    Ok(exam)
}

/// Loads an exam and checks that `teacher_id` created it.
pub(crate) async fn find_owned_exam(
    state: &AppState,
    teacher_id: &str,
    exam_id: &str,
) -> Result<Exam, ServiceError> {
    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Exam not found".to_string()))?;

    if exam.teacher_id != teacher_id {
        return Err(ServiceError::Forbidden("This exam belongs to another teacher"));
    }

    Ok(exam)
}

pub(crate) async fn toggle_exam(
    state: &AppState,
    teacher_id: &str,
    exam_id: &str,
) -> Result<Exam, ServiceError> {
    let toggled =
        repositories::exams::toggle_active(state.db(), exam_id, teacher_id, primitive_now_utc())
            .await?;

    match toggled {
        Some(exam) => {
            tracing::info!(exam_id, is_active = exam.is_active, "Exam availability toggled");
            Ok(exam)
        }
        None => {
            find_owned_exam(state, teacher_id, exam_id).await?;
            Err(ServiceError::NotFound("Exam not found".to_string()))
        }
    }
}

/// Updates exam details and the listed questions in one transaction.
pub(crate) async fn update_exam(
    state: &AppState,
    teacher_id: &str,
    exam_id: &str,
    edit: ExamEdit,
) -> Result<Exam, ServiceError> {
    find_owned_exam(state, teacher_id, exam_id).await?;

    let mut tx = state.db().begin().await?;

    let exam = repositories::exams::update_details(
        &mut *tx,
        exam_id,
        teacher_id,
        repositories::exams::UpdateExam {
            room_name: &edit.room_name,
            year: edit.year,
            duration_minutes: edit.duration_minutes,
            updated_at: primitive_now_utc(),
        },
    )
    .await?
    .ok_or_else(|| ServiceError::NotFound("Exam not found".to_string()))?;

    for question in &edit.questions {
        let updated = repositories::questions::update_for_exam(
            &mut *tx,
            exam_id,
            &question.id,
            &question.question,
            &question.correct_answer,
        )
        .await?;
        if updated == 0 {
            return Err(ServiceError::Invalid(format!(
                "Question {} does not belong to this exam",
                question.id
            )));
        }
    }

    tx.commit().await?;

    tracing::info!(exam_id, questions = edit.questions.len(), "Exam updated");

    Ok(exam)
}

//! Askama page and fragment templates with their precomputed view models.
//!
//! Templates only read strings, numbers and flags; formatting happens here.

use askama::Template;
use axum::response::Html;

use crate::api::errors::ApiError;
use crate::core::time::format_display;
use crate::db::models::{Exam, User};
use crate::repositories::attempts::{ExamBestAttemptRow, StudentBestAttemptRow};
use crate::repositories::exams::ActiveExamRow;
use crate::services::exam_attempts::{ActiveAttempt, AnswerMap};
use crate::services::results::AttemptResult;

pub(crate) fn render<T: Template>(template: &T) -> Result<Html<String>, ApiError> {
    template.render().map(Html).map_err(|e| ApiError::internal(e, "Failed to render template"))
}

/// Scores without trailing zeros: `7.5`, `8`, `0.25`.
pub(crate) fn format_score(value: f64) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Nav {
    pub(crate) user: Option<NavUser>,
}

#[derive(Debug, Clone)]
pub(crate) struct NavUser {
    pub(crate) full_name: String,
    pub(crate) role_label: &'static str,
    pub(crate) dashboard_path: &'static str,
}

impl Nav {
    pub(crate) fn guest() -> Self {
        Self::default()
    }

    pub(crate) fn for_user(user: &User) -> Self {
        Self {
            user: Some(NavUser {
                full_name: user.full_name.clone(),
                role_label: user.role.label(),
                dashboard_path: user.role.dashboard_path(),
            }),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    pub(crate) nav: Nav,
}

#[derive(Template)]
#[template(path = "login.html")]
pub(crate) struct LoginTemplate {
    pub(crate) nav: Nav,
}

#[derive(Template)]
#[template(path = "register.html")]
pub(crate) struct RegisterTemplate {
    pub(crate) nav: Nav,
}

#[derive(Template)]
#[template(path = "partials/form_error.html")]
pub(crate) struct FormErrorTemplate {
    pub(crate) message: String,
}

#[derive(Template)]
#[template(path = "partials/register_success.html")]
pub(crate) struct RegisterSuccessTemplate {
    pub(crate) full_name: String,
    pub(crate) role_label: &'static str,
}

#[derive(Template)]
#[template(path = "error.html")]
pub(crate) struct ErrorTemplate {
    pub(crate) nav: Nav,
    pub(crate) status_code: u16,
    pub(crate) status_text: String,
    pub(crate) message: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ExamCardView {
    pub(crate) id: String,
    pub(crate) room_name: String,
    pub(crate) year: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl From<&Exam> for ExamCardView {
    fn from(exam: &Exam) -> Self {
        Self {
            id: exam.id.clone(),
            room_name: exam.room_name.clone(),
            year: exam.year,
            duration_minutes: exam.duration_minutes,
            is_active: exam.is_active,
            created_at: format_display(exam.created_at),
        }
    }
}

#[derive(Template)]
#[template(path = "teacher/dashboard.html")]
pub(crate) struct TeacherDashboardTemplate {
    pub(crate) nav: Nav,
    pub(crate) exams: Vec<ExamCardView>,
    pub(crate) years: Vec<i32>,
    pub(crate) selected_year: Option<i32>,
}

impl TeacherDashboardTemplate {
    fn is_selected(&self, year: &i32) -> bool {
        self.selected_year == Some(*year)
    }
}

#[derive(Template)]
#[template(path = "teacher/exam_card.html")]
pub(crate) struct ExamCardTemplate {
    pub(crate) exam: ExamCardView,
}

#[derive(Template)]
#[template(path = "teacher/upload.html")]
pub(crate) struct UploadTemplate {
    pub(crate) nav: Nav,
    pub(crate) max_questions: u32,
    pub(crate) max_upload_mb: u64,
}

#[derive(Debug)]
pub(crate) struct StudentScoreView {
    pub(crate) student_id: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) score: String,
    pub(crate) completed_at: String,
}

impl From<StudentBestAttemptRow> for StudentScoreView {
    fn from(row: StudentBestAttemptRow) -> Self {
        Self {
            student_id: row.student_id,
            full_name: row.student_name,
            email: row.student_email,
            score: format_score(row.score),
            completed_at: format_display(row.completed_at),
        }
    }
}

#[derive(Template)]
#[template(path = "teacher/check_exam.html")]
pub(crate) struct CheckExamTemplate {
    pub(crate) nav: Nav,
    pub(crate) exam: ExamCardView,
    pub(crate) question_count: usize,
    pub(crate) students: Vec<StudentScoreView>,
    pub(crate) updated: bool,
}

#[derive(Debug)]
pub(crate) struct QuestionEditView {
    pub(crate) id: String,
    pub(crate) position: i32,
    pub(crate) question: String,
    pub(crate) correct_answer: String,
}

#[derive(Template)]
#[template(path = "teacher/edit_exam.html")]
pub(crate) struct EditExamTemplate {
    pub(crate) nav: Nav,
    pub(crate) exam: ExamCardView,
    pub(crate) questions: Vec<QuestionEditView>,
}

#[derive(Debug)]
pub(crate) struct CorrectionView {
    pub(crate) position: i32,
    pub(crate) question: String,
    pub(crate) correct_answer: String,
    pub(crate) student_answer: String,
    pub(crate) answered: bool,
    pub(crate) score: String,
    pub(crate) max_score: String,
    pub(crate) similarity: String,
    pub(crate) feedback: String,
}

#[derive(Debug)]
pub(crate) struct ResultView {
    pub(crate) exam_id: String,
    pub(crate) room_name: String,
    pub(crate) year: i32,
    pub(crate) total_score: String,
    pub(crate) total_max_score: String,
    pub(crate) percentage: String,
    pub(crate) completed_at: String,
    pub(crate) rows: Vec<CorrectionView>,
}

impl From<&AttemptResult> for ResultView {
    fn from(result: &AttemptResult) -> Self {
        let optional = |value: Option<f64>| value.map(format_score).unwrap_or_else(|| "-".into());

        let rows = result
            .corrections
            .iter()
            .map(|row| CorrectionView {
                position: row.position,
                question: row.question.clone(),
                correct_answer: row.correct_answer.clone(),
                student_answer: row.student_answer.clone().unwrap_or_default(),
                answered: row.student_answer.is_some(),
                score: optional(row.score),
                max_score: optional(row.max_score),
                similarity: optional(row.similarity),
                feedback: row.feedback.clone().unwrap_or_default(),
            })
            .collect();

        Self {
            exam_id: result.exam.id.clone(),
            room_name: result.exam.room_name.clone(),
            year: result.exam.year,
            total_score: format_score(result.attempt.score),
            total_max_score: format_score(result.total_max_score),
            percentage: result
                .percentage()
                .map(|value| format!("{value:.0}%"))
                .unwrap_or_else(|| "-".to_string()),
            completed_at: result
                .attempt
                .completed_at
                .map(format_display)
                .unwrap_or_else(|| "-".to_string()),
            rows,
        }
    }
}

#[derive(Template)]
#[template(path = "teacher/student_result.html")]
pub(crate) struct TeacherStudentResultTemplate {
    pub(crate) nav: Nav,
    pub(crate) student_name: String,
    pub(crate) student_email: String,
    pub(crate) result: ResultView,
}

#[derive(Debug)]
pub(crate) struct AvailableExamView {
    pub(crate) id: String,
    pub(crate) room_name: String,
    pub(crate) year: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) teacher_name: String,
    pub(crate) question_count: i64,
}

impl From<ActiveExamRow> for AvailableExamView {
    fn from(row: ActiveExamRow) -> Self {
        Self {
            id: row.id,
            room_name: row.room_name,
            year: row.year,
            duration_minutes: row.duration_minutes,
            teacher_name: row.teacher_name,
            question_count: row.question_count,
        }
    }
}

#[derive(Template)]
#[template(path = "student/dashboard.html")]
pub(crate) struct StudentDashboardTemplate {
    pub(crate) nav: Nav,
    pub(crate) exams: Vec<AvailableExamView>,
}

#[derive(Debug, Clone)]
pub(crate) struct CarriedAnswer {
    pub(crate) question_id: String,
    pub(crate) answer: String,
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionNumberView {
    pub(crate) number: usize,
    pub(crate) is_current: bool,
    pub(crate) is_answered: bool,
}

/// One question of a running attempt plus everything needed to move between questions.
#[derive(Debug, Clone)]
pub(crate) struct QuestionPageView {
    pub(crate) exam_id: String,
    pub(crate) room_name: String,
    pub(crate) number: usize,
    pub(crate) total: usize,
    pub(crate) prev_number: Option<usize>,
    pub(crate) next_number: Option<usize>,
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) current_answer: String,
    pub(crate) carried: Vec<CarriedAnswer>,
    pub(crate) numbers: Vec<QuestionNumberView>,
    pub(crate) answered_count: usize,
    pub(crate) remaining_seconds: i64,
}

impl QuestionPageView {
    /// `number` is 1-based and must be within the attempt's question list.
    pub(crate) fn build(active: &ActiveAttempt, number: usize, answers: &AnswerMap) -> Option<Self> {
        let total = active.questions.len();
        let current = active.questions.get(number.checked_sub(1)?)?;

        let answered = |id: &str| answers.get(id).is_some_and(|answer| !answer.trim().is_empty());

        let carried = active
            .questions
            .iter()
            .filter(|question| question.id != current.id)
            .filter_map(|question| {
                answers.get(&question.id).map(|answer| CarriedAnswer {
                    question_id: question.id.clone(),
                    answer: answer.clone(),
                })
            })
            .collect();

        let numbers = active
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| QuestionNumberView {
                number: index + 1,
                is_current: index + 1 == number,
                is_answered: answered(&question.id),
            })
            .collect();

        Some(Self {
            exam_id: active.exam.id.clone(),
            room_name: active.exam.room_name.clone(),
            number,
            total,
            prev_number: (number > 1).then(|| number - 1),
            next_number: (number < total).then(|| number + 1),
            question_id: current.id.clone(),
            question_text: current.question.clone(),
            current_answer: answers.get(&current.id).cloned().unwrap_or_default(),
            carried,
            numbers,
            answered_count: active.questions.iter().filter(|q| answered(&q.id)).count(),
            remaining_seconds: active.remaining_seconds,
        })
    }
}

#[derive(Template)]
#[template(path = "student/take_exam.html")]
pub(crate) struct TakeExamTemplate {
    pub(crate) nav: Nav,
    pub(crate) page: QuestionPageView,
}

#[derive(Template)]
#[template(path = "student/question.html")]
pub(crate) struct QuestionPartialTemplate {
    pub(crate) page: QuestionPageView,
}

#[derive(Template)]
#[template(path = "student/exam_result.html")]
pub(crate) struct StudentExamResultTemplate {
    pub(crate) nav: Nav,
    pub(crate) result: ResultView,
}

#[derive(Debug)]
pub(crate) struct ScoreRowView {
    pub(crate) exam_id: String,
    pub(crate) room_name: String,
    pub(crate) year: i32,
    pub(crate) teacher_name: String,
    pub(crate) score: String,
    pub(crate) completed_at: String,
}

impl From<ExamBestAttemptRow> for ScoreRowView {
    fn from(row: ExamBestAttemptRow) -> Self {
        Self {
            exam_id: row.exam_id,
            room_name: row.room_name,
            year: row.year,
            teacher_name: row.teacher_name,
            score: format_score(row.score),
            completed_at: format_display(row.completed_at),
        }
    }
}

#[derive(Template)]
#[template(path = "student/score_list.html")]
pub(crate) struct ScoreListTemplate {
    pub(crate) nav: Nav,
    pub(crate) scores: Vec<ScoreRowView>,
}

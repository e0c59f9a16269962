use crate::core::state::AppState;
use crate::db::models::{Exam, ExamAttempt};
use crate::repositories;
use crate::repositories::answers::CorrectionRow;
use crate::services::ServiceError;

#[derive(Debug)]
pub(crate) struct AttemptResult {
    pub(crate) exam: Exam,
    pub(crate) attempt: ExamAttempt,
    pub(crate) corrections: Vec<CorrectionRow>,
    pub(crate) total_max_score: f64,
}

impl AttemptResult {
    pub(crate) fn percentage(&self) -> Option<f64> {
        percentage(self.attempt.score, self.total_max_score)
    }
}

/// The student's best completed attempt at `exam_id` with per-question corrections.
pub(crate) async fn best_result(
    state: &AppState,
    exam: Exam,
    student_id: &str,
) -> Result<AttemptResult, ServiceError> {
    let attempt = repositories::attempts::find_best_completed(state.db(), &exam.id, student_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("No completed attempt for this exam".to_string()))?;

    let corrections =
        repositories::answers::list_corrections(state.db(), &exam.id, &attempt.id).await?;
    let total_max_score = max_score_sum(&corrections);

    Ok(AttemptResult { exam, attempt, corrections, total_max_score })
}

/// Loads the exam first, then the best result.
pub(crate) async fn best_result_for_exam(
    state: &AppState,
    exam_id: &str,
    student_id: &str,
) -> Result<AttemptResult, ServiceError> {
    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Exam not found".to_string()))?;
    best_result(state, exam, student_id).await
}

pub(crate) fn max_score_sum(corrections: &[CorrectionRow]) -> f64 {
    corrections.iter().filter_map(|row| row.max_score).sum()
}

pub(crate) fn percentage(score: f64, max_score: f64) -> Option<f64> {
    if max_score > 0.0 {
        Some((score / max_score * 100.0).clamp(0.0, 100.0))
    } else {
        None
    }
}

//! Attempt lifecycle: start or resume, navigate, submit, score, complete.
//!
//! Submission runs in three steps so the scoring call never holds a
//! database transaction open:
//! 1. persist answers under a row lock on the attempt;
//! 2. call the scoring service;
//! 3. re-lock the attempt, write corrections and the total, mark it complete.
//!
//! A failed scoring call leaves the attempt open with its answers saved.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::anyhow;
use time::Duration;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, seconds_until};
use crate::db::models::{Exam, ExamAttempt, Question, StudentAnswer};
use crate::repositories;
use crate::services::scoring::{EssayCorrection, ScoringItem};
use crate::services::ServiceError;

/// Answers keyed by question id.
pub(crate) type AnswerMap = BTreeMap<String, String>;

#[derive(Debug)]
pub(crate) struct ActiveAttempt {
    pub(crate) exam: Exam,
    pub(crate) attempt: ExamAttempt,
    pub(crate) questions: Vec<Question>,
    pub(crate) remaining_seconds: i64,
}

/// Resumes the student's open attempt for this exam or starts a new one.
pub(crate) async fn start_attempt(
    state: &AppState,
    student_id: &str,
    exam_id: &str,
) -> Result<ActiveAttempt, ServiceError> {
    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Exam not found".to_string()))?;

    if !exam.is_active {
        return Err(ServiceError::Forbidden("This exam is not open"));
    }

    let questions = repositories::questions::list_by_exam(state.db(), exam_id).await?;
    if questions.is_empty() {
        return Err(ServiceError::NotFound("This exam has no questions".to_string()));
    }

    let now = primitive_now_utc();
    let window_start = now.saturating_sub(Duration::minutes(i64::from(exam.duration_minutes)));

    let mut tx = state.db().begin().await?;
    repositories::attempts::acquire_student_exam_lock(&mut *tx, exam_id, student_id).await?;

    let existing =
        repositories::attempts::find_open(&mut *tx, exam_id, student_id, window_start).await?;

    let attempt = match existing {
        Some(attempt) => {
            tracing::info!(attempt_id = %attempt.id, exam_id, student_id, "Resuming open attempt");
            attempt
        }
        None => {
            let attempt_id = Uuid::new_v4().to_string();
            let attempt = repositories::attempts::create(
                &mut *tx,
                repositories::attempts::CreateAttempt {
                    id: &attempt_id,
                    student_id,
                    exam_id,
                    started_at: now,
                },
            )
            .await?;
            tracing::info!(attempt_id = %attempt.id, exam_id, student_id, "Attempt started");
            attempt
        }
    };

    tx.commit().await?;

    let remaining_seconds = seconds_until(attempt.deadline(exam.duration_minutes), now);
    Ok(ActiveAttempt { exam, attempt, questions, remaining_seconds })
}

/// Answers already stored for the attempt, so a resumed page starts pre-filled.
pub(crate) async fn saved_answers(
    state: &AppState,
    attempt_id: &str,
) -> Result<AnswerMap, ServiceError> {
    let answers = repositories::answers::list_by_attempt(state.db(), attempt_id).await?;
    Ok(answers.into_iter().map(|answer| (answer.question_id, answer.answer)).collect())
}

/// Loads an open attempt for question navigation.
pub(crate) async fn load_active_attempt(
    state: &AppState,
    student_id: &str,
    exam_id: &str,
    attempt_id: &str,
) -> Result<ActiveAttempt, ServiceError> {
    let attempt = repositories::attempts::find_by_id(state.db(), attempt_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Attempt not found".to_string()))?;
    ensure_attempt_matches(&attempt, student_id, exam_id)?;

    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Exam not found".to_string()))?;

    let now = primitive_now_utc();
    let deadline = attempt.deadline(exam.duration_minutes);
    if now > deadline {
        return Err(ServiceError::Invalid("Attempt has expired".to_string()));
    }

    let questions = repositories::questions::list_by_exam(state.db(), exam_id).await?;
    if questions.is_empty() {
        return Err(ServiceError::NotFound("This exam has no questions".to_string()));
    }

    Ok(ActiveAttempt { exam, attempt, questions, remaining_seconds: seconds_until(deadline, now) })
}

/// Saves the answers, scores them remotely and completes the attempt.
pub(crate) async fn submit_attempt(
    state: &AppState,
    student_id: &str,
    exam_id: &str,
    attempt_id: &str,
    answers: &AnswerMap,
) -> Result<ExamAttempt, ServiceError> {
    let saved = save_answers(state, student_id, exam_id, attempt_id, answers).await?;

    let items: Vec<ScoringItem> = repositories::answers::list_scoring_items(state.db(), attempt_id)
        .await?
        .into_iter()
        .map(|row| ScoringItem {
            id: row.answer_id,
            question: row.question,
            correct_answer: row.correct_answer,
            student_answer: row.student_answer,
        })
        .collect();

    let corrections = if items.is_empty() {
        Vec::new()
    } else {
        let corrections = state
            .scorer()
            .score(&items)
            .await
            .map_err(|source| ServiceError::Upstream { service: "scoring", source })?;
        validate_corrections(&items, &corrections)
            .map_err(|source| ServiceError::Upstream { service: "scoring", source })?;
        corrections
    };

    let attempt = finalize(state, attempt_id, &items, &corrections).await?;

    tracing::info!(
        attempt_id,
        exam_id,
        student_id,
        saved,
        scored = corrections.len(),
        score = attempt.score,
        "Attempt submitted and scored"
    );

    Ok(attempt)
}

async fn save_answers(
    state: &AppState,
    student_id: &str,
    exam_id: &str,
    attempt_id: &str,
    answers: &AnswerMap,
) -> Result<usize, ServiceError> {
    let mut tx = state.db().begin().await?;

    let attempt = repositories::attempts::lock_by_id(&mut *tx, attempt_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Attempt not found".to_string()))?;
    ensure_attempt_matches(&attempt, student_id, exam_id)?;

    let exam = repositories::exams::find_by_id(&mut *tx, exam_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Exam not found".to_string()))?;

    let grace = state.settings().exam().submit_grace();
    let hard_deadline = attempt.deadline(exam.duration_minutes).saturating_add(grace);
    let now = primitive_now_utc();
    if now > hard_deadline {
        return Err(ServiceError::Invalid(
            "The submission window for this attempt has closed".to_string(),
        ));
    }

    let questions = repositories::questions::list_by_exam(&mut *tx, exam_id).await?;
    let known: HashSet<&str> = questions.iter().map(|question| question.id.as_str()).collect();
    if let Some(unknown) = answers.keys().find(|id| !known.contains(id.as_str())) {
        return Err(ServiceError::Invalid(format!("Question {unknown} is not part of this exam")));
    }

    let mut saved = 0;
    for (question_id, answer) in answers {
        let answer = answer.trim();
        if answer.is_empty() {
            repositories::answers::delete_for_question(&mut *tx, attempt_id, question_id).await?;
            continue;
        }

        repositories::answers::upsert(
            &mut *tx,
            repositories::answers::UpsertAnswer {
                id: &Uuid::new_v4().to_string(),
                attempt_id,
                question_id,
                answer,
                now,
            },
        )
        .await?;
        saved += 1;
    }

    tx.commit().await?;
    Ok(saved)
}

async fn finalize(
    state: &AppState,
    attempt_id: &str,
    items: &[ScoringItem],
    corrections: &[EssayCorrection],
) -> Result<ExamAttempt, ServiceError> {
    let mut tx = state.db().begin().await?;

    let attempt = repositories::attempts::lock_by_id(&mut *tx, attempt_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Attempt not found".to_string()))?;
    if attempt.is_completed() {
        return Err(ServiceError::Conflict("This attempt was already submitted".to_string()));
    }

    let stored = repositories::answers::list_by_attempt(&mut *tx, attempt_id).await?;
    if !answers_unchanged(items, &stored) {
        return Err(ServiceError::Conflict(
            "Your answers changed while they were being scored. Submit again.".to_string(),
        ));
    }

    let now = primitive_now_utc();
    for correction in corrections {
        let updated = repositories::answers::apply_correction(
            &mut *tx,
            attempt_id,
            repositories::answers::ApplyCorrection {
                answer_id: &correction.student_answer_id,
                score: correction.score,
                max_score: correction.max_score,
                similarity: correction.similarity,
                feedback: &correction.feedback,
                now,
            },
        )
        .await?;
        if updated == 0 {
            return Err(ServiceError::Upstream {
                service: "scoring",
                source: anyhow!(
                    "answer {} disappeared before scoring",
                    correction.student_answer_id
                ),
            });
        }
    }

    let total = repositories::answers::sum_scores(&mut *tx, attempt_id).await?;
    let attempt = repositories::attempts::complete(&mut *tx, attempt_id, total, now).await?;

    tx.commit().await?;
    Ok(attempt)
}

/// The stored answers are exactly the ones that were sent for scoring.
fn answers_unchanged(items: &[ScoringItem], stored: &[StudentAnswer]) -> bool {
    let sent: HashMap<&str, &str> =
        items.iter().map(|item| (item.id.as_str(), item.student_answer.as_str())).collect();
    stored.len() == sent.len()
        && stored.iter().all(|answer| sent.get(answer.id.as_str()) == Some(&answer.answer.as_str()))
}

fn ensure_attempt_matches(
    attempt: &ExamAttempt,
    student_id: &str,
    exam_id: &str,
) -> Result<(), ServiceError> {
    if attempt.student_id != student_id {
        return Err(ServiceError::Forbidden("This attempt belongs to another student"));
    }
    if attempt.exam_id != exam_id {
        return Err(ServiceError::Invalid("Attempt does not belong to this exam".to_string()));
    }
    if attempt.is_completed() {
        return Err(ServiceError::Conflict("This attempt was already submitted".to_string()));
    }
    Ok(())
}

/// Every submitted answer gets exactly one correction with finite numbers.
pub(crate) fn validate_corrections(
    items: &[ScoringItem],
    corrections: &[EssayCorrection],
) -> anyhow::Result<()> {
    let submitted: HashSet<&str> = items.iter().map(|item| item.id.as_str()).collect();
    let mut seen = HashSet::with_capacity(corrections.len());

    for correction in corrections {
        let id = correction.student_answer_id.as_str();
        if !submitted.contains(id) {
            return Err(anyhow!("scoring returned unknown answer id {id}"));
        }
        if !seen.insert(id) {
            return Err(anyhow!("scoring returned answer id {id} more than once"));
        }
        let numbers = [correction.score, correction.max_score, correction.similarity];
        if numbers.iter().any(|value| !value.is_finite()) {
            return Err(anyhow!("scoring returned a non-finite value for answer {id}"));
        }
    }

    if let Some(missing) = items.iter().find(|item| !seen.contains(item.id.as_str())) {
        return Err(anyhow!("scoring returned no correction for answer {}", missing.id));
    }

    Ok(())
}

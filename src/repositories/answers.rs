use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::StudentAnswer;

pub(crate) const COLUMNS: &str = "\
    id, attempt_id, question_id, answer, score, max_score, similarity, feedback, \
    created_at, updated_at";

/// One answer joined with its question, in question order.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ScoringItemRow {
    pub(crate) answer_id: String,
    pub(crate) question: String,
    pub(crate) correct_answer: String,
    pub(crate) student_answer: String,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CorrectionRow {
    pub(crate) position: i32,
    pub(crate) question: String,
    pub(crate) correct_answer: String,
    pub(crate) student_answer: Option<String>,
    pub(crate) score: Option<f64>,
    pub(crate) max_score: Option<f64>,
    pub(crate) similarity: Option<f64>,
    pub(crate) feedback: Option<String>,
}

pub(crate) struct UpsertAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) answer: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) struct ApplyCorrection<'a> {
    pub(crate) answer_id: &'a str,
    pub(crate) score: f64,
    pub(crate) max_score: f64,
    pub(crate) similarity: f64,
    pub(crate) feedback: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertAnswer<'_>,
) -> Result<StudentAnswer, sqlx::Error> {
    sqlx::query_as::<_, StudentAnswer>(&format!(
        "INSERT INTO student_answers (id, attempt_id, question_id, answer, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $5)
         ON CONFLICT (attempt_id, question_id)
         DO UPDATE SET answer = EXCLUDED.answer, updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.attempt_id)
    .bind(params.question_id)
    .bind(params.answer)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<StudentAnswer>, sqlx::Error> {
    sqlx::query_as::<_, StudentAnswer>(&format!(
        "SELECT {COLUMNS} FROM student_answers WHERE attempt_id = $1"
    ))
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_scoring_items(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<ScoringItemRow>, sqlx::Error> {
    sqlx::query_as::<_, ScoringItemRow>(
        "SELECT a.id AS answer_id, q.question, q.correct_answer, a.answer AS student_answer
         FROM student_answers a
         JOIN questions q ON q.id = a.question_id
         WHERE a.attempt_id = $1
         ORDER BY q.position",
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn apply_correction(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    params: ApplyCorrection<'_>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE student_answers
         SET score = $3, max_score = $4, similarity = $5, feedback = $6, updated_at = $7
         WHERE id = $1 AND attempt_id = $2",
    )
    .bind(params.answer_id)
    .bind(attempt_id)
    .bind(params.score)
    .bind(params.max_score)
    .bind(params.similarity)
    .bind(params.feedback)
    .bind(params.now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn sum_scores(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(score), 0)::DOUBLE PRECISION FROM student_answers WHERE attempt_id = $1",
    )
    .bind(attempt_id)
    .fetch_one(executor)
    .await
}

/// Every question of the exam with this attempt's answer and correction, if any.
pub(crate) async fn list_corrections(
    pool: &PgPool,
    exam_id: &str,
    attempt_id: &str,
) -> Result<Vec<CorrectionRow>, sqlx::Error> {
    sqlx::query_as::<_, CorrectionRow>(
        "SELECT q.position, q.question, q.correct_answer,
                a.answer AS student_answer, a.score, a.max_score, a.similarity, a.feedback
         FROM questions q
         LEFT JOIN student_answers a ON a.question_id = q.id AND a.attempt_id = $2
         WHERE q.exam_id = $1
         ORDER BY q.position",
    )
    .bind(exam_id)
    .bind(attempt_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn delete_for_question(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    question_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM student_answers WHERE attempt_id = $1 AND question_id = $2")
        .bind(attempt_id)
        .bind(question_id)
        .execute(executor)
        .await?;
    Ok(())
}

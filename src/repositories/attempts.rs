use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::ExamAttempt;

pub(crate) const COLUMNS: &str = "id, student_id, exam_id, score, started_at, completed_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StudentBestAttemptRow {
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) student_email: String,
    pub(crate) score: f64,
    pub(crate) completed_at: PrimitiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExamBestAttemptRow {
    pub(crate) exam_id: String,
    pub(crate) room_name: String,
    pub(crate) year: i32,
    pub(crate) teacher_name: String,
    pub(crate) score: f64,
    pub(crate) completed_at: PrimitiveDateTime,
}

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) started_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateAttempt<'_>,
) -> Result<ExamAttempt, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "INSERT INTO exam_attempts (id, student_id, exam_id, score, started_at)
         VALUES ($1, $2, $3, 0, $4)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.exam_id)
    .bind(params.started_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!("SELECT {COLUMNS} FROM exam_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Row-locks the attempt for the rest of the transaction.
pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Serializes attempt creation for one (exam, student) pair within a transaction.
pub(crate) async fn acquire_student_exam_lock(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("exam_attempt:{exam_id}:{student_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

/// Latest unfinished attempt that started after `started_after`.
pub(crate) async fn find_open(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
    started_after: PrimitiveDateTime,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts
         WHERE exam_id = $1 AND student_id = $2 AND completed_at IS NULL AND started_at > $3
         ORDER BY started_at DESC
         LIMIT 1"
    ))
    .bind(exam_id)
    .bind(student_id)
    .bind(started_after)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn complete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    score: f64,
    completed_at: PrimitiveDateTime,
) -> Result<ExamAttempt, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "UPDATE exam_attempts SET score = $2, completed_at = $3
         WHERE id = $1 AND completed_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(score)
    .bind(completed_at)
    .fetch_one(executor)
    .await
}

/// Highest scoring completed attempt, earliest completion on ties.
pub(crate) async fn find_best_completed(
    pool: &PgPool,
    exam_id: &str,
    student_id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts
         WHERE exam_id = $1 AND student_id = $2 AND completed_at IS NOT NULL
         ORDER BY score DESC, completed_at ASC
         LIMIT 1"
    ))
    .bind(exam_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_best_per_student(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<StudentBestAttemptRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentBestAttemptRow>(
        "SELECT best.student_id, u.full_name AS student_name,
                u.email AS student_email, best.score, best.completed_at
         FROM (
             SELECT DISTINCT ON (a.student_id)
                    a.student_id, a.score, a.completed_at
             FROM exam_attempts a
             WHERE a.exam_id = $1 AND a.completed_at IS NOT NULL
             ORDER BY a.student_id, a.score DESC, a.completed_at ASC
         ) best
         JOIN users u ON u.id = best.student_id
         ORDER BY u.full_name, u.email",
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_best_per_exam(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<ExamBestAttemptRow>, sqlx::Error> {
    sqlx::query_as::<_, ExamBestAttemptRow>(
        "SELECT best.exam_id, e.room_name, e.year,
                t.full_name AS teacher_name, best.score, best.completed_at
         FROM (
             SELECT DISTINCT ON (a.exam_id)
                    a.exam_id, a.score, a.completed_at
             FROM exam_attempts a
             WHERE a.student_id = $1 AND a.completed_at IS NOT NULL
             ORDER BY a.exam_id, a.score DESC, a.completed_at ASC
         ) best
         JOIN exams e ON e.id = best.exam_id
         JOIN users t ON t.id = e.teacher_id
         ORDER BY best.completed_at DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}

use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Exam;

pub(crate) const COLUMNS: &str =
    "id, room_name, year, duration_minutes, teacher_id, is_active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ActiveExamRow {
    pub(crate) id: String,
    pub(crate) room_name: String,
    pub(crate) year: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) teacher_name: String,
    pub(crate) question_count: i64,
}

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) room_name: &'a str,
    pub(crate) year: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) teacher_id: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) struct UpdateExam<'a> {
    pub(crate) room_name: &'a str,
    pub(crate) year: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Returns `None` when the generated id is already taken.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateExam<'_>,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, room_name, year, duration_minutes, teacher_id, is_active, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, FALSE, $6, $6)
        ON CONFLICT (id) DO NOTHING
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.room_name)
    .bind(params.year)
    .bind(params.duration_minutes)
    .bind(params.teacher_id)
    .bind(params.created_at)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_by_teacher(
    pool: &PgPool,
    teacher_id: &str,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE teacher_id = $1 ORDER BY created_at DESC, id"
    ))
    .bind(teacher_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_years_by_teacher(
    pool: &PgPool,
    teacher_id: &str,
) -> Result<Vec<i32>, sqlx::Error> {
    sqlx::query_scalar("SELECT DISTINCT year FROM exams WHERE teacher_id = $1 ORDER BY year DESC")
        .bind(teacher_id)
        .fetch_all(pool)
        .await
}

pub(crate) async fn list_active_with_teacher(
    pool: &PgPool,
) -> Result<Vec<ActiveExamRow>, sqlx::Error> {
    sqlx::query_as::<_, ActiveExamRow>(
        "SELECT e.id, e.room_name, e.year, e.duration_minutes,
                u.full_name AS teacher_name,
                (SELECT COUNT(*) FROM questions q WHERE q.exam_id = e.id) AS question_count
         FROM exams e
         JOIN users u ON u.id = e.teacher_id
         WHERE e.is_active
         ORDER BY e.year DESC, e.room_name, e.id",
    )
    .fetch_all(pool)
    .await
}

/// Flips `is_active` in one statement for an exam owned by `teacher_id`.
pub(crate) async fn toggle_active(
    pool: &PgPool,
    id: &str,
    teacher_id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET is_active = NOT is_active, updated_at = $3
         WHERE id = $1 AND teacher_id = $2
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(teacher_id)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn update_details(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    teacher_id: &str,
    params: UpdateExam<'_>,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET room_name = $3, year = $4, duration_minutes = $5, updated_at = $6
         WHERE id = $1 AND teacher_id = $2
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(teacher_id)
    .bind(params.room_name)
    .bind(params.year)
    .bind(params.duration_minutes)
    .bind(params.updated_at)
    .fetch_optional(executor)
    .await
}

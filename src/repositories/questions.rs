use sqlx::{Postgres, QueryBuilder};

use crate::db::models::Question;

pub(crate) const COLUMNS: &str = "id, exam_id, position, question, correct_answer";

pub(crate) struct NewQuestion<'a> {
    pub(crate) id: String,
    pub(crate) question: &'a str,
    pub(crate) correct_answer: &'a str,
}

/// Inserts `items` for `exam_id`, numbering them from 1 in slice order.
pub(crate) async fn insert_many(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    items: &[NewQuestion<'_>],
) -> Result<u64, sqlx::Error> {
    if items.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO questions (id, exam_id, position, question, correct_answer) ",
    );
    builder.push_values(items.iter().enumerate(), |mut row, (index, item)| {
        row.push_bind(&item.id)
            .push_bind(exam_id)
            .push_bind(index as i32 + 1)
            .push_bind(item.question)
            .push_bind(item.correct_answer);
    });

    let result = builder.build().execute(executor).await?;
    Ok(result.rows_affected())
}

pub(crate) async fn list_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY position"
    ))
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

/// Rewrites a question only when it belongs to `exam_id`. Returns affected rows.
pub(crate) async fn update_for_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    question_id: &str,
    question: &str,
    correct_answer: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE questions SET question = $3, correct_answer = $4
         WHERE id = $1 AND exam_id = $2",
    )
    .bind(question_id)
    .bind(exam_id)
    .bind(question)
    .bind(correct_answer)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

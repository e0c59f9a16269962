use serde::Serialize;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::core::time::add_minutes;
use crate::db::types::UserRole;

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    #[serde(skip)]
    pub(crate) hashed_password: String,
    pub(crate) role: UserRole,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct AuthSession {
    pub(crate) token_hash: String,
    pub(crate) user_id: String,
    pub(crate) expires_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) room_name: String,
    pub(crate) year: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) teacher_id: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) position: i32,
    pub(crate) question: String,
    pub(crate) correct_answer: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct ExamAttempt {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) exam_id: String,
    pub(crate) score: f64,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
}

impl ExamAttempt {
    pub(crate) fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub(crate) fn deadline(&self, duration_minutes: i32) -> PrimitiveDateTime {
        add_minutes(self.started_at, duration_minutes)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct StudentAnswer {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) answer: String,
    pub(crate) score: Option<f64>,
    pub(crate) max_score: Option<f64>,
    pub(crate) similarity: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

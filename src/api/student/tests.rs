use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::http::{header, Method, StatusCode};
use sqlx::PgPool;
use tower::ServiceExt;

use crate::api::cookies::ATTEMPT_COOKIE;
use crate::db::models::{Exam, Question, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::services::scoring::{AnswerScorer, EssayCorrection, ScoringItem};
use crate::test_support::{self, StubQaGenerator, StubScorer, TestContext};

struct Classroom {
    teacher: User,
    student: User,
    student_cookie: String,
    exam: Exam,
    questions: Vec<Question>,
}

async fn classroom(ctx: &TestContext, active: bool) -> Classroom {
    let teacher = test_support::insert_user(
        ctx.state.db(),
        "teacher@example.com",
        "Tara Teacher",
        "teacher-pass",
        UserRole::Teacher,
    )
    .await;
    let student = test_support::insert_user(
        ctx.state.db(),
        "student@example.com",
        "Sam Student",
        "student-pass",
        UserRole::Student,
    )
    .await;
    let student_cookie = test_support::session_cookie(&ctx.state, &student.id).await;
    let (exam, questions) = test_support::insert_exam(
        ctx.state.db(),
        &teacher.id,
        "Geography",
        active,
        &[("Capital of France?", "Paris"), ("Longest river?", "Nile")],
    )
    .await;

    Classroom { teacher, student, student_cookie, exam, questions }
}

/// Starts the exam and returns the `Cookie` header carrying both session and attempt.
async fn start_exam(ctx: &TestContext, room: &Classroom) -> (String, String) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::get_request(
            &format!("/student/take-exam/{}", room.exam.id),
            Some(&room.student_cookie),
        ))
        .await
        .expect("take exam");

    let status = response.status();
    let attempt_id = test_support::set_cookie_value(&response, ATTEMPT_COOKIE);
    let body = test_support::read_body(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert!(body.contains("Capital of France?"), "response: {body}");

    let attempt_id = attempt_id.expect("attempt cookie");
    let cookies = format!("{}; {ATTEMPT_COOKIE}={attempt_id}", room.student_cookie);
    (attempt_id, cookies)
}

fn answer_field(question: &Question) -> String {
    format!("answers[{}]", question.id)
}

async fn backdate_attempt(ctx: &TestContext, attempt_id: &str, minutes: i32) {
    sqlx::query(
        "UPDATE exam_attempts SET started_at = started_at - make_interval(mins => $2) WHERE id = $1",
    )
    .bind(attempt_id)
    .bind(minutes)
    .execute(ctx.state.db())
    .await
    .expect("backdate attempt");
}

async fn submit(
    ctx: &TestContext,
    room: &Classroom,
    cookies: &str,
    answers: &[(&str, &str)],
) -> (StatusCode, String) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::form_request(
            Method::POST,
            &format!("/student/submit-exam/{}", room.exam.id),
            Some(cookies),
            answers,
        ))
        .await
        .expect("submit");
    let status = response.status();
    (status, test_support::read_body(response).await)
}

/// Rewrites the first answer in the database while its scoring call is in flight.
#[derive(Default)]
struct EditingScorer {
    pool: OnceLock<PgPool>,
}

#[async_trait]
impl AnswerScorer for EditingScorer {
    async fn score(&self, items: &[ScoringItem]) -> anyhow::Result<Vec<EssayCorrection>> {
        let pool = self.pool.get().ok_or_else(|| anyhow::anyhow!("pool not set"))?;
        sqlx::query("UPDATE student_answers SET answer = 'Lyon' WHERE id = $1")
            .bind(&items[0].id)
            .execute(pool)
            .await?;
        Ok(items
            .iter()
            .map(|item| EssayCorrection {
                student_answer_id: item.id.clone(),
                score: 9.0,
                feedback: "stale".to_string(),
                max_score: 10.0,
                similarity: 0.9,
            })
            .collect())
    }
}

#[tokio::test]
async fn full_exam_flow_scores_and_completes_attempt() {
    let scorer = Arc::new(StubScorer::per_item(vec![3.0, 8.5], 10.0));
    let ctx = test_support::setup_test_context_with(
        Arc::new(StubQaGenerator::with_questions(2)),
        scorer.clone(),
    )
    .await;
    let room = classroom(&ctx, true).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::get_request("/student/dashboard", Some(&room.student_cookie)))
        .await
        .expect("dashboard");
    let body = test_support::read_body(response).await;
    assert!(body.contains("Geography"), "response: {body}");
    assert!(body.contains("Tara Teacher"), "response: {body}");

    let (attempt_id, cookies) = start_exam(&ctx, &room).await;

    let first = answer_field(&room.questions[0]);
    let second = answer_field(&room.questions[1]);
    let query = test_support::encode_form(&[(first.as_str(), "Paris")]);
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::htmx_get_request(
            &format!("/student/question/{}/2?{query}", room.exam.id),
            Some(&cookies),
        ))
        .await
        .expect("question partial");

    let status = response.status();
    let body = test_support::read_body(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert!(body.contains("Longest river?"), "response: {body}");
    assert!(body.contains("value=\"Paris\""), "response: {body}");
    assert!(!body.contains("<html"), "partial expected: {body}");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::form_request(
            Method::POST,
            &format!("/student/submit-exam/{}", room.exam.id),
            Some(&cookies),
            &[(first.as_str(), "Paris"), (second.as_str(), "The Nile")],
        ))
        .await
        .expect("submit");

    let status = response.status();
    let cleared = test_support::set_cookie_value(&response, ATTEMPT_COOKIE);
    let location = response.headers().get(header::LOCATION).cloned();
    let body = test_support::read_body(response).await;
    assert_eq!(status, StatusCode::SEE_OTHER, "response: {body}");
    assert_eq!(
        location.expect("location"),
        format!("/student/exam-result/{}", room.exam.id).as_str()
    );
    assert_eq!(cleared.as_deref(), Some(""));
    assert_eq!(scorer.call_count(), 1);

    let attempt = repositories::attempts::find_by_id(ctx.state.db(), &attempt_id)
        .await
        .expect("query")
        .expect("attempt");
    assert!(attempt.is_completed());
    assert_eq!(attempt.score, 11.5);

    let answers =
        repositories::answers::list_by_attempt(ctx.state.db(), &attempt_id).await.expect("answers");
    let score_of = |question: &Question| {
        answers.iter().find(|answer| answer.question_id == question.id).and_then(|a| a.score)
    };
    assert_eq!(answers.len(), 2);
    assert_eq!(score_of(&room.questions[0]), Some(3.0));
    assert_eq!(score_of(&room.questions[1]), Some(8.5));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::get_request(
            &format!("/student/exam-result/{}", room.exam.id),
            Some(&room.student_cookie),
        ))
        .await
        .expect("result");
    let status = response.status();
    let body = test_support::read_body(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert!(body.contains("11.5 / 20"), "response: {body}");
    assert!(body.contains("58%"), "response: {body}");
    assert!(body.contains("The Nile"), "response: {body}");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::get_request("/student/exam-result", Some(&room.student_cookie)))
        .await
        .expect("score list");
    let body = test_support::read_body(response).await;
    assert!(body.contains("Geography"), "response: {body}");

    let teacher_cookie = test_support::session_cookie(&ctx.state, &room.teacher.id).await;
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::get_request(
            &format!("/teacher/check-exam/{}", room.exam.id),
            Some(&teacher_cookie),
        ))
        .await
        .expect("check exam");
    let body = test_support::read_body(response).await;
    assert!(body.contains("Sam Student"), "response: {body}");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::get_request(
            &format!("/teacher/exam-result/{}?exam_id={}", room.student.id, room.exam.id),
            Some(&teacher_cookie),
        ))
        .await
        .expect("teacher result");
    let status = response.status();
    let body = test_support::read_body(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert!(body.contains("Feedback for Capital of France?"), "response: {body}");
}

#[tokio::test]
async fn second_submission_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let room = classroom(&ctx, true).await;
    let (_, cookies) = start_exam(&ctx, &room).await;
    let first = answer_field(&room.questions[0]);

    for expected in [StatusCode::SEE_OTHER, StatusCode::CONFLICT] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::form_request(
                Method::POST,
                &format!("/student/submit-exam/{}", room.exam.id),
                Some(&cookies),
                &[(first.as_str(), "Paris")],
            ))
            .await
            .expect("submit");
        let status = response.status();
        let body = test_support::read_body(response).await;
        assert_eq!(status, expected, "response: {body}");
    }
}

#[tokio::test]
async fn taking_again_resumes_open_attempt() {
    let ctx = test_support::setup_test_context().await;
    let room = classroom(&ctx, true).await;

    let (first_attempt, _) = start_exam(&ctx, &room).await;
    let (second_attempt, _) = start_exam(&ctx, &room).await;

    assert_eq!(first_attempt, second_attempt);
}

#[tokio::test]
async fn inactive_exam_cannot_be_taken() {
    let ctx = test_support::setup_test_context().await;
    let room = classroom(&ctx, false).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::get_request(
            &format!("/student/take-exam/{}", room.exam.id),
            Some(&room.student_cookie),
        ))
        .await
        .expect("take exam");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn question_without_attempt_cookie_is_unauthorized() {
    let ctx = test_support::setup_test_context().await;
    let room = classroom(&ctx, true).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::htmx_get_request(
            &format!("/student/question/{}/1", room.exam.id),
            Some(&room.student_cookie),
        ))
        .await
        .expect("question");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn question_number_out_of_range_is_not_found() {
    let ctx = test_support::setup_test_context().await;
    let room = classroom(&ctx, true).await;
    let (_, cookies) = start_exam(&ctx, &room).await;

    for number in ["0", "3", "two"] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::htmx_get_request(
                &format!("/student/question/{}/{number}", room.exam.id),
                Some(&cookies),
            ))
            .await
            .expect("question");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "question {number}");
    }
}

#[tokio::test]
async fn answers_for_foreign_questions_are_rejected() {
    let scorer = Arc::new(StubScorer::fixed(5.0, 10.0));
    let ctx = test_support::setup_test_context_with(
        Arc::new(StubQaGenerator::with_questions(1)),
        scorer.clone(),
    )
    .await;
    let room = classroom(&ctx, true).await;
    let (attempt_id, cookies) = start_exam(&ctx, &room).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::form_request(
            Method::POST,
            &format!("/student/submit-exam/{}", room.exam.id),
            Some(&cookies),
            &[("answers[not-a-question]", "sneaky")],
        ))
        .await
        .expect("submit");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(scorer.call_count(), 0);

    let attempt = repositories::attempts::find_by_id(ctx.state.db(), &attempt_id)
        .await
        .expect("query")
        .expect("attempt");
    assert!(!attempt.is_completed());
}

#[tokio::test]
async fn scoring_failure_keeps_attempt_open_with_saved_answers() {
    let scorer = Arc::new(StubScorer::failing());
    let ctx = test_support::setup_test_context_with(
        Arc::new(StubQaGenerator::with_questions(1)),
        scorer.clone(),
    )
    .await;
    let room = classroom(&ctx, true).await;
    let (attempt_id, cookies) = start_exam(&ctx, &room).await;
    let first = answer_field(&room.questions[0]);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::form_request(
            Method::POST,
            &format!("/student/submit-exam/{}", room.exam.id),
            Some(&cookies),
            &[(first.as_str(), "Paris")],
        ))
        .await
        .expect("submit");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(test_support::set_cookie_value(&response, ATTEMPT_COOKIE).is_none());
    assert_eq!(scorer.call_count(), 1);

    let attempt = repositories::attempts::find_by_id(ctx.state.db(), &attempt_id)
        .await
        .expect("query")
        .expect("attempt");
    assert!(!attempt.is_completed());

    let answers =
        repositories::answers::list_by_attempt(ctx.state.db(), &attempt_id).await.expect("answers");
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].answer, "Paris");
    assert_eq!(answers[0].score, None);
}

#[tokio::test]
async fn empty_submission_completes_with_zero_without_scoring() {
    let scorer = Arc::new(StubScorer::fixed(5.0, 10.0));
    let ctx = test_support::setup_test_context_with(
        Arc::new(StubQaGenerator::with_questions(1)),
        scorer.clone(),
    )
    .await;
    let room = classroom(&ctx, true).await;
    let (attempt_id, cookies) = start_exam(&ctx, &room).await;
    let first = answer_field(&room.questions[0]);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::form_request(
            Method::POST,
            &format!("/student/submit-exam/{}", room.exam.id),
            Some(&cookies),
            &[(first.as_str(), "   ")],
        ))
        .await
        .expect("submit");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(scorer.call_count(), 0);

    let attempt = repositories::attempts::find_by_id(ctx.state.db(), &attempt_id)
        .await
        .expect("query")
        .expect("attempt");
    assert!(attempt.is_completed());
    assert_eq!(attempt.score, 0.0);
}

#[tokio::test]
async fn student_cannot_submit_another_students_attempt() {
    let ctx = test_support::setup_test_context().await;
    let room = classroom(&ctx, true).await;
    let (attempt_id, _) = start_exam(&ctx, &room).await;

    let intruder = test_support::insert_user(
        ctx.state.db(),
        "intruder@example.com",
        "Ivy Intruder",
        "student-pass",
        UserRole::Student,
    )
    .await;
    let intruder_cookie = test_support::session_cookie(&ctx.state, &intruder.id).await;
    let cookies = format!("{intruder_cookie}; {ATTEMPT_COOKIE}={attempt_id}");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::form_request(
            Method::POST,
            &format!("/student/submit-exam/{}", room.exam.id),
            Some(&cookies),
            &[],
        ))
        .await
        .expect("submit");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn resumed_attempt_after_scoring_failure_keeps_saved_answers() {
    let scorer = Arc::new(StubScorer::failing());
    let ctx = test_support::setup_test_context_with(
        Arc::new(StubQaGenerator::with_questions(2)),
        scorer.clone(),
    )
    .await;
    let room = classroom(&ctx, true).await;
    let (attempt_id, cookies) = start_exam(&ctx, &room).await;
    let first = answer_field(&room.questions[0]);
    let second = answer_field(&room.questions[1]);

    let (status, body) =
        submit(&ctx, &room, &cookies, &[(first.as_str(), "Paris"), (second.as_str(), "Nile")])
            .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY, "response: {body}");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::get_request(
            &format!("/student/take-exam/{}", room.exam.id),
            Some(&room.student_cookie),
        ))
        .await
        .expect("take exam again");
    assert_eq!(
        test_support::set_cookie_value(&response, ATTEMPT_COOKIE).as_deref(),
        Some(attempt_id.as_str())
    );
    let body = test_support::read_body(response).await;
    assert!(body.contains(">Paris</textarea>"), "response: {body}");
    assert!(
        body.contains(&format!("name=\"{second}\" value=\"Nile\"")),
        "response: {body}"
    );

    // The page as rendered: the textarea for question 1 plus the carried answer for question 2.
    let (status, body) =
        submit(&ctx, &room, &cookies, &[(second.as_str(), "Nile"), (first.as_str(), "Paris")])
            .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY, "response: {body}");

    let mut answers: Vec<String> =
        repositories::answers::list_by_attempt(ctx.state.db(), &attempt_id)
            .await
            .expect("answers")
            .into_iter()
            .map(|answer| answer.answer)
            .collect();
    answers.sort();
    assert_eq!(answers, ["Nile", "Paris"]);
}

#[tokio::test]
async fn question_after_deadline_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let room = classroom(&ctx, true).await;
    let (attempt_id, cookies) = start_exam(&ctx, &room).await;
    backdate_attempt(&ctx, &attempt_id, room.exam.duration_minutes + 1).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::htmx_get_request(
            &format!("/student/question/{}/2", room.exam.id),
            Some(&cookies),
        ))
        .await
        .expect("question");

    let status = response.status();
    let body = test_support::read_body(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert!(body.contains("Attempt has expired"), "response: {body}");
}

#[tokio::test]
async fn submit_inside_grace_window_is_accepted() {
    let ctx = test_support::setup_test_context().await;
    let room = classroom(&ctx, true).await;
    let (attempt_id, cookies) = start_exam(&ctx, &room).await;
    // One minute past the deadline, well inside the five minute grace.
    backdate_attempt(&ctx, &attempt_id, room.exam.duration_minutes + 1).await;
    let first = answer_field(&room.questions[0]);

    let (status, body) = submit(&ctx, &room, &cookies, &[(first.as_str(), "Paris")]).await;
    assert_eq!(status, StatusCode::SEE_OTHER, "response: {body}");

    let attempt = repositories::attempts::find_by_id(ctx.state.db(), &attempt_id)
        .await
        .expect("query")
        .expect("attempt");
    assert!(attempt.is_completed());
}

#[tokio::test]
async fn submit_after_grace_window_is_rejected() {
    let scorer = Arc::new(StubScorer::fixed(5.0, 10.0));
    let ctx = test_support::setup_test_context_with(
        Arc::new(StubQaGenerator::with_questions(1)),
        scorer.clone(),
    )
    .await;
    let room = classroom(&ctx, true).await;
    let (attempt_id, cookies) = start_exam(&ctx, &room).await;
    backdate_attempt(&ctx, &attempt_id, room.exam.duration_minutes + 10).await;
    let first = answer_field(&room.questions[0]);

    let (status, body) = submit(&ctx, &room, &cookies, &[(first.as_str(), "Paris")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert!(body.contains("submission window"), "response: {body}");
    assert_eq!(scorer.call_count(), 0);

    let answers =
        repositories::answers::list_by_attempt(ctx.state.db(), &attempt_id).await.expect("answers");
    assert!(answers.is_empty());
}

#[tokio::test]
async fn expired_attempt_is_replaced_on_next_take() {
    let ctx = test_support::setup_test_context().await;
    let room = classroom(&ctx, true).await;

    let (expired, _) = start_exam(&ctx, &room).await;
    backdate_attempt(&ctx, &expired, room.exam.duration_minutes + 1).await;
    let (fresh, _) = start_exam(&ctx, &room).await;

    assert_ne!(expired, fresh);
    let old = repositories::attempts::find_by_id(ctx.state.db(), &expired)
        .await
        .expect("query")
        .expect("attempt");
    assert!(!old.is_completed());
}

#[tokio::test]
async fn answers_edited_during_scoring_are_not_finalized() {
    let scorer = Arc::new(EditingScorer::default());
    let ctx = test_support::setup_test_context_with(
        Arc::new(StubQaGenerator::with_questions(1)),
        scorer.clone(),
    )
    .await;
    scorer.pool.set(ctx.state.db().clone()).expect("pool set once");
    let room = classroom(&ctx, true).await;
    let (attempt_id, cookies) = start_exam(&ctx, &room).await;
    let first = answer_field(&room.questions[0]);

    let (status, body) = submit(&ctx, &room, &cookies, &[(first.as_str(), "Paris")]).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");

    let attempt = repositories::attempts::find_by_id(ctx.state.db(), &attempt_id)
        .await
        .expect("query")
        .expect("attempt");
    assert!(!attempt.is_completed());

    let answers =
        repositories::answers::list_by_attempt(ctx.state.db(), &attempt_id).await.expect("answers");
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].answer, "Lyon");
    assert_eq!(answers[0].score, None);
}

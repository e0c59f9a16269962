use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::core::redis::RedisHandle;
use crate::services::qa_generation::QaGenerator;
use crate::services::scoring::AnswerScorer;

/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub(crate) struct AppState(Arc<Shared>);

struct Shared {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    qa_generator: Arc<dyn QaGenerator>,
    scorer: Arc<dyn AnswerScorer>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        redis: RedisHandle,
        qa_generator: Arc<dyn QaGenerator>,
        scorer: Arc<dyn AnswerScorer>,
    ) -> Self {
        Self(Arc::new(Shared { settings, db, redis, qa_generator, scorer }))
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.0.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.0.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.0.redis
    }

    /// External model that turns a PDF into question/answer pairs.
    pub(crate) fn qa_generator(&self) -> &dyn QaGenerator {
        &*self.0.qa_generator
    }

    /// External service that grades essay answers.
    pub(crate) fn scorer(&self) -> &dyn AnswerScorer {
        &*self.0.scorer
    }
}

use super::parsing::{first_of, flag, number, text, var};
use super::types::{
    AiSettings, ConfigError, DatabaseSettings, Environment, ExamSettings, RedisSettings,
    RuntimeSettings, ScoringSettings, ServerSettings, SessionSettings, Settings, StorageSettings,
    TelemetrySettings, DEFAULT_SCORING_API_URL,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let environment =
            Environment::from_name(var("APP_ENV").or_else(|| var("ENVIRONMENT")).as_deref());
        let runtime = RuntimeSettings {
            environment,
            strict_config: flag("APP_STRICT_CONFIG") || environment.is_production(),
        };

        let scoring_url = var("SCORING_API_URL");

        let settings = Self {
            server: load_server()?,
            runtime,
            database: load_database()?,
            redis: load_redis()?,
            session: SessionSettings {
                cookie_name: text("SESSION_NAME", "saygenfix_session"),
                max_age_seconds: number("SESSION_MAX_AGE", 86_400)?,
                cookie_secure: flag("SESSION_COOKIE_SECURE"),
            },
            exam: ExamSettings {
                attempt_cookie_hours: number("ATTEMPT_COOKIE_HOURS", 3)?,
                submit_grace_seconds: number("SUBMIT_GRACE_SECONDS", 300)?,
                max_questions_per_exam: number("MAX_QUESTIONS_PER_EXAM", 50)?,
            },
            ai: AiSettings {
                gemini_api_key: text("GEMINI_API_KEY", ""),
                gemini_base_url: text(
                    "GEMINI_BASE_URL",
                    "https://generativelanguage.googleapis.com/v1beta",
                ),
                gemini_model: text("GEMINI_MODEL", "gemini-2.5-pro"),
                ai_request_timeout: number("AI_REQUEST_TIMEOUT", 300)?,
            },
            scoring: ScoringSettings {
                url_from_default: scoring_url.is_none(),
                api_url: scoring_url.unwrap_or_else(|| DEFAULT_SCORING_API_URL.to_string()),
                api_key: text("SCORING_API_KEY", ""),
                request_timeout: number("SCORING_REQUEST_TIMEOUT", 120)?,
            },
            storage: StorageSettings {
                max_upload_size_mb: number("MAX_UPLOAD_SIZE_MB", 10)?,
                static_dir: text("APP_STATIC_DIR", "static"),
            },
            telemetry: TelemetrySettings {
                log_level: text("APP_LOG_LEVEL", "info"),
                json: flag("APP_LOG_JSON"),
                prometheus_enabled: flag("PROMETHEUS_ENABLED"),
            },
        };

        settings.check_limits()?;
        if settings.runtime.strict_config {
            settings.check_secrets()?;
        }
        Ok(settings)
    }

    pub(crate) fn server(&self) -> &ServerSettings {
        &self.server
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub(crate) fn exam(&self) -> &ExamSettings {
        &self.exam
    }

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub(crate) fn scoring(&self) -> &ScoringSettings {
        &self.scoring
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    fn check_limits(&self) -> Result<(), ConfigError> {
        let cookie_name = &self.session.cookie_name;
        if cookie_name.chars().any(|ch| !(ch.is_ascii_alphanumeric() || ch == '_')) {
            return Err(ConfigError::InvalidValue {
                field: "SESSION_NAME",
                value: cookie_name.clone(),
            });
        }

        let zero_checks = [
            ("SESSION_MAX_AGE", self.session.max_age_seconds == 0),
            ("ATTEMPT_COOKIE_HOURS", self.exam.attempt_cookie_hours == 0),
            ("MAX_QUESTIONS_PER_EXAM", self.exam.max_questions_per_exam == 0),
            ("MAX_UPLOAD_SIZE_MB", self.storage.max_upload_size_mb == 0),
            ("DB_MAX_CONNECTIONS", self.database.max_connections == 0),
        ];
        match zero_checks.into_iter().find(|(_, is_zero)| *is_zero) {
            Some((field, _)) => Err(ConfigError::InvalidValue { field, value: "0".to_string() }),
            None => Ok(()),
        }
    }

    fn check_secrets(&self) -> Result<(), ConfigError> {
        if !self.database.has_credentials {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.ai.gemini_api_key.is_empty() {
            return Err(ConfigError::MissingSecret("GEMINI_API_KEY"));
        }
        if self.scoring.url_from_default {
            return Err(ConfigError::MissingSecret("SCORING_API_URL"));
        }
        if self.scoring.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("SCORING_API_KEY"));
        }
        Ok(())
    }
}

fn load_server() -> Result<ServerSettings, ConfigError> {
    let host = text("APP_HOST", "0.0.0.0");
    let port: u16 = number("APP_PORT", 8080)?;
    if port == 0 {
        return Err(ConfigError::InvalidValue { field: "APP_PORT", value: "0".to_string() });
    }
    Ok(ServerSettings { host, port })
}

fn load_database() -> Result<DatabaseSettings, ConfigError> {
    let max_connections = number("DB_MAX_CONNECTIONS", 30)?;

    if let Some(url) = first_of(&["DATABASE_URL", "DB_URL"]) {
        return Ok(DatabaseSettings { url, max_connections, has_credentials: true });
    }

    let server = text("POSTGRES_SERVER", "localhost");
    let port: u16 = number("POSTGRES_PORT", 5432)?;
    let user = text("POSTGRES_USER", "saygenfix");
    let password = text("POSTGRES_PASSWORD", "");
    let db = text("POSTGRES_DB", "saygenfix");

    Ok(DatabaseSettings {
        url: format!("postgresql://{user}:{password}@{server}:{port}/{db}"),
        max_connections,
        has_credentials: !password.is_empty(),
    })
}

fn load_redis() -> Result<RedisSettings, ConfigError> {
    let host = text("REDIS_HOST", "localhost");
    let port: u16 = number("REDIS_PORT", 6379)?;
    let db: u16 = number("REDIS_DB", 0)?;

    let url = match var("REDIS_PASSWORD") {
        Some(password) => format!("redis://:{password}@{host}:{port}/{db}"),
        None => format!("redis://{host}:{port}/{db}"),
    };
    Ok(RedisSettings { url })
}

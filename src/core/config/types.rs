use thiserror::Error;
use time::Duration;

pub(super) const DEFAULT_SCORING_API_URL: &str = "http://localhost:5000/score";

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(super) server: ServerSettings,
    pub(super) runtime: RuntimeSettings,
    pub(super) database: DatabaseSettings,
    pub(super) redis: RedisSettings,
    pub(super) session: SessionSettings,
    pub(super) exam: ExamSettings,
    pub(super) ai: AiSettings,
    pub(super) scoring: ScoringSettings,
    pub(super) storage: StorageSettings,
    pub(super) telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub(crate) struct ServerSettings {
    pub(crate) host: String,
    pub(crate) port: u16,
}

impl ServerSettings {
    pub(crate) fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) environment: Environment,
    pub(crate) strict_config: bool,
}

/// Connection string is resolved at load time from `DATABASE_URL`/`DB_URL` or `POSTGRES_*`.
#[derive(Debug, Clone)]
pub(crate) struct DatabaseSettings {
    pub(crate) url: String,
    pub(crate) max_connections: u32,
    pub(super) has_credentials: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RedisSettings {
    pub(crate) url: String,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionSettings {
    pub(crate) cookie_name: String,
    pub(crate) max_age_seconds: u64,
    pub(crate) cookie_secure: bool,
}

impl SessionSettings {
    pub(crate) fn max_age(&self) -> Duration {
        saturating_seconds(self.max_age_seconds)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ExamSettings {
    pub(crate) attempt_cookie_hours: u64,
    pub(crate) submit_grace_seconds: u64,
    pub(crate) max_questions_per_exam: u32,
}

impl ExamSettings {
    pub(crate) fn attempt_cookie_max_age(&self) -> Duration {
        saturating_seconds(self.attempt_cookie_hours.saturating_mul(3600))
    }

    pub(crate) fn submit_grace(&self) -> Duration {
        saturating_seconds(self.submit_grace_seconds)
    }
}

/// Oversized settings clamp to the longest representable span instead of wrapping.
fn saturating_seconds(seconds: u64) -> Duration {
    Duration::seconds(i64::try_from(seconds).unwrap_or(i64::MAX))
}

#[derive(Debug, Clone)]
pub(crate) struct AiSettings {
    pub(crate) gemini_api_key: String,
    pub(crate) gemini_base_url: String,
    pub(crate) gemini_model: String,
    pub(crate) ai_request_timeout: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct ScoringSettings {
    pub(crate) api_url: String,
    pub(crate) api_key: String,
    pub(crate) request_timeout: u64,
    /// `SCORING_API_URL` was unset and the local fallback is in use.
    pub(crate) url_from_default: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct StorageSettings {
    pub(crate) max_upload_size_mb: u64,
    pub(crate) static_dir: String,
}

impl StorageSettings {
    pub(crate) fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_size_mb)
            .unwrap_or(usize::MAX)
            .saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
    pub(crate) prometheus_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    /// Unknown or missing names fall back to development.
    pub(super) fn from_name(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return Self::Development;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "staging" => Self::Staging,
            "test" | "testing" => Self::Test,
            _ => Self::Development,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    pub(super) fn is_production(self) -> bool {
        self == Self::Production
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("missing required secret for {0}")]
    MissingSecret(&'static str),
}

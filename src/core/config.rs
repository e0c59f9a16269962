mod parsing;
mod settings;
mod types;

pub(crate) use types::{DatabaseSettings, Settings, TelemetrySettings};

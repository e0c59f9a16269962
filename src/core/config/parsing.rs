use std::env;
use std::str::FromStr;

use super::types::ConfigError;

/// Trimmed value of `key`; blank counts as unset.
pub(super) fn var(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn text(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| default.to_string())
}

/// First key that is set wins.
pub(super) fn first_of(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| var(key))
}

pub(super) fn flag(key: &str) -> bool {
    var(key).is_some_and(|value| is_truthy(&value))
}

pub(super) fn number<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match var(key) {
        Some(raw) => parse_number(key, &raw),
        None => Ok(default),
    }
}

pub(super) fn parse_number<T: FromStr>(field: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse::<T>().map_err(|_| ConfigError::InvalidValue { field, value: raw.to_string() })
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_flags() {
        for value in ["1", "true", "YES", "On"] {
            assert!(is_truthy(value), "{value}");
        }
        for value in ["0", "false", "off", ""] {
            assert!(!is_truthy(value), "{value}");
        }
    }

    #[test]
    fn parse_number_names_the_field() {
        let err = parse_number::<u64>("SESSION_MAX_AGE", "soon").unwrap_err();
        assert_eq!(err.to_string(), "invalid value for SESSION_MAX_AGE: soon");

        assert_eq!(parse_number::<u16>("APP_PORT", "8080").expect("port"), 8080);
        assert!(parse_number::<u16>("APP_PORT", "70000").is_err());
    }
}

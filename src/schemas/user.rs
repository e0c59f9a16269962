use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::db::types::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RegisterForm {
    #[validate(
        email(message = "Please enter a valid email address"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub(crate) email: String,
    #[validate(
        length(min = 3, max = 255, message = "Full name must be between 3 and 255 characters"),
        custom(function = "validate_person_name")
    )]
    pub(crate) full_name: String,
    #[validate(length(min = 6, max = 255, message = "Password must be between 6 and 255 characters"))]
    pub(crate) password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub(crate) confirm_password: String,
    #[serde(default)]
    pub(crate) role: String,
}

impl RegisterForm {
    /// Trims the free-text fields and lowercases the email before validation.
    pub(crate) fn normalized(mut self) -> Self {
        self.email = self.email.trim().to_ascii_lowercase();
        self.full_name = self.full_name.split_whitespace().collect::<Vec<_>>().join(" ");
        self
    }

    pub(crate) fn parsed_role(&self) -> Option<UserRole> {
        UserRole::parse(&self.role)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    pub(crate) email: String,
    pub(crate) password: String,
}

impl LoginForm {
    pub(crate) fn normalized_email(&self) -> String {
        self.email.trim().to_ascii_lowercase()
    }
}

fn validate_person_name(value: &str) -> Result<(), ValidationError> {
    let allowed = |ch: char| ch.is_alphabetic() || matches!(ch, ' ' | '.' | '\'' | '-');
    if value.chars().all(allowed) {
        Ok(())
    } else {
        let mut error = ValidationError::new("person_name");
        error.message =
            Some("Full name may only contain letters, spaces, dots, apostrophes and hyphens".into());
        Err(error)
    }
}

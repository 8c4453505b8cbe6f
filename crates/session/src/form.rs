//! Login form validation
//!
//! Checks run before any request is made; a form that fails them never
//! reaches the network.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid"));

/// Client-side form errors, worded for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a valid email address.")]
    InvalidEmail,

    #[error("Password must be at least 6 characters long.")]
    PasswordTooShort,
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            remember_me: false,
        }
    }

    #[must_use]
    pub const fn remember_me(mut self, remember: bool) -> Self {
        self.remember_me = remember;
        self
    }

    /// Every failing check, in field order
    pub fn errors(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.email.is_empty() || !EMAIL_PATTERN.is_match(&self.email) {
            errors.push(ValidationError::InvalidEmail);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(ValidationError::PasswordTooShort);
        }
        errors
    }

    /// First failing check, if any
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.errors().into_iter().next().map_or(Ok(()), Err)
    }
}

// Passwords stay out of logs.
impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("remember_me", &self.remember_me)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_form() {
        assert_eq!(LoginForm::new("a@b.com", "secret1").validate(), Ok(()));
    }

    #[test]
    fn test_invalid_email() {
        for email in ["", "plainaddress", "a@b", "@b.com x"] {
            assert_eq!(
                LoginForm::new(email, "secret1").validate(),
                Err(ValidationError::InvalidEmail),
                "{email:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_short_password() {
        let err = LoginForm::new("a@b.com", "12345").validate().unwrap_err();
        assert_eq!(err, ValidationError::PasswordTooShort);
        assert_eq!(err.to_string(), "Password must be at least 6 characters long.");
    }

    #[test]
    fn test_collects_all_errors() {
        let errors = LoginForm::new("nope", "").errors();
        assert_eq!(
            errors,
            [ValidationError::InvalidEmail, ValidationError::PasswordTooShort]
        );
    }

    #[test]
    fn test_debug_hides_password() {
        let form = LoginForm::new("a@b.com", "secret1").remember_me(true);
        let debug = format!("{form:?}");
        assert!(!debug.contains("secret1"));
        assert!(debug.contains("a@b.com"));
    }
}

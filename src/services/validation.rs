use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::constants::auth::{MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, OTP_LENGTH};

/// Field name (as the client spelled it) to human readable messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// First message overall, used as the response summary.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        self.0.values().flatten().next().map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn label(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for c in field.chars() {
        if c.is_uppercase() {
            out.push(' ');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$")
            .expect("Invalid regex pattern defined in code")
    })
}

#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Records a "required" error for blank input and hands back the trimmed value.
pub fn required<'a>(errors: &mut FieldErrors, field: &str, value: &'a str) -> Option<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, format!("The {} field is required.", label(field)));
        None
    } else {
        Some(trimmed)
    }
}

pub fn check_email(errors: &mut FieldErrors, field: &str, email: &str) {
    if email.len() > MAX_EMAIL_LENGTH {
        errors.add(
            field,
            format!(
                "The {} must not be greater than {MAX_EMAIL_LENGTH} characters.",
                label(field)
            ),
        );
    } else if !email_regex().is_match(email) {
        errors.add(
            field,
            format!("The {} must be a valid email address.", label(field)),
        );
    }
}

pub fn check_name(errors: &mut FieldErrors, field: &str, name: &str) {
    if name.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            field,
            format!(
                "The {} must not be greater than {MAX_NAME_LENGTH} characters.",
                label(field)
            ),
        );
    }
}

/// Passwords are not trimmed; whitespace counts toward the length.
pub fn check_password(errors: &mut FieldErrors, field: &str, password: &str, min_length: usize) {
    if password.is_empty() {
        errors.add(field, format!("The {} field is required.", label(field)));
    } else if password.chars().count() < min_length {
        errors.add(
            field,
            format!(
                "The {} must be at least {min_length} characters.",
                label(field)
            ),
        );
    }
}

pub fn check_confirmation(errors: &mut FieldErrors, field: &str, value: &str, confirmation: &str) {
    if value != confirmation {
        errors.add(
            field,
            format!("The {} confirmation does not match.", label(field)),
        );
    }
}

pub fn check_otp(errors: &mut FieldErrors, field: &str, otp: &str) {
    if otp.chars().count() != OTP_LENGTH {
        errors.add(
            field,
            format!("The {} must be {OTP_LENGTH} characters.", label(field)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ann@X.com "), "ann@x.com");
    }

    #[test]
    fn test_check_email() {
        for ok in ["ann@x.com", "a.b+c@sub.example.org"] {
            let mut errors = FieldErrors::new();
            check_email(&mut errors, "email", ok);
            assert!(errors.is_empty(), "{ok} should be valid");
        }

        for bad in ["ann", "ann@", "@x.com", "ann@x", "a nn@x.com", "ann@x..com"] {
            let mut errors = FieldErrors::new();
            check_email(&mut errors, "email", bad);
            assert!(errors.has("email"), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_required_trims() {
        let mut errors = FieldErrors::new();
        assert_eq!(required(&mut errors, "firstName", "  Ann "), Some("Ann"));
        assert_eq!(required(&mut errors, "lastName", "   "), None);
        assert_eq!(
            errors.get("lastName").unwrap(),
            ["The last name field is required.".to_string()]
        );
    }

    #[test]
    fn test_check_password() {
        let mut errors = FieldErrors::new();
        check_password(&mut errors, "password", "1234567", 8);
        assert!(errors.has("password"));

        let mut errors = FieldErrors::new();
        check_password(&mut errors, "password", "12345678", 8);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_check_otp_length() {
        let mut errors = FieldErrors::new();
        check_otp(&mut errors, "otp", "12345");
        check_otp(&mut errors, "otp", "1234567");
        assert_eq!(errors.get("otp").unwrap().len(), 2);

        let mut errors = FieldErrors::new();
        check_otp(&mut errors, "otp", "012345");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_check_confirmation() {
        let mut errors = FieldErrors::new();
        check_confirmation(&mut errors, "password", "newpass123", "newpass124");
        assert_eq!(errors.first_message(), Some("The password confirmation does not match."));
    }

    #[test]
    fn test_field_errors_serialize_as_map() {
        let errors = FieldErrors::single("email", "taken");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "email": ["taken"] }));
    }
}

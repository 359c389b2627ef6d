//! Client-side checks run before a form is submitted.
//!
//! Errors use the same field names as the server (`firstName`, `phone`, ...),
//! so a form shows local and server-side messages the same way.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::api::{FieldErrors, TeamMemberInput};

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"^[0-9]{10}$") {
    Ok(re) => re,
    Err(_) => unreachable!("static regex pattern"),
});

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| match Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern"),
    });

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid team member: {0}")]
pub struct ValidationError(pub FieldErrors);

impl ValidationError {
    #[must_use]
    pub const fn fields(&self) -> &FieldErrors {
        &self.0
    }
}

fn required(errors: &mut FieldErrors, field: &str, label: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.push(field, format!("{label} is a required field"));
        false
    } else {
        true
    }
}

/// Checks a create or update body.
///
/// # Errors
///
/// Returns every failed check, keyed by field.
pub fn validate(input: &TeamMemberInput) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::new();

    required(&mut errors, "firstName", "First Name", &input.first_name);
    required(&mut errors, "lastName", "Last Name", &input.last_name);

    if required(&mut errors, "phone", "Phone Number", &input.phone) && !PHONE_RE.is_match(&input.phone) {
        errors.push("phone", "Phone number must be exactly 10 characters (digits only)");
    }

    if required(&mut errors, "email", "Email", &input.email) && !EMAIL_RE.is_match(input.email.trim()) {
        errors.push("email", "Email must be a valid email");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Role;

    fn input() -> TeamMemberInput {
        TeamMemberInput {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "5551234567".into(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_valid_input_passes() {
        assert_eq!(validate(&input()), Ok(()));
    }

    #[test]
    fn test_missing_fields_are_required() {
        let err = validate(&TeamMemberInput::default()).unwrap_err();
        let fields = err.fields();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields.first("firstName"), Some("First Name is a required field"));
        assert_eq!(fields.first("lastName"), Some("Last Name is a required field"));
        assert_eq!(fields.first("phone"), Some("Phone Number is a required field"));
        assert_eq!(fields.first("email"), Some("Email is a required field"));
        assert_eq!(fields.get("phone").map(<[String]>::len), Some(1));
    }

    #[test]
    fn test_phone_must_be_ten_digits() {
        for phone in ["555123456", "55512345678", "555-123-4567", "555123456a"] {
            let err = validate(&TeamMemberInput {
                phone: phone.into(),
                ..input()
            })
            .unwrap_err();
            assert_eq!(
                err.fields().first("phone"),
                Some("Phone number must be exactly 10 characters (digits only)"),
                "{phone}"
            );
        }
    }

    #[test]
    fn test_email_must_be_well_formed() {
        for email in ["ada", "ada@", "ada@example", "a da@example.com"] {
            let err = validate(&TeamMemberInput {
                email: email.into(),
                ..input()
            })
            .unwrap_err();
            assert_eq!(err.fields().first("email"), Some("Email must be a valid email"), "{email}");
            assert!(!err.fields().contains("phone"));
        }
    }
}

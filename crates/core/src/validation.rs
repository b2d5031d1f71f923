//! Input validation helpers.
//!
//! Validators collect every violated rule into a [`Violations`] list so a
//! caller sees all problems at once; [`Violations::finish`] turns a
//! non-empty list into a single [`DomainError::Validation`] whose message
//! joins the entries with `", "`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DomainError, DomainResult};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"));
static LETTERS_AND_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s]+$").expect("static regex"));

/// Characters that satisfy the "special character" password rule.
pub const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+";

/// Accumulated rule violations for one input.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` unless `ok` holds.
    pub fn check(&mut self, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.0.push(message.into());
        }
        self
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    /// Inclusive character-length bounds on a (trimmed) value.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.chars().count();
        if len < min {
            if min == 1 {
                self.push(format!("{field} is required"));
            } else {
                self.push(format!("{field} must be at least {min} characters"));
            }
        } else if len > max {
            self.push(format!("{field} must be at most {max} characters"));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(is_email(value), format!("{field} must be a valid email address"))
    }

    /// Strong-password rules: minimum length plus one of each character class.
    pub fn strong_password(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        if value.chars().count() < min {
            self.push(format!("{field} must be at least {min} characters"));
        }
        self.check(
            value.chars().any(|c| c.is_ascii_uppercase()),
            format!("{field} must contain at least one uppercase letter"),
        );
        self.check(
            value.chars().any(|c| c.is_ascii_lowercase()),
            format!("{field} must contain at least one lowercase letter"),
        );
        self.check(
            value.chars().any(|c| c.is_ascii_digit()),
            format!("{field} must contain at least one number"),
        );
        self.check(
            value.chars().any(|c| PASSWORD_SPECIALS.contains(c)),
            format!("{field} must contain at least one special character"),
        )
    }

    /// Digits only, with an inclusive length range.
    pub fn digits(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let ok = is_digits(value) && (min..=max).contains(&value.len());
        let message = if min == max {
            format!("{field} must be exactly {min} digits")
        } else {
            format!("{field} must be between {min} and {max} digits")
        };
        self.check(ok, message)
    }

    pub fn letters_and_spaces(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(
            value.is_empty() || LETTERS_AND_SPACES.is_match(value),
            format!("{field} must contain only letters and spaces"),
        )
    }

    pub fn positive(&mut self, field: &str, value: i64) -> &mut Self {
        self.check(value > 0, format!("{field} must be a positive integer"))
    }

    pub fn finish(self) -> DomainResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self.0.join(", ")))
        }
    }
}

pub fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

pub fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Trim and lowercase an email address.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

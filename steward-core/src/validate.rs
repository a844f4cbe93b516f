// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validation of user provided text.
//!
//! Every validator trims its input first and returns the trimmed value, which is what gets stored.
use thiserror::Error;

/// Maximum length of comments, review notes and escalation reasons.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at most {max} characters, got {actual}")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("{field} is not a valid email address")]
    InvalidEmail { field: &'static str },

    #[error("{field} is not a valid URL")]
    InvalidUrl { field: &'static str },

    #[error("{field} must be at most {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
}

/// Checks that a text is not blank and at most `max` characters long.
pub fn validate_text<'a>(
    field: &'static str,
    value: &'a str,
    max: usize,
) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required { field });
    }

    let actual = trimmed.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }

    Ok(trimmed)
}

pub fn validate_message<'a>(
    field: &'static str,
    value: &'a str,
) -> Result<&'a str, ValidationError> {
    validate_text(field, value, MAX_MESSAGE_LENGTH)
}

pub fn validate_email<'a>(
    field: &'static str,
    value: &'a str,
    max: usize,
) -> Result<&'a str, ValidationError> {
    let trimmed = validate_text(field, value, max)?;

    let Some((local, domain)) = trimmed.split_once('@') else {
        return Err(ValidationError::InvalidEmail { field });
    };

    let valid = !local.is_empty()
        && !domain.contains('@')
        && !trimmed.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'));

    if valid {
        Ok(trimmed)
    } else {
        Err(ValidationError::InvalidEmail { field })
    }
}

/// Checks an optional URL. Empty values are accepted and returned as `None`.
pub fn validate_url<'a>(
    field: &'static str,
    value: &'a str,
) -> Result<Option<&'a str>, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or(ValidationError::InvalidUrl { field })?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidUrl { field });
    }

    Ok(Some(trimmed))
}

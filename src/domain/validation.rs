use crate::error::{BakeryError, Result};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_%+-]+([.-]?[A-Za-z0-9_%+-]+)*@[A-Za-z0-9]+([.-]?[A-Za-z0-9]+)*(\.[A-Za-z]{2,})+$")
        .expect("email pattern is valid")
});

/// Trims and requires a non-empty value.
pub fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BakeryError::ValidationError(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional value, mapping blank strings to `None`.
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates an RFC-shaped address and normalizes it to lowercase.
pub fn email(field: &str, value: &str) -> Result<String> {
    let candidate = required(field, value)?.to_lowercase();
    if EMAIL_RE.is_match(&candidate) {
        Ok(candidate)
    } else {
        Err(BakeryError::ValidationError(format!(
            "{field} must be a valid email address"
        )))
    }
}

pub fn max_chars(field: &str, value: &str, limit: usize) -> Result<()> {
    if value.chars().count() > limit {
        return Err(BakeryError::ValidationError(format!(
            "{field} must be at most {limit} characters"
        )));
    }
    Ok(())
}

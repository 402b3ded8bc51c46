//! Input normalisation shared by the HTTP surface before commands reach services.

use super::error::DomainError;

/// Matches the `VARCHAR(255)` columns in the schema.
pub const MAX_TEXT_LEN: usize = 255;

pub fn normalize_name(value: &str, field: &'static str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(DomainError::validation(field, "must be at most 255 characters"));
    }
    Ok(trimmed.to_string())
}

pub fn normalize_email(value: &str) -> Result<String, DomainError> {
    let email = normalize_name(value, "email")?;
    let Some((local, domain)) = email.split_once('@') else {
        return Err(DomainError::validation("email", "must contain `@`"));
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(DomainError::validation("email", "is not a valid address"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("email", "must not contain whitespace"));
    }
    Ok(email)
}

pub fn ensure_password(value: &str) -> Result<(), DomainError> {
    if value.is_empty() {
        return Err(DomainError::validation("password", "must not be empty"));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(DomainError::validation(
            "password",
            "must be at most 255 characters",
        ));
    }
    Ok(())
}

/// Blank descriptions are stored as absent.
pub fn normalize_description(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Input validators for registration and login payloads.
///
/// Usernames are compared byte-for-byte, so they are checked but never
/// trimmed or case-folded.

use regex::Regex;
use lazy_static::lazy_static;

use crate::error::ValidationError;

const MAX_USERNAME_LENGTH: usize = 64;
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_ROLE_LENGTH: usize = 32;
const MAX_NAME_LENGTH: usize = 256;

pub const DEFAULT_ROLE: &str = "user";

lazy_static! {
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[^\s\p{Cc}]+$").unwrap();
    static ref ROLE_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

pub fn is_valid_username(username: &str) -> Result<&str, ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong(
            "username".to_string(),
            MAX_USERNAME_LENGTH,
        ));
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(username)
}

/// Only presence and an upper bound; bcrypt ignores bytes past 72 and
/// huge inputs are a cheap way to burn CPU.
pub fn is_valid_password(password: &str) -> Result<&str, ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        ));
    }

    Ok(password)
}

/// Missing or blank roles fall back to `DEFAULT_ROLE`.
pub fn is_valid_role(role: Option<&str>) -> Result<String, ValidationError> {
    let role = match role.map(str::trim) {
        None | Some("") => return Ok(DEFAULT_ROLE.to_string()),
        Some(role) => role,
    };

    if role.len() > MAX_ROLE_LENGTH {
        return Err(ValidationError::TooLong("role".to_string(), MAX_ROLE_LENGTH));
    }

    if !ROLE_REGEX.is_match(role) {
        return Err(ValidationError::InvalidFormat("role".to_string()));
    }

    Ok(role.to_string())
}

/// Optional display names: blank becomes `None`.
pub fn is_valid_name(field: &str, name: Option<&str>) -> Result<Option<String>, ValidationError> {
    let name = match name.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(name) => name,
    };

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong(field.to_string(), MAX_NAME_LENGTH));
    }

    if name.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat(field.to_string()));
    }

    Ok(Some(name.to_string()))
}

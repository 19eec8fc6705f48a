use crate::core::error::ApiError;
use serde::Deserialize;
use serde_json::Value;

/// Request body for user creation
///
/// `roles` stays a raw JSON value so a wrong shape (a string, a number) is
/// a validation failure with the contract's 400 message instead of a body
/// deserialization failure.
#[derive(Debug, Deserialize)]
pub struct CreateUserPayload {
    pub username: Option<String>,
    pub password: Option<String>,
    pub roles: Option<Value>,
}

#[derive(Debug)]
pub struct ValidatedNewUser {
    pub username: String,
    pub password: String,
    pub roles: Vec<String>,
}

impl CreateUserPayload {
    pub fn validate(self) -> Result<ValidatedNewUser, ApiError> {
        let username = require_string(self.username)?;
        let password = require_string(self.password)?;
        let roles = require_roles(self.roles)?;

        Ok(ValidatedNewUser {
            username,
            password,
            roles,
        })
    }
}

/// Request body for user update
///
/// `active` stays raw for the same reason as `roles`: a non-boolean value
/// must be rejected as a missing/malformed field, and a supplied `false`
/// must be kept apart from an absent field.
#[derive(Debug, Deserialize)]
pub struct UpdateUserPayload {
    pub username: Option<String>,
    pub password: Option<String>,
    pub roles: Option<Value>,
    pub active: Option<Value>,
}

#[derive(Debug)]
pub struct ValidatedUserUpdate {
    pub username: String,
    /// `None` means "leave the stored hash unchanged"
    pub password: Option<String>,
    pub roles: Vec<String>,
    pub active: bool,
}

impl UpdateUserPayload {
    pub fn validate(self) -> Result<ValidatedUserUpdate, ApiError> {
        let username = require_string(self.username)?;
        let roles = require_roles(self.roles)?;
        let active = require_bool(self.active)?;

        // An omitted or empty password preserves the existing hash
        let password = self.password.filter(|password| !password.is_empty());

        Ok(ValidatedUserUpdate {
            username,
            password,
            roles,
            active,
        })
    }
}

/// Request body for note creation
#[derive(Debug, Deserialize)]
pub struct CreateNotePayload {
    pub title: Option<String>,
    pub text: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug)]
pub struct ValidatedNewNote {
    pub title: String,
    pub text: String,
    pub completed: bool,
}

impl CreateNotePayload {
    pub fn validate(self) -> Result<ValidatedNewNote, ApiError> {
        let title = self
            .title
            .filter(|title| !title.is_empty())
            .ok_or(ApiError::MissingNoteFields)?;
        let text = self
            .text
            .filter(|text| !text.is_empty())
            .ok_or(ApiError::MissingNoteFields)?;

        Ok(ValidatedNewNote {
            title,
            text,
            completed: self.completed.unwrap_or(false),
        })
    }
}

/// Request body for note update
#[derive(Debug, Deserialize)]
pub struct UpdateNotePayload {
    pub title: Option<String>,
    pub text: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug)]
pub struct ValidatedNoteUpdate {
    pub title: String,
    pub text: String,
    pub completed: bool,
}

impl UpdateNotePayload {
    pub fn validate(self) -> Result<ValidatedNoteUpdate, ApiError> {
        let title = require_string(self.title)?;
        let text = require_string(self.text)?;
        // Presence check, not truthiness: a supplied `false` is valid
        let completed = self.completed.ok_or(ApiError::MissingFields)?;

        Ok(ValidatedNoteUpdate {
            title,
            text,
            completed,
        })
    }
}

fn require_string(field: Option<String>) -> Result<String, ApiError> {
    field
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::MissingFields)
}

/// Roles must be a non-empty JSON array of strings.
fn require_roles(field: Option<Value>) -> Result<Vec<String>, ApiError> {
    let items = match field.as_ref().and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items,
        _ => return Err(ApiError::MissingFields),
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_owned)
                .ok_or(ApiError::MissingFields)
        })
        .collect()
}

fn require_bool(field: Option<Value>) -> Result<bool, ApiError> {
    field
        .as_ref()
        .and_then(Value::as_bool)
        .ok_or(ApiError::MissingFields)
}

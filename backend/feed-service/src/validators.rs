use crate::error::{AppError, FieldError, Result};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

/// Input validation for signup and post payloads

const MIN_TEXT_LEN: usize = 5;

#[derive(Debug, Clone, Validate)]
pub struct SignupInput {
    #[validate(email(message = "E-Mail is invalid."))]
    pub email: String,
    #[validate(custom(function = "password_length"))]
    pub password: String,
    #[validate(custom(function = "name_present"))]
    pub name: String,
}

impl SignupInput {
    /// Trim and lowercase the email, trim the name. The password is kept as typed.
    pub fn new(email: &str, password: &str, name: &str) -> Self {
        Self {
            email: normalize_email(email),
            password: password.to_string(),
            name: name.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Validate)]
pub struct PostInput {
    #[validate(custom(function = "title_length"))]
    pub title: String,
    #[validate(custom(function = "content_length"))]
    pub content: String,
}

impl PostInput {
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            content: content.trim().to_string(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Run the derive rules, mapping failures into a 422 with one entry per rule
pub fn check<T: Validate>(input: &T) -> Result<()> {
    input
        .validate()
        .map_err(|errors| AppError::validation("Validation failed.", field_errors(&errors)))
}

fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                FieldError::new(field.clone(), message)
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn min_trimmed(
    value: &str,
    code: &'static str,
    message: &'static str,
) -> std::result::Result<(), ValidationError> {
    if value.trim().chars().count() >= MIN_TEXT_LEN {
        return Ok(());
    }
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    Err(err)
}

fn password_length(value: &str) -> std::result::Result<(), ValidationError> {
    min_trimmed(value, "password_length", "Password too short!")
}

fn name_present(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("name_required");
        err.message = Some(Cow::Borrowed("Name is required."));
        return Err(err);
    }
    Ok(())
}

fn title_length(value: &str) -> std::result::Result<(), ValidationError> {
    min_trimmed(value, "title_length", "Title is invalid")
}

fn content_length(value: &str) -> std::result::Result<(), ValidationError> {
    min_trimmed(value, "content_length", "Content is invalid")
}

use astra::Response;
use serde::Serialize;
use thiserror::Error;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Errors originating from either the server logic
/// (routing, validation, missing resources) or downstream layers (DB).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),
    #[error("Not Found")]
    NotFound,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Database Error: {0}")]
    DbError(String),
    #[error("Internal Server Error")]
    InternalError,
}

impl ServerError {
    pub fn status(&self) -> u16 {
        match self {
            ServerError::Validation(_) => 422,
            ServerError::NotFound => 404,
            ServerError::InvalidInput(_) | ServerError::BadRequest(_) => 400,
            ServerError::DbError(_) | ServerError::InternalError => 500,
        }
    }

    /// Field errors carried by a validation failure, empty otherwise.
    pub fn fields(&self) -> &[FieldError] {
        match self {
            ServerError::Validation(fields) => fields,
            _ => &[],
        }
    }
}

impl From<rusqlite::Error> for ServerError {
    fn from(e: rusqlite::Error) -> Self {
        ServerError::DbError(e.to_string())
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| f.field)
        .collect::<Vec<_>>()
        .join(", ")
}

// Type alias commonly used by route handlers.
pub type ResultResp = Result<Response, ServerError>;

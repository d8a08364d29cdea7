//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every core operation returns `Result<_, AppError>`; nothing is swallowed and nothing
//! is retried.
//!
//! `AppError` implements `actix_web::error::ResponseError`, so handlers (and the
//! authorization middleware) can return it directly and the client receives the
//! matching status code with a `{"success": false, "message": "..."}` body.
//! `From` implementations for `sqlx::Error`, `validator::ValidationErrors`,
//! `bcrypt::BcryptError` and the token service's `TokenError` allow the `?` operator.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use validator::ValidationErrors;

use crate::auth::token::TokenError;

/// Message sent to clients for every 5xx response. The real cause is only logged.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Represents all possible errors that can occur within the application.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or out-of-range input (HTTP 400). Carries the field-level messages.
    #[error("Validation Error: {0}")]
    ValidationError(String),
    /// A request that could not be understood at all, e.g. broken JSON (HTTP 400).
    #[error("Bad Request: {0}")]
    BadRequest(String),
    /// A uniqueness violation such as a duplicate email (HTTP 409).
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Missing/invalid/expired token or a failed credential check (HTTP 401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Authenticated, but the resource belongs to someone else (HTTP 403).
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// The resource id does not resolve to any record (HTTP 404).
    #[error("Not Found: {0}")]
    NotFound(String),
    /// Unexpected infrastructure failure (HTTP 500).
    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
    /// Error originating from the persistent store (HTTP 500).
    #[error("Database Error: {0}")]
    DatabaseError(String),
}

impl AppError {
    /// The message that is safe to hand back to the caller.
    pub fn client_message(&self) -> &str {
        match self {
            AppError::ValidationError(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => msg,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => INTERNAL_ERROR_MESSAGE,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("{}", self);
        }
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": self.client_message(),
        }))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `RowNotFound` becomes `NotFound` and a unique-constraint violation becomes a
/// generic `Conflict`; stores that know which value collided map it themselves.
/// Everything else is a `DatabaseError`.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match &error {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
                AppError::Conflict("A record with this value already exists".into())
            }
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
///
/// Field messages are sorted by field name and joined with ", " so the output is stable.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> AppError {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        let messages: Vec<String> = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| match &err.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();

        AppError::ValidationError(messages.join(", "))
    }
}

impl From<TokenError> for AppError {
    fn from(error: TokenError) -> AppError {
        match error {
            TokenError::Encode(msg) => {
                AppError::InternalServerError(format!("Failed to generate token: {}", msg))
            }
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

/// A panicked or cancelled blocking task (password hashing runs on the blocking pool).
impl From<tokio::task::JoinError> for AppError {
    fn from(error: tokio::task::JoinError) -> AppError {
        AppError::InternalServerError(format!("Background task failed: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use validator::Validate;

    #[test]
    fn test_error_responses() {
        let cases = vec![
            (AppError::ValidationError("Title is required".into()), 400),
            (AppError::BadRequest("Malformed JSON".into()), 400),
            (AppError::Conflict("Email taken".into()), 409),
            (AppError::Unauthorized("Invalid token".into()), 401),
            (AppError::Forbidden("Not yours".into()), 403),
            (AppError::NotFound("Task not found".into()), 404),
            (AppError::InternalServerError("boom".into()), 500),
            (AppError::DatabaseError("connection reset".into()), 500),
        ];

        for (error, status) in cases {
            assert_eq!(error.error_response().status(), status, "{:?}", error);
        }
    }

    #[actix_rt::test]
    async fn test_server_errors_hide_details() {
        let response = AppError::DatabaseError("password=hunter2 host=db".into()).error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["message"], INTERNAL_ERROR_MESSAGE);
    }

    #[actix_rt::test]
    async fn test_client_errors_keep_message() {
        let response = AppError::Forbidden("Not authorized to access this task".into()).error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Not authorized to access this task");
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "Title is required"))]
        title: String,
        #[validate(length(max = 3))]
        bio: String,
    }

    #[test]
    fn test_validation_messages_are_sorted_and_joined() {
        let sample = Sample {
            title: String::new(),
            bio: "toolong".into(),
        };
        let error: AppError = sample.validate().unwrap_err().into();

        match error {
            AppError::ValidationError(msg) => assert_eq!(msg, "bio is invalid, Title is required"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

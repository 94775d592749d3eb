use std::collections::BTreeMap;
use std::panic::Location;

use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Message sent to clients for every 5xx response.
pub const INTERNAL_MESSAGE: &str = "internal server error";

/// Per-field validation messages, keyed by the JSON field name.
pub type FieldErrors = BTreeMap<String, String>;

/// Error returned by handlers and middlewares.
///
/// Carries the HTTP status to respond with, the underlying error and the
/// source location where it was raised so the error middleware can log it.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
    pub fields: Option<FieldErrors>,
    location: &'static Location<'static>,
}

impl AppError {
    #[track_caller]
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
            fields: None,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    #[track_caller]
    pub fn database<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    #[track_caller]
    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, err)
    }

    #[track_caller]
    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    #[track_caller]
    pub fn unauthorized<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNAUTHORIZED, err)
    }

    #[track_caller]
    pub fn forbidden<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::FORBIDDEN, err)
    }

    #[track_caller]
    pub fn conflict<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::CONFLICT, err)
    }

    #[track_caller]
    pub fn unprocessable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err)
    }

    /// Input validation failure with one message per offending field.
    #[track_caller]
    pub fn validation(fields: FieldErrors) -> Self {
        Self {
            fields: Some(fields),
            ..Self::bad_request(anyhow::anyhow!("input validation failed"))
        }
    }

    /// Where the error was constructed.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Message that is safe to send to the client.
    pub fn public_message(&self) -> String {
        if self.is_server_error() {
            INTERNAL_MESSAGE.to_string()
        } else {
            self.error.to_string()
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:#}", self.status, self.error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self.fields {
            Some(fields) if !self.is_server_error() => json!({
                "error": self.public_message(),
                "fields": fields,
            }),
            _ => json!({ "error": self.public_message() }),
        };

        (self.status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    #[track_caller]
    fn from(err: E) -> Self {
        AppError::internal(err)
    }
}

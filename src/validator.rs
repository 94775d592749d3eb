use anyhow::anyhow;
use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::{StatusCode, header};
use http_body_util::LengthLimitError;
use roster_core::{AppError, FieldErrors};
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use validator::{Validate, ValidationErrors};

/// Decodes and validates JSON request bodies.
///
/// Constructed once at start-up and shared through the application state.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    body_limit: usize,
}

impl RequestValidator {
    pub fn new(body_limit: usize) -> Self {
        Self { body_limit }
    }

    /// Reads the body of `req` as JSON into `T` and runs its validation rules.
    ///
    /// # Errors
    ///
    /// - 400 when the content type is not JSON or the body is not valid JSON
    /// - 400 with per-field messages when a field is missing or fails validation
    /// - 413 when the body is larger than the configured limit
    pub async fn decode<T>(&self, req: Request) -> Result<T, AppError>
    where
        T: DeserializeOwned + Validate,
    {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));
        if !is_json {
            return Err(AppError::bad_request(anyhow!(
                "Missing 'Content-Type: application/json' header"
            )));
        }

        let bytes = to_bytes(req.into_body(), self.body_limit)
            .await
            .map_err(|e| {
                if e.into_inner().is::<LengthLimitError>() {
                    AppError::new(StatusCode::PAYLOAD_TOO_LARGE, anyhow!("request body too large"))
                } else {
                    AppError::bad_request(anyhow!("failed to read request body"))
                }
            })?;

        let value: T = serde_json::from_slice(&bytes).map_err(json_error)?;
        value.validate().map_err(validation_error)?;

        Ok(value)
    }
}

fn json_error(err: serde_json::Error) -> AppError {
    let message = err.to_string();

    if let Some(field) = missing_field(&message) {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), format!("{field} is required"));
        return AppError::validation(fields);
    }

    match err.classify() {
        Category::Data => AppError::bad_request(anyhow!("Invalid field type in request")),
        _ => AppError::bad_request(anyhow!("Invalid request body")),
    }
}

fn missing_field(message: &str) -> Option<&str> {
    message
        .split("missing field `")
        .nth(1)
        .and_then(|rest| rest.split('`').next())
}

/// Flattens validator errors to one message per field.
///
/// Struct-level errors are reported under their error code.
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut fields = FieldErrors::new();

    for (field, errors) in errors.field_errors() {
        let Some(error) = errors.first() else {
            continue;
        };
        let key = if field == "__all__" {
            error.code.to_string()
        } else {
            field.to_string()
        };
        let message = error
            .message
            .as_ref()
            .map(|msg| msg.to_string())
            .unwrap_or_else(|| format!("{key} is invalid"));
        fields.insert(key, message);
    }

    AppError::validation(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use roster_models::{CreateUserDto, LoginDto};
    use serde_json::json;

    fn request(body: serde_json::Value) -> Request {
        Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn validator() -> RequestValidator {
        RequestValidator::new(1024 * 1024)
    }

    #[tokio::test]
    async fn test_decode_valid_body() {
        let dto: LoginDto = validator()
            .decode(request(json!({"email": "alex@example.com", "password": "secret"})))
            .await
            .unwrap();
        assert_eq!(dto.email, "alex@example.com");
    }

    #[tokio::test]
    async fn test_missing_field_is_required() {
        let err = validator()
            .decode::<LoginDto>(request(json!({"email": "alex@example.com"})))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let fields = err.fields.unwrap();
        assert_eq!(fields["password"], "password is required");
    }

    #[tokio::test]
    async fn test_field_errors_are_collected() {
        let err = validator()
            .decode::<CreateUserDto>(request(json!({
                "name": "Al",
                "email": "not-an-email",
                "roles": ["root"],
                "department": "sales",
                "password": "password123",
                "password_confirm": "password123"
            })))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let fields = err.fields.unwrap();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert_eq!(fields["roles"], "roles must be one of: admin, user");
        assert!(!fields.contains_key("department"));
    }

    #[tokio::test]
    async fn test_wrong_content_type() {
        let req = Request::builder()
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("{}"))
            .unwrap();

        let err = validator().decode::<LoginDto>(req).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let req = Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"email\":"))
            .unwrap();

        let err = validator().decode::<LoginDto>(req).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.error.to_string(), "Invalid request body");
    }

    #[tokio::test]
    async fn test_body_limit() {
        let err = RequestValidator::new(8)
            .decode::<LoginDto>(request(json!({"email": "alex@example.com", "password": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}

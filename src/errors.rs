use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde_json::{json, Value};
use thiserror::Error;

/// Key under which errors not tied to a single field are reported.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{field}: {message}")]
    Conflict { field: &'static str, message: String },

    #[error("missing or unknown credentials")]
    Unauthorized,

    #[error("insufficient permissions")]
    Forbidden,

    #[error("object not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("blocking task was canceled")]
    Canceled,
}

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> ServiceError {
        ServiceError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn non_field(message: impl Into<String>) -> ServiceError {
        ServiceError::validation(NON_FIELD_ERRORS, message)
    }

    pub fn conflict(field: &'static str, message: impl Into<String>) -> ServiceError {
        ServiceError::Conflict {
            field,
            message: message.into(),
        }
    }

    fn as_json(&self) -> Value {
        match self {
            ServiceError::Validation { field, message }
            | ServiceError::Conflict { field, message } => {
                let mut body = serde_json::Map::new();
                if *field == NON_FIELD_ERRORS {
                    body.insert(field.to_string(), json!([message]));
                } else {
                    body.insert(field.to_string(), json!(message));
                }
                Value::Object(body)
            }
            ServiceError::Unauthorized => {
                json!({ "detail": "Authentication credentials were not provided." })
            }
            ServiceError::Forbidden => {
                json!({ "detail": "You do not have permission to perform this action." })
            }
            ServiceError::NotFound => json!({ "detail": "Not found." }),
            _ => json!({ "detail": "Internal server error." }),
        }
    }
}

impl From<actix_web::error::BlockingError> for ServiceError {
    fn from(_: actix_web::error::BlockingError) -> ServiceError {
        ServiceError::Canceled
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Conflict { .. } => StatusCode::CONFLICT,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Database(_) | ServiceError::Pool(_) | ServiceError::Canceled => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {}", self);
        }
        HttpResponse::build(self.status_code()).json(self.as_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_are_keyed_by_field() {
        let err = ServiceError::validation("cargo", "out of range");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.as_json(), json!({ "cargo": "out of range" }));
    }

    #[test]
    fn non_field_errors_render_as_list() {
        let err = ServiceError::non_field("Source and destination stations cannot be the same");
        assert_eq!(
            err.as_json(),
            json!({
                "non_field_errors": ["Source and destination stations cannot be the same"]
            })
        );
    }

    #[test]
    fn taxonomy_maps_to_status_codes() {
        assert_eq!(
            ServiceError::conflict("seat", "taken").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ServiceError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ServiceError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServiceError::Canceled.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

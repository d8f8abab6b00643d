use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewardsError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthenticated { login_url: String },

    #[error("Insufficient balance: available={0}, requested={1}")]
    InsufficientBalance(i64, i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for RewardsError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            RewardsError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
            }
            RewardsError::Classifier(e) => {
                tracing::error!("Classifier error: {}", e);
                (StatusCode::BAD_GATEWAY, "Image verification service error")
            }
            RewardsError::Geocoding(e) => {
                tracing::error!("Geocoding error: {}", e);
                (StatusCode::BAD_GATEWAY, "Location search service error")
            }
            RewardsError::NotFound(_) => {
                tracing::warn!("{}", self);
                (StatusCode::NOT_FOUND, "Not found")
            }
            RewardsError::Unauthenticated { login_url } => {
                let body = Json(json!({
                    "error": "Authentication required",
                    "details": self.to_string(),
                    "login_url": login_url,
                }));
                return (StatusCode::UNAUTHORIZED, body).into_response();
            }
            RewardsError::InsufficientBalance(_, _) => {
                tracing::warn!("{}", self);
                (StatusCode::BAD_REQUEST, "Insufficient balance")
            }
            RewardsError::InvalidInput(_) => {
                tracing::warn!("{}", self);
                (StatusCode::BAD_REQUEST, "Invalid input")
            }
            RewardsError::Conflict(_) => {
                tracing::warn!("{}", self);
                (StatusCode::CONFLICT, "Conflict")
            }
            RewardsError::Config(_) => {
                tracing::error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error")
            }
            RewardsError::Internal(_) => {
                tracing::error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string(),
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for RewardsError {
    fn from(error: sqlx::Error) -> Self {
        RewardsError::Database(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RewardsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_variant() {
        let cases = [
            (RewardsError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (RewardsError::InsufficientBalance(10, 20), StatusCode::BAD_REQUEST),
            (RewardsError::Conflict("done".into()), StatusCode::CONFLICT),
            (RewardsError::Classifier("down".into()), StatusCode::BAD_GATEWAY),
            (
                RewardsError::Unauthenticated { login_url: "/login".into() },
                StatusCode::UNAUTHORIZED,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn insufficient_balance_message() {
        let err = RewardsError::InsufficientBalance(60, 100);
        assert_eq!(err.to_string(), "Insufficient balance: available=60, requested=100");
    }
}

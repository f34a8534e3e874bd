use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Malformed or missing input data (empty corpus, unreadable catalog, ...)
    #[error("Data error: {0}")]
    Data(String),

    /// Invalid parameter combination
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Similarity index unreachable, timed out, or returned a malformed response
    #[error("Index query error: {0}")]
    IndexQuery(String),

    /// A batch write to the similarity index failed after `committed` entries were stored
    #[error("Index write error after {committed} committed entries: {message}")]
    IndexWrite { committed: usize, message: String },

    /// A numerical routine failed (e.g. the SVD did not converge)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) => StatusCode::BAD_REQUEST,
            AppError::Data(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::IndexQuery(_) | AppError::IndexWrite { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Config("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Data("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::IndexQuery("x".into()), StatusCode::BAD_GATEWAY),
            (
                AppError::IndexWrite {
                    committed: 3,
                    message: "x".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_index_write_message_carries_committed_count() {
        let error = AppError::IndexWrite {
            committed: 2000,
            message: "status 500".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Index write error after 2000 committed entries: status 500"
        );
    }
}

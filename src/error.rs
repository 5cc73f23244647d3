use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Shown instead of the raw Postgres error when the schema was never created.
pub const SCHEMA_HINT: &str =
    "Database not initialized. Please run scripts/01_create_tables.sql first.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidRequest(&'static str),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("File too large (max 8MB)")]
    PayloadTooLarge,

    #[error("Unsupported file type. Use image/* or PDF.")]
    UnsupportedMediaType,

    #[error("{0}")]
    Database(String),

    #[error("{0}")]
    Storage(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        // 42P01: undefined_table. Happens on a fresh backend before the init
        // script has been run, so point the caller at the script.
        let undefined_table = err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == "42P01");

        if undefined_table {
            AppError::Database(SCHEMA_HINT.to_string())
        } else {
            AppError::Database(err.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Database { .. } | AppError::Storage { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                AppError::InvalidRequest("Missing or invalid fields"),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::PayloadTooLarge, StatusCode::PAYLOAD_TOO_LARGE),
            (
                AppError::UnsupportedMediaType,
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                AppError::Storage("put failed".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_generic_sqlx_error_keeps_message() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        match err {
            AppError::Database(msg) => assert_ne!(msg, SCHEMA_HINT),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}

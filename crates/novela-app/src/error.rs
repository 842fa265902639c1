use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use novela_blob::error::BlobError;
use serde::Serialize;
use tracing::{debug, error};

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

const ALREADY_EXISTS: &str = "Already exists";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("Insufficient permissions")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthenticated() -> Self {
        ApiError::Unauthenticated("Authentication required".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorDto {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(detail) => {
                error!("Internal error: {detail}");
                "Internal server error".to_string()
            }
            other => {
                debug!("Request failed with {status}: {other}");
                other.to_string()
            }
        };
        (status, Json(ErrorDto { error: message })).into_response()
    }
}

impl From<novela_dal::Error> for ApiError {
    fn from(value: novela_dal::Error) -> Self {
        use novela_dal::Error as DalError;
        match value {
            DalError::RecordNotFound(what) => ApiError::NotFound(what),
            DalError::DatabaseError(sqlx_error) => match sqlx_error {
                novela_dal::SqlxError::RowNotFound => ApiError::NotFound("Record".to_string()),
                novela_dal::SqlxError::Database(db) if db.is_unique_violation() => {
                    debug!("Unique constraint violated: {}", db.message());
                    ApiError::Conflict(ALREADY_EXISTS.to_string())
                }
                other => ApiError::Internal(other.to_string()),
            },
            DalError::InvalidCredentials => {
                ApiError::Unauthenticated("Invalid username or password".to_string())
            }
            DalError::Conflict(msg) => ApiError::Conflict(msg),
            DalError::InvalidOrderByField(field) => {
                ApiError::Validation(format!("Invalid sort field: {field}"))
            }
            other @ (DalError::MigrationError(_)
            | DalError::UserPasswordError(_)
            | DalError::InconsistentDelete { .. }) => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<BlobError> for ApiError {
    fn from(value: BlobError) -> Self {
        if value.is_client_error() {
            ApiError::Validation(value.to_string())
        } else {
            ApiError::Internal(value.to_string())
        }
    }
}

impl From<novela_auth::Error> for ApiError {
    fn from(value: novela_auth::Error) -> Self {
        ApiError::Internal(value.to_string())
    }
}

impl From<garde::Report> for ApiError {
    fn from(value: garde::Report) -> Self {
        ApiError::Validation(value.to_string().trim().to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::Validation(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::Validation(value.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        ApiError::Validation(value.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dal_error_mapping() {
        let err: ApiError = novela_dal::Error::RecordNotFound("Novel".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Novel not found");

        let err: ApiError = novela_dal::Error::Conflict("Username already taken".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = novela_dal::Error::InvalidCredentials.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err: ApiError = novela_dal::Error::InvalidOrderByField("password".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = novela_dal::Error::InconsistentDelete {
            novel_id: 1,
            remaining: 2,
        }
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: ApiError =
            novela_dal::Error::DatabaseError(novela_dal::SqlxError::RowNotFound).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_unique_violation_hides_constraint() {
        let pool = novela_dal::new_pool("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE tag (name TEXT NOT NULL UNIQUE)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO tag (name) VALUES ('fantasy')")
            .execute(&pool)
            .await
            .unwrap();
        let db_error = sqlx::query("INSERT INTO tag (name) VALUES ('fantasy')")
            .execute(&pool)
            .await
            .unwrap_err();

        let err: ApiError = novela_dal::Error::DatabaseError(db_error).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Already exists");
        assert!(logs_contain("UNIQUE constraint failed"));
    }

    #[test]
    fn test_blob_error_mapping() {
        let err: ApiError = BlobError::InvalidPayload("garbage".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err: ApiError = BlobError::IoError(std::io::Error::other("disk full")).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_internal_error_body_is_generic() {
        let response = ApiError::Internal("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Internal server error");
        assert!(logs_contain("connection refused"));
    }
}

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// `axum::Json` whose rejections come back as `AppError::InvalidInput`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("{0}")]
    Conflict(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("persistence error: {0}")]
    Persistence(#[source] sqlx::Error),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl AppError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn access_denied() -> Self {
        Self::AccessDenied("Access denied".to_owned())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        use AppError::*;
        match self {
            InvalidInput(_) => StatusCode::BAD_REQUEST,
            Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AccessDenied(_) => StatusCode::FORBIDDEN,
            NotFound { .. } => StatusCode::NOT_FOUND,
            Conflict(_) => StatusCode::CONFLICT,
            Upstream(_) => StatusCode::BAD_GATEWAY,
            Persistence(_) | Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Persistence(e) => {
                tracing::error!(error = ?e, "database error");
                "Database error.".to_owned()
            }
            AppError::Internal(e) => {
                tracing::error!("{}\n\n{}", e, e.backtrace());
                "Internal server error.".to_owned()
            }
            AppError::Upstream(msg) => {
                tracing::warn!("{msg}");
                self.to_string()
            }
            _ => {
                tracing::debug!(%status, "{self}");
                self.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::not_found("record"),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict(format!("duplicate value: {}", db_err.message()))
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                Self::not_found("referenced record")
            }
            other => Self::Persistence(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

macro_rules! apperr_impl {
    ($E:ty => $variant:ident) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::$variant(err.to_string())
            }
        }
    };
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::Internal(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(reqwest::Error => Upstream);
apperr_impl!(jsonwebtoken::errors::Error => Unauthenticated);
apperr_impl!(serde_json::Error);
apperr_impl!(anyhow::Error);

impl From<argon2::password_hash::Error> for AppError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::Internal(anyhow::anyhow!("password hashing failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::invalid_input("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::unauthenticated("no token").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::access_denied().status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("chat").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("dup".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::upstream("down").status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_row_not_found_is_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(AppError::not_found("Chat").to_string(), "Chat not found");
    }
}

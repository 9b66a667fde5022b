use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::filters::FilterError;
use crate::sources::SourceError;

/// Error de una petición, renderizado como `{"error": message}`
#[derive(Debug, Error)]
pub enum ApiError {
    /// Campo faltante o inválido en la petición (400)
    #[error("{0}")]
    Validation(String),

    /// Falló el catálogo o el extractor (500)
    #[error("{operation}: {source}")]
    Upstream {
        operation: &'static str,
        #[source]
        source: SourceError,
    },

    #[error("Not found")]
    NotFound,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn upstream(operation: &'static str) -> impl FnOnce(SourceError) -> Self {
        move |source| Self::Upstream { operation, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("❌ {}", self);
        }
        let body = serde_json::json!({
            "error": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

//! Request-level error taxonomy for the analysis endpoints.

use crate::dtos::ErrorResponse;
use crate::services::ReadingError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

pub const MSG_IMAGE_REQUIRED: &str = "이미지 데이터가 필요합니다";
pub const MSG_IMAGE_TOO_LARGE: &str = "이미지 데이터가 너무 큽니다";
pub const MSG_INVALID_BODY: &str = "요청 본문이 올바른 JSON 형식이 아닙니다";
pub const MSG_INVALID_ID: &str = "유효하지 않은 분석 ID입니다";
pub const MSG_NOT_FOUND: &str = "분석 결과를 찾을 수 없습니다";
pub const MSG_ANALYSIS_FAILED: &str = "손금 분석 중 오류가 발생했습니다";
pub const MSG_FETCH_FAILED: &str = "분석 결과를 가져오는 중 오류가 발생했습니다";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Model,
    NotFound,
    Storage,
}

/// Every failure the analysis endpoints can report. The variant decides the
/// HTTP status; the message is shown to the end user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Model(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Storage(String),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Validation(_) => ErrorKind::Validation,
            AnalysisError::Model(_) => ErrorKind::Model,
            AnalysisError::NotFound(_) => ErrorKind::NotFound,
            AnalysisError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Model | ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log the failure at a level matching its kind. Client mistakes and
    /// lookups of unknown ids are not system faults.
    pub fn log(&self, operation: &'static str, analysis_id: Option<i64>, request_id: &str) {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::NotFound => {
                tracing::warn!(operation, analysis_id, request_id, error = %self, "Request rejected");
            }
            ErrorKind::Model | ErrorKind::Storage => {
                tracing::error!(operation, analysis_id, request_id, error = %self, "Request failed");
            }
        }
    }
}

impl From<ReadingError> for AnalysisError {
    fn from(err: ReadingError) -> Self {
        AnalysisError::Model(format!("{}: {}", MSG_ANALYSIS_FAILED, err))
    }
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AnalysisError::Validation(msg)
            | AnalysisError::Model(msg)
            | AnalysisError::NotFound(msg)
            | AnalysisError::Storage(msg) => msg,
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::ProviderError;

    #[test]
    fn status_is_chosen_from_kind() {
        let cases = [
            (AnalysisError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AnalysisError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AnalysisError::Model("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AnalysisError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{:?}", err.kind());
        }
    }

    #[test]
    fn reading_errors_are_wrapped_in_user_sentence() {
        let err = AnalysisError::from(ReadingError::MissingField("lifeLine"));
        assert_eq!(err.kind(), ErrorKind::Model);
        assert_eq!(
            err.to_string(),
            "손금 분석 중 오류가 발생했습니다: 분석 결과에 필수 필드가 누락되었습니다: lifeLine"
        );
    }

    #[test]
    fn provider_errors_keep_their_cause() {
        let err = AnalysisError::from(ReadingError::from(ProviderError::RateLimited));
        assert!(err.to_string().starts_with(MSG_ANALYSIS_FAILED));
        assert!(err.to_string().ends_with("Rate limited"));
    }

    #[test]
    fn storage_failures_are_server_errors() {
        let err = AnalysisError::Storage(MSG_FETCH_FAILED.to_string());
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn response_body_is_message_envelope() {
        let response = AnalysisError::NotFound(MSG_NOT_FOUND.to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "message": MSG_NOT_FOUND }));
    }
}

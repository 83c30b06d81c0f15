//! Analysis endpoints: submit a palm photo, fetch a stored analysis.

use crate::dtos::{AnalysisResponse, AnalyzePalmRequest};
use crate::error::{
    AnalysisError, ErrorKind, MSG_ANALYSIS_FAILED, MSG_FETCH_FAILED, MSG_IMAGE_REQUIRED,
    MSG_IMAGE_TOO_LARGE, MSG_INVALID_BODY, MSG_INVALID_ID, MSG_NOT_FOUND,
};
use crate::models::NewAnalysis;
use crate::services::metrics::{self, AnalysisOutcome};
use crate::services::StoreError;
use crate::startup::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use service_core::middleware::tracing::RequestId;
use validator::{Validate, ValidationErrors};

/// Placeholder when the request-id middleware is not mounted.
const UNKNOWN_REQUEST_ID: &str = "-";

fn request_id_of(request_id: &Option<Extension<RequestId>>) -> &str {
    request_id
        .as_ref()
        .map(|Extension(RequestId(id))| id.as_str())
        .unwrap_or(UNKNOWN_REQUEST_ID)
}

fn rejection_to_error(rejection: JsonRejection) -> AnalysisError {
    let message = match &rejection {
        JsonRejection::JsonDataError(_) => MSG_IMAGE_REQUIRED,
        _ if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => MSG_IMAGE_TOO_LARGE,
        _ => MSG_INVALID_BODY,
    };
    tracing::debug!(rejection = %rejection.body_text(), "Rejected request body");
    AnalysisError::Validation(message.to_string())
}

fn validation_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| MSG_IMAGE_REQUIRED.to_string())
}

/// The cause stays in the logs; the client only sees `message`.
fn storage_failure(err: StoreError, operation: &'static str, message: &str) -> AnalysisError {
    tracing::error!(operation, error = %err, "Analysis store failure");
    AnalysisError::Storage(message.to_string())
}

fn outcome_of(result: &Result<AnalysisResponse, AnalysisError>) -> AnalysisOutcome {
    match result {
        Ok(_) => AnalysisOutcome::Success,
        Err(e) => match e.kind() {
            ErrorKind::Validation => AnalysisOutcome::ValidationError,
            ErrorKind::NotFound => AnalysisOutcome::NotFound,
            ErrorKind::Model => AnalysisOutcome::ModelError,
            ErrorKind::Storage => AnalysisOutcome::StorageError,
        },
    }
}

async fn submit(
    state: &AppState,
    payload: Result<Json<AnalyzePalmRequest>, JsonRejection>,
) -> Result<AnalysisResponse, AnalysisError> {
    let Json(request) = payload.map_err(rejection_to_error)?;
    request
        .validate()
        .map_err(|e| AnalysisError::Validation(validation_message(&e)))?;

    let analysis_result = state.reader.analyze(&request.image_data).await?;

    let record = state
        .store
        .create_analysis(NewAnalysis {
            user_id: None,
            image_data: request.image_data,
            analysis_result,
        })
        .await
        .map_err(|e| storage_failure(e, "analyze_palm", MSG_ANALYSIS_FAILED))?;

    tracing::info!(
        analysis_id = record.id,
        provider = state.reader.provider_name(),
        "Palm analysis stored"
    );

    Ok(AnalysisResponse::from(&record))
}

/// `POST /api/analyze-palm`
///
/// Validation failures never reach the model. A record is written only after
/// the model produced a valid reading.
pub async fn analyze_palm(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    payload: Result<Json<AnalyzePalmRequest>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, AnalysisError> {
    let result = submit(&state, payload).await;

    metrics::record_analysis(outcome_of(&result));
    if let Err(e) = &result {
        e.log("analyze_palm", None, request_id_of(&request_id));
    }

    result.map(Json)
}

fn parse_id(raw_id: Result<Path<String>, PathRejection>) -> Result<i64, AnalysisError> {
    let invalid = || AnalysisError::Validation(MSG_INVALID_ID.to_string());
    let Path(raw_id) = raw_id.map_err(|rejection| {
        tracing::debug!(rejection = %rejection.body_text(), "Rejected analysis id");
        invalid()
    })?;
    raw_id.parse().map_err(|_| invalid())
}

async fn fetch(state: &AppState, id: i64) -> Result<AnalysisResponse, AnalysisError> {
    let record = state
        .store
        .get_analysis(id)
        .await
        .map_err(|e| storage_failure(e, "get_analysis", MSG_FETCH_FAILED))?
        .ok_or_else(|| AnalysisError::NotFound(MSG_NOT_FOUND.to_string()))?;

    Ok(AnalysisResponse::from(&record))
}

/// `GET /api/analysis/:id`
pub async fn get_analysis(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    raw_id: Result<Path<String>, PathRejection>,
) -> Result<Json<AnalysisResponse>, AnalysisError> {
    let id = parse_id(raw_id);
    let analysis_id = id.as_ref().ok().copied();
    let result = match id {
        Ok(id) => fetch(&state, id).await,
        Err(e) => Err(e),
    };

    metrics::record_fetch(outcome_of(&result));
    if let Err(e) = &result {
        e.log("get_analysis", analysis_id, request_id_of(&request_id));
    }

    result.map(Json)
}

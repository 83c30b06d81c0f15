//! Wire types for the analysis endpoints.

use crate::models::{AnalysisRecord, AnalysisResult};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzePalmRequest {
    /// Base64 image, optionally as a `data:image/...;base64,` URL.
    #[validate(length(min = 1, message = "이미지 데이터가 필요합니다"))]
    pub image_data: String,
}

/// Envelope returned by both the submit and the fetch endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub id: i64,
    pub analysis: AnalysisResult,
    /// ISO-8601 UTC with millisecond precision, e.g. `2026-10-17T08:30:00.123Z`.
    pub created_at: String,
}

impl From<&AnalysisRecord> for AnalysisResponse {
    fn from(record: &AnalysisRecord) -> Self {
        Self {
            id: record.id,
            analysis: record.analysis_result.clone(),
            created_at: record
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewAnalysis;
    use chrono::{TimeZone, Utc};

    #[test]
    fn empty_image_fails_validation() {
        let request: AnalyzePalmRequest =
            serde_json::from_str(r#"{"imageData": ""}"#).unwrap();
        assert!(request.validate().is_err());

        let request: AnalyzePalmRequest =
            serde_json::from_str(r#"{"imageData": "AAAA"}"#).unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn created_at_uses_millisecond_utc_format() {
        let created_at = Utc
            .with_ymd_and_hms(2026, 10, 17, 8, 30, 0)
            .unwrap()
            + chrono::Duration::milliseconds(123);
        let record = AnalysisRecord::new(
            3,
            NewAnalysis {
                user_id: None,
                image_data: "AAAA".to_string(),
                analysis_result: AnalysisResult {
                    overall: "a".to_string(),
                    life_line: "b".to_string(),
                    heart_line: "c".to_string(),
                    head_line: "d".to_string(),
                    fate_line: "e".to_string(),
                    marriage_line: "f".to_string(),
                    money_line: "g".to_string(),
                    love_score: 1,
                    wealth_score: 2,
                    career_score: 3,
                    health_score: 4,
                },
            },
            created_at,
        );

        let body = serde_json::to_value(AnalysisResponse::from(&record)).unwrap();
        assert_eq!(body["id"], 3);
        assert_eq!(body["createdAt"], "2026-10-17T08:30:00.123Z");
        assert_eq!(body["analysis"]["lifeLine"], "b");
        assert!(body.get("imageData").is_none());
    }
}

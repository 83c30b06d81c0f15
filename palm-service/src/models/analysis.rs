//! Palm analysis result and its stored record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Score used when the model omits a score or returns something unusable.
pub const DEFAULT_SCORE: u8 = 50;

/// Highest score a reading may carry.
pub const MAX_SCORE: u8 = 100;

/// Interpretation of a palm photo: seven narrative readings and four scores.
///
/// Narrative fields are always non-empty and scores always lie in
/// `0..=MAX_SCORE`; `PalmReader` is the only producer and enforces both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Overall fortune summary.
    pub overall: String,
    pub life_line: String,
    pub heart_line: String,
    pub head_line: String,
    pub fate_line: String,
    pub marriage_line: String,
    pub money_line: String,
    pub love_score: u8,
    pub wealth_score: u8,
    pub career_score: u8,
    pub health_score: u8,
}

/// Input for creating an analysis record. The store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    /// `None` for guest analyses.
    pub user_id: Option<i64>,
    /// Image payload exactly as submitted, data URL prefix included.
    pub image_data: String,
    pub analysis_result: AnalysisResult,
}

/// A stored analysis. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRecord {
    pub id: i64,
    pub user_id: Option<i64>,
    pub image_data: String,
    pub analysis_result: AnalysisResult,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn new(id: i64, analysis: NewAnalysis, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: analysis.user_id,
            image_data: analysis.image_data,
            analysis_result: analysis.analysis_result,
            created_at,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }
}

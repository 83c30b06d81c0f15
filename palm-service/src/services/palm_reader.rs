//! Palm reading on top of a vision provider.
//!
//! Builds the fixed palm-reading prompt, sends one completion request and
//! turns the untyped JSON reply into a validated `AnalysisResult`.

use crate::models::analysis::{AnalysisResult, DEFAULT_SCORE, MAX_SCORE};
use crate::services::metrics;
use crate::services::providers::{ProviderError, VisionProvider, VisionRequest};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Default cap on generated tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

pub const SYSTEM_PROMPT: &str = r#"당신은 전문 한국 전통 손금술사입니다. 손바닥 이미지를 분석하여 한국어로 상세한 손금 해석을 제공해주세요.

다음 손금선들을 분석해주세요:
- 생명선 (生命線): 건강과 생명력
- 감정선 (感情線): 사랑과 감정
- 지능선 (知能線): 지능과 사고력
- 운명선 (運命線): 운명과 성공
- 결혼선 (結婚線): 결혼과 연애
- 재물선 (財物線): 재물과 경제

각 항목에 대해 100-200자 정도의 상세한 해석을 한국어로 제공하고, 연애운, 재물운, 사업운, 건강운을 0-100점으로 점수화해주세요.

응답은 반드시 다음 JSON 형식으로 제공해주세요:
{
  "overall": "종합 운세 해석",
  "lifeLine": "생명선 해석",
  "heartLine": "감정선 해석",
  "headLine": "지능선 해석",
  "fateLine": "운명선 해석",
  "marriageLine": "결혼선 해석",
  "moneyLine": "재물선 해석",
  "loveScore": 85,
  "wealthScore": 72,
  "careerScore": 90,
  "healthScore": 78
}"#;

pub const USER_PROMPT: &str =
    "이 손바닥 이미지를 분석하여 전통 한국 손금술에 따라 상세한 운세를 해석해주세요.";

/// Why a reading could not be produced. Messages are shown to end users.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadingError {
    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("모델에서 응답을 받을 수 없습니다")]
    EmptyResponse,

    #[error("모델 응답을 JSON으로 해석할 수 없습니다: {0}")]
    InvalidJson(String),

    #[error("모델 응답이 JSON 객체가 아닙니다")]
    NotAnObject,

    #[error("분석 결과에 필수 필드가 누락되었습니다: {0}")]
    MissingField(&'static str),

    #[error("분석 결과의 필드 형식이 올바르지 않습니다: {0}")]
    InvalidField(&'static str),
}

/// Remove a leading `data:image/<type>;base64,` prefix if present.
///
/// `<type>` must be lowercase ASCII letters; anything else is left untouched
/// and forwarded as-is.
pub fn strip_data_url_prefix(image: &str) -> &str {
    let Some(rest) = image.strip_prefix("data:image/") else {
        return image;
    };
    let subtype_len = rest.bytes().take_while(|b| b.is_ascii_lowercase()).count();
    if subtype_len == 0 {
        return image;
    }
    rest[subtype_len..].strip_prefix(";base64,").unwrap_or(image)
}

fn narrative(fields: &Map<String, Value>, key: &'static str) -> Result<String, ReadingError> {
    match fields.get(key) {
        None | Some(Value::Null) => Err(ReadingError::MissingField(key)),
        Some(Value::String(text)) if text.trim().is_empty() => {
            Err(ReadingError::MissingField(key))
        }
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(ReadingError::InvalidField(key)),
    }
}

/// Coerce a score into `0..=MAX_SCORE`. Numbers are rounded, numeric strings
/// are parsed, and anything else falls back to `DEFAULT_SCORE`.
fn score(fields: &Map<String, Value>, key: &str) -> u8 {
    let raw = match fields.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    // An explicit 0 is a real score and stays 0. The upstream service treated
    // it as missing and reported 50; that is intentionally not reproduced.
    match raw {
        Some(v) if v.is_finite() => v.round().clamp(0.0, f64::from(MAX_SCORE)) as u8,
        _ => DEFAULT_SCORE,
    }
}

/// Validate a raw completion into an `AnalysisResult`. Unknown fields are
/// ignored.
pub fn parse_reading(raw: &str) -> Result<AnalysisResult, ReadingError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ReadingError::InvalidJson(e.to_string()))?;
    let fields = value.as_object().ok_or(ReadingError::NotAnObject)?;

    Ok(AnalysisResult {
        overall: narrative(fields, "overall")?,
        life_line: narrative(fields, "lifeLine")?,
        heart_line: narrative(fields, "heartLine")?,
        head_line: narrative(fields, "headLine")?,
        fate_line: narrative(fields, "fateLine")?,
        marriage_line: narrative(fields, "marriageLine")?,
        money_line: narrative(fields, "moneyLine")?,
        love_score: score(fields, "loveScore"),
        wealth_score: score(fields, "wealthScore"),
        career_score: score(fields, "careerScore"),
        health_score: score(fields, "healthScore"),
    })
}

/// Interprets palm photos through a `VisionProvider`.
#[derive(Clone)]
pub struct PalmReader {
    provider: Arc<dyn VisionProvider>,
    max_tokens: u32,
}

impl PalmReader {
    pub fn new(provider: Arc<dyn VisionProvider>, max_tokens: u32) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    fn vision_request(&self, image: &str) -> VisionRequest {
        VisionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_text: USER_PROMPT.to_string(),
            image_url: format!("data:image/jpeg;base64,{}", strip_data_url_prefix(image)),
            max_tokens: self.max_tokens,
            json_output: true,
        }
    }

    /// Analyze a base64 image, optionally given as a data URL.
    ///
    /// One provider call, no retries.
    pub async fn analyze(&self, image: &str) -> Result<AnalysisResult, ReadingError> {
        let request = self.vision_request(image);
        let provider = self.provider.name();
        let start = Instant::now();

        let result = self.provider.complete(&request).await;
        metrics::record_model_latency(provider, start.elapsed());

        let response = result.map_err(|e| {
            metrics::record_provider_error(provider, e.kind());
            tracing::error!(provider, model = %self.provider.model(), error = %e, "Model invocation failed");
            ReadingError::from(e)
        })?;

        tracing::info!(
            provider,
            model = %self.provider.model(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            finish_reason = ?response.finish_reason,
            "Model invocation completed"
        );

        let text = response
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or(ReadingError::EmptyResponse)?;

        parse_reading(&text)
    }
}

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use palm_service::services::providers::mock::MockVisionProvider;
use palm_service::services::{MemStorage, PalmReader};
use palm_service::startup::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

/// Body limit used by router tests; small enough to exceed cheaply.
pub const TEST_BODY_LIMIT: usize = 1024 * 1024;

pub const TEST_IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAAB";

/// Raw reply of a well-behaved model.
pub fn reading_json() -> Value {
    json!({
        "overall": "전반적으로 안정적이고 밝은 운세입니다",
        "lifeLine": "생명선이 길고 끊김 없이 이어져 건강한 체질입니다",
        "heartLine": "감정선이 검지 아래까지 뻗어 따뜻한 성품입니다",
        "headLine": "지능선이 완만하게 내려가 창의력이 뛰어납니다",
        "fateLine": "운명선이 손목에서 중지까지 선명합니다",
        "marriageLine": "결혼선이 하나로 뚜렷해 안정된 관계를 뜻합니다",
        "moneyLine": "재물선이 위로 뻗어 재물운이 상승합니다",
        "loveScore": 85,
        "wealthScore": 72,
        "careerScore": 90,
        "healthScore": 78
    })
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).expect("response body is not JSON")
    }
}

pub struct TestApp {
    pub router: Router,
    pub provider: Arc<MockVisionProvider>,
    pub store: Arc<MemStorage>,
}

impl TestApp {
    pub fn with_provider(provider: MockVisionProvider) -> Self {
        let provider = Arc::new(provider);
        let store = Arc::new(MemStorage::new());
        let state = AppState {
            reader: PalmReader::new(provider.clone(), 2000),
            store: store.clone(),
        };

        TestApp {
            router: build_router(state, TEST_BODY_LIMIT),
            provider,
            store,
        }
    }

    /// App whose model replies with `reply` serialized as JSON.
    pub fn replying(reply: &Value) -> Self {
        Self::with_provider(MockVisionProvider::with_text(reply.to_string()))
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body")
            .to_vec();

        TestResponse {
            status,
            headers,
            bytes,
        }
    }

    pub async fn post_raw(&self, uri: &str, body: impl Into<Body>) -> TestResponse {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
    }

    pub async fn analyze(&self, image_data: &str) -> TestResponse {
        self.post_raw(
            "/api/analyze-palm",
            json!({ "imageData": image_data }).to_string(),
        )
        .await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }
}

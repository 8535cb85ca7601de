//! Webhook endpoint handlers.
//!
//! The topic handler only translates between HTTP and [`WebhookTopicSync`];
//! verification and record updates live in the sync module.

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::sync::types::{EVENT_NAME_HEADER, EVENT_TYPE_HEADER, SIGNATURE_HEADER};
use crate::sync::{SyncResponse, WebhookRequest, WebhookTopicSync};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub sync: WebhookTopicSync,
}

impl AppState {
    pub fn new(sync: WebhookTopicSync) -> Self {
        Self { sync }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Discourse Topic Webhook
// =============================================================================

/// Discourse post webhook endpoint.
///
/// The body is taken as raw bytes so the signature is checked against
/// exactly what Discourse signed.
pub async fn discourse_topic_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let request = webhook_request(&headers, body);
    let response = state.sync.update_topic_content(&request);

    (status_for(&response), Json(response))
}

fn webhook_request(headers: &HeaderMap, body: Bytes) -> WebhookRequest {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    WebhookRequest {
        content_type: header(CONTENT_TYPE.as_str()),
        signature: header(SIGNATURE_HEADER),
        event_type: header(EVENT_TYPE_HEADER),
        event_name: header(EVENT_NAME_HEADER),
        body: body.to_vec(),
    }
}

fn status_for(response: &SyncResponse) -> StatusCode {
    if response.success {
        StatusCode::OK
    } else if *response == SyncResponse::not_verified() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

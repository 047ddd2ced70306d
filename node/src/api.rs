//! # Access API
//!
//! Builds the axum router that exposes the gateway's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                | Description                             |
//! |--------|---------------------|-----------------------------------------|
//! | GET    | `/health`           | Liveness probe                          |
//! | GET    | `/status`           | Gateway status summary                  |
//! | POST   | `/access/initiate`  | Handshake phase one: mint a challenge   |
//! | POST   | `/access/verify`    | Handshake phase two: redeem a grant     |
//!
//! ## Status mapping
//!
//! The protocol's failure taxonomy maps onto HTTP like so: malformed
//! input and dead challenges are `400`, failed authentication (signature
//! or response) is `401`, failed authorization (ownership) is `403`,
//! unpublished content is `404`, and everything the caller can't fix —
//! oracle outages, locator outages, internal faults — is `500` with a
//! deliberately bland body.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use ledgerbound_protocol::access::{
    AccessError, AccessProtocol, ChallengeRegistry, InitiateRequest, VerifyRequest,
};
use ledgerbound_protocol::config::PROTOCOL_FINGERPRINT;

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The gateway's reported version string.
    pub version: String,
    /// The access protocol state machine.
    pub protocol: Arc<AccessProtocol>,
    /// The challenge registry, for status and gauge reporting.
    pub registry: Arc<ChallengeRegistry>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured RPC port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/access/initiate", post(initiate_handler))
        .route("/access/verify", post(verify_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /access/initiate`.
///
/// Fields are optional at the serde layer so that a missing field yields
/// our own 400 body instead of a deserializer error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateBody {
    pub token_id: Option<u64>,
    pub contract_address: Option<String>,
    pub user_address: Option<String>,
    pub signature: Option<String>,
    pub message: Option<String>,
}

/// Success body of `POST /access/initiate`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateReply {
    pub challenge_id: String,
    pub nonce: String,
}

/// Body of `POST /access/verify`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyBody {
    pub challenge_id: Option<String>,
    pub response: Option<String>,
    pub user_address: Option<String>,
    pub token_id: Option<u64>,
    pub contract_address: Option<String>,
}

/// Success body of `POST /access/verify`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReply {
    pub decryption_key: String,
    pub content_locator: String,
    pub expires_in: u64,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Gateway software version.
    pub version: String,
    /// Protocol family fingerprint.
    pub protocol: String,
    /// Challenges currently pending in the registry.
    pub pending_challenges: usize,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Generic error body returned on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

/// The §status-table in one place: protocol error → HTTP response.
fn error_response(err: &AccessError) -> Response {
    let status = match err {
        AccessError::MalformedRequest(_) | AccessError::InvalidOrExpiredChallenge => {
            StatusCode::BAD_REQUEST
        }
        AccessError::InvalidSignature | AccessError::ResponseMismatch => StatusCode::UNAUTHORIZED,
        AccessError::NotOwner => StatusCode::FORBIDDEN,
        AccessError::ContentNotFound => StatusCode::NOT_FOUND,
        AccessError::OracleUnavailable
        | AccessError::LocatorUnavailable
        | AccessError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
        .into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the gateway is alive.
///
/// This is the liveness probe for orchestrators (k8s, systemd, etc.).
/// It intentionally does not call any collaborator — that belongs in
/// `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns gateway status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let resp = StatusResponse {
        version: state.version.clone(),
        protocol: PROTOCOL_FINGERPRINT.to_string(),
        pending_challenges: state.registry.len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    Json(resp)
}

/// `POST /access/initiate` — handshake phase one.
async fn initiate_handler(
    State(state): State<AppState>,
    body: Result<Json<InitiateBody>, JsonRejection>,
) -> Response {
    state.metrics.initiate_requests_total.inc();

    let Ok(Json(body)) = body else {
        state.metrics.denials_total.inc();
        return bad_request("request body must be valid JSON");
    };

    let (Some(token_id), Some(contract_address), Some(user_address), Some(signature), Some(message)) = (
        body.token_id,
        body.contract_address,
        body.user_address,
        body.signature,
        body.message,
    ) else {
        state.metrics.denials_total.inc();
        return bad_request(
            "missing required fields: tokenId, contractAddress, userAddress, signature, message",
        );
    };

    let request = InitiateRequest {
        token_id,
        contract_address,
        subject_address: user_address,
        signature,
        message,
    };

    match state.protocol.initiate(&request).await {
        Ok(challenge) => {
            state
                .metrics
                .challenges_pending
                .set(state.registry.len() as i64);
            (
                StatusCode::OK,
                Json(InitiateReply {
                    challenge_id: challenge.challenge_id,
                    nonce: challenge.nonce,
                }),
            )
                .into_response()
        }
        Err(err) => {
            state.metrics.denials_total.inc();
            error_response(&err)
        }
    }
}

/// `POST /access/verify` — handshake phase two.
async fn verify_handler(
    State(state): State<AppState>,
    body: Result<Json<VerifyBody>, JsonRejection>,
) -> Response {
    state.metrics.verify_requests_total.inc();

    let Ok(Json(body)) = body else {
        state.metrics.denials_total.inc();
        return bad_request("request body must be valid JSON");
    };

    let (Some(challenge_id), Some(response), Some(user_address), Some(token_id), Some(contract_address)) = (
        body.challenge_id,
        body.response,
        body.user_address,
        body.token_id,
        body.contract_address,
    ) else {
        state.metrics.denials_total.inc();
        return bad_request(
            "missing required fields: challengeId, response, userAddress, tokenId, contractAddress",
        );
    };

    let request = VerifyRequest {
        challenge_id,
        response,
        subject_address: user_address,
        token_id,
        contract_address,
    };

    let timer = state.metrics.verify_latency_seconds.start_timer();
    let outcome = state.protocol.verify(&request).await;
    timer.observe_duration();
    state
        .metrics
        .challenges_pending
        .set(state.registry.len() as i64);

    match outcome {
        Ok(grant) => {
            state.metrics.grants_issued_total.inc();
            (
                StatusCode::OK,
                Json(VerifyReply {
                    decryption_key: grant.decryption_key,
                    content_locator: grant.content_locator,
                    expires_in: grant.expires_in,
                }),
            )
                .into_response()
        }
        Err(err) => {
            state.metrics.denials_total.inc();
            error_response(&err)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

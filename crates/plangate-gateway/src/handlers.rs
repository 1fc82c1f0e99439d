//! HTTP boundary: parses inbound requests, walks the decision pipeline
//! (integrity, rate limit, fraud, validation) and emits the signed
//! response envelope.

use crate::AppState;
use crate::integrity;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use plangate_core::{Plan, Tier, Usage, UsageEvent, Verdict, resolve_features, validate_usage};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

const MAX_TIMESTAMP_AGE_MS: i64 = 5 * 60 * 1_000;

/// Pipeline rejections. Each maps to one status code; every body keeps the
/// single envelope shape clients parse. Internal detail never leaves the
/// server: the enum messages are the entire client-visible surface.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("Malformed request body")]
    MalformedBody,
    #[error("Missing required fields")]
    MissingFields,
    #[error("Request timestamp too old")]
    StaleTimestamp,
    #[error("Request integrity check failed")]
    ChecksumMismatch,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Suspicious activity detected")]
    FraudSuspected,
    #[error("Internal server error")]
    Internal,
}

impl Rejection {
    fn status(&self) -> StatusCode {
        match self {
            Rejection::MalformedBody
            | Rejection::MissingFields
            | Rejection::StaleTimestamp
            | Rejection::ChecksumMismatch => StatusCode::BAD_REQUEST,
            Rejection::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Rejection::FraudSuspected => StatusCode::FORBIDDEN,
            Rejection::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<&'static str> {
        match self {
            Rejection::MissingFields => Some("planType and usage are required"),
            _ => None,
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let mut body = json!({ "valid": false, "error": self.to_string() });
        if let Some(details) = self.details() {
            body["details"] = json!(details);
        }
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest {
    plan_type: Option<String>,
    usage: Option<Value>,
    client_checksum: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    #[serde(flatten)]
    pub verdict: Verdict,
    pub server_signature: String,
    pub validated_at: String,
    pub request_id: String,
}

pub async fn validate_plan_usage(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let client_id = client_ip(&headers);
    let request_id = header_str(&headers, "x-request-id")
        .unwrap_or("unknown")
        .to_string();

    match decide(&state, &headers, &client_id, &request_id, &body) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

/// The whole decision path is synchronous and in-memory; only the signature
/// at the end is CPU-bound, and it runs after every client lock is
/// released. Window appends happen inside their stores as the last step of
/// an allowed stage, so an abandoned request leaves no partial state.
fn decide(
    state: &AppState,
    headers: &HeaderMap,
    client_id: &str,
    request_id: &str,
    body: &[u8],
) -> Result<ValidateResponse, Rejection> {
    let request: ValidateRequest = serde_json::from_slice(body).map_err(|err| {
        warn!(client = client_id, request_id, %err, "malformed validation request");
        Rejection::MalformedBody
    })?;

    let (Some(plan_type), Some(usage_value)) = (request.plan_type, request.usage) else {
        warn!(
            client = client_id,
            request_id, "validation request missing planType or usage"
        );
        return Err(Rejection::MissingFields);
    };

    let usage: Usage = serde_json::from_value(usage_value.clone()).map_err(|err| {
        warn!(client = client_id, request_id, %err, "unparseable usage object");
        Rejection::MalformedBody
    })?;

    let now = Utc::now();
    let now_ms = now.timestamp_millis();

    // Replay protection: reject declared timestamps older than five
    // minutes. Absent or unparseable headers pass through.
    if let Some(ts) = header_str(headers, "x-timestamp").and_then(|v| v.parse::<i64>().ok()) {
        let age_ms = now_ms - ts;
        if age_ms > MAX_TIMESTAMP_AGE_MS {
            warn!(client = client_id, request_id, age_ms, "stale request timestamp");
            return Err(Rejection::StaleTimestamp);
        }
    }

    // Tamper check over the payload as the client sent it. Logged with the
    // action type only, never the payload.
    if let Some(checksum) = &request.client_checksum {
        if !integrity::verify_checksum(&plan_type, &usage_value, checksum) {
            warn!(
                client = client_id,
                request_id,
                action = usage.action_type.as_deref().unwrap_or("unknown"),
                "request checksum mismatch"
            );
            return Err(Rejection::ChecksumMismatch);
        }
    }

    if !state.rate_limiter.check_and_record(client_id, now_ms) {
        warn!(client = client_id, request_id, "validation rate limited");
        return Err(Rejection::RateLimited);
    }

    let event = UsageEvent {
        plan_type: plan_type.clone(),
        action_type: usage.action_type.clone(),
        image_count: usage.image_count,
        batch_size: usage.batch_size,
        client_id: client_id.to_string(),
        timestamp: now,
    };
    if let Some(signal) = state.fraud_detector.observe(&event) {
        warn!(
            client = client_id,
            request_id,
            %signal,
            window = ?state.fraud_detector.snapshot(client_id),
            "fraudulent activity suspected"
        );
        return Err(Rejection::FraudSuspected);
    }

    let verdict = validate_usage(&plan_type, &usage);
    if verdict.valid {
        info!(
            client = client_id,
            request_id,
            plan = %plan_type,
            action = usage.action_type.as_deref().unwrap_or("unknown"),
            "plan usage validated"
        );
    } else {
        info!(
            client = client_id,
            request_id,
            plan = %plan_type,
            action = usage.action_type.as_deref().unwrap_or("unknown"),
            reason = %verdict.details,
            "plan usage rejected"
        );
    }

    let verdict_value = serde_json::to_value(&verdict).map_err(|err| {
        warn!(request_id, %err, "verdict serialization failed");
        Rejection::Internal
    })?;
    let server_signature = integrity::sign_response(&verdict_value, &state.config.signing_key);

    Ok(ValidateResponse {
        verdict,
        server_signature,
        validated_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        request_id: request_id.to_string(),
    })
}

pub async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

pub async fn list_plans(State(_state): State<AppState>) -> impl IntoResponse {
    Json(Plan::all())
}

pub async fn get_plan(
    State(_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Plan>, StatusCode> {
    Plan::lookup(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Deserialize)]
pub struct FeatureQuery {
    /// Comma-separated addon feature ids.
    addons: Option<String>,
}

pub async fn feature_profile(
    State(_state): State<AppState>,
    Path(tier): Path<String>,
    Query(query): Query<FeatureQuery>,
) -> Response {
    let tier = match Tier::parse(&tier) {
        Ok(tier) => tier,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response();
        }
    };
    let addons: Vec<String> = query
        .addons
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    Json(resolve_features(tier, &addons)).into_response()
}

fn client_ip(headers: &HeaderMap) -> String {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| header_str(headers, "client-ip"))
        .unwrap_or("unknown")
        .to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

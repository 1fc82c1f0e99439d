use crate::config::Config;
use crate::integrity;
use crate::{AppState, create_app};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_app() -> Router {
    create_app(AppState::new(Config::default()))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value, axum::http::HeaderMap) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json, headers)
}

async fn validate(
    app: &Router,
    client: &str,
    body: Value,
    extra_headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut headers = vec![("x-forwarded-for", client)];
    headers.extend_from_slice(extra_headers);
    let (status, json, _) = send(app, "POST", "/validate-plan-usage", &headers, Some(body)).await;
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();
    let (status, json, _) = send(&app, "GET", "/health", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_free_upload_decision_envelope() {
    let app = test_app();
    let body = json!({
        "planType": "free",
        "usage": { "actionType": "upload", "imageCount": 3 }
    });
    let (status, json) =
        validate(&app, "10.0.0.1", body, &[("x-request-id", "req-123")]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], true);
    assert_eq!(json["details"], "Upload allowed");
    assert_eq!(json["remainingUsage"]["uploads"], 2);
    assert_eq!(json["requestId"], "req-123");
    let signature = json["serverSignature"].as_str().unwrap();
    assert_eq!(signature.len(), 16);
    assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(json["validatedAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_teams_upload_unlimited_sentinel() {
    let app = test_app();
    let body = json!({
        "planType": "teams",
        "usage": { "actionType": "upload", "imageCount": 1000 }
    });
    let (status, json) = validate(&app, "10.0.0.2", body, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], true);
    assert_eq!(json["remainingUsage"]["uploads"], -1);
}

#[tokio::test]
async fn test_pro_batch_over_limit() {
    let app = test_app();
    let body = json!({
        "planType": "pro",
        "usage": { "actionType": "batch", "batchSize": 150 }
    });
    let (status, json) = validate(&app, "10.0.0.3", body, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], false);
    assert_eq!(json["details"], "Batch size 150 exceeds limit of 100");
    assert_eq!(json["remainingUsage"]["maxBatchSize"], 100);
}

#[tokio::test]
async fn test_unknown_plan_is_a_decision_not_an_error() {
    let app = test_app();
    let body = json!({
        "planType": "premium",
        "usage": { "actionType": "upload" }
    });
    let (status, json) = validate(&app, "10.0.0.4", body, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], false);
    assert_eq!(json["details"], "Invalid plan type");
    assert_eq!(json["remainingUsage"], Value::Null);
}

#[tokio::test]
async fn test_unknown_action_is_a_decision_not_an_error() {
    let app = test_app();
    let body = json!({
        "planType": "free",
        "usage": { "actionType": "teleport" }
    });
    let (status, json) = validate(&app, "10.0.0.5", body, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], false);
    assert_eq!(json["details"], "Unknown action type: teleport");
}

#[tokio::test]
async fn test_missing_fields_rejected() {
    let app = test_app();
    let (status, json) = validate(&app, "10.0.0.6", json!({ "planType": "free" }), &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["valid"], false);
    assert_eq!(json["error"], "Missing required fields");
    assert_eq!(json["details"], "planType and usage are required");
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let app = test_app();
    let (status, json, _) = send(
        &app,
        "POST",
        "/validate-plan-usage",
        &[("x-forwarded-for", "10.0.0.7"), ("content-type", "application/json")],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["valid"], false);
    assert_eq!(json["error"], "Malformed request body");
}

#[tokio::test]
async fn test_stale_timestamp_rejected() {
    let app = test_app();
    let body = json!({
        "planType": "free",
        "usage": { "actionType": "upload", "imageCount": 1 }
    });
    let stale = (chrono::Utc::now().timestamp_millis() - 6 * 60 * 1000).to_string();
    let (status, json) =
        validate(&app, "10.0.0.8", body.clone(), &[("x-timestamp", stale.as_str())]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Request timestamp too old");

    // A fresh timestamp passes.
    let fresh = chrono::Utc::now().timestamp_millis().to_string();
    let (status, _) =
        validate(&app, "10.0.0.8", body, &[("x-timestamp", fresh.as_str())]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_checksum_verified_when_present() {
    let app = test_app();
    let usage = json!({ "actionType": "upload", "imageCount": 3 });
    let checksum = integrity::compute_checksum("free", &usage);

    let body = json!({
        "planType": "free",
        "usage": usage,
        "clientChecksum": checksum
    });
    let (status, json) = validate(&app, "10.0.0.9", body, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], true);
}

#[tokio::test]
async fn test_tampered_payload_rejected() {
    let app = test_app();
    // Checksum computed for 3 images, payload claims 30.
    let checksum =
        integrity::compute_checksum("free", &json!({ "actionType": "upload", "imageCount": 3 }));
    let body = json!({
        "planType": "free",
        "usage": { "actionType": "upload", "imageCount": 30 },
        "clientChecksum": checksum
    });
    let (status, json) = validate(&app, "10.0.0.10", body, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Request integrity check failed");
}

#[tokio::test]
async fn test_burst_hits_flood_heuristic_then_rate_limit() {
    let app = test_app();
    let body = json!({
        "planType": "pro",
        "usage": { "actionType": "upload", "imageCount": 1 }
    });

    // First 30 requests decide normally; 31..=60 trip the flood heuristic
    // (403); once 60 slots are consumed the limiter answers first (429).
    for i in 1..=61u32 {
        let (status, _) = validate(&app, "10.1.0.1", body.clone(), &[]).await;
        let expected = if i <= 30 {
            StatusCode::OK
        } else if i <= 60 {
            StatusCode::FORBIDDEN
        } else {
            StatusCode::TOO_MANY_REQUESTS
        };
        assert_eq!(status, expected, "request {i}");
    }
}

#[tokio::test]
async fn test_plan_hopping_flagged() {
    let app = test_app();
    for plan in ["free", "starter", "pro"] {
        let body = json!({ "planType": plan, "usage": { "actionType": "upload" } });
        let (status, _) = validate(&app, "10.1.0.2", body, &[]).await;
        assert_eq!(status, StatusCode::OK);
    }
    // Fourth distinct plan in the window flags the client.
    let body = json!({ "planType": "teams", "usage": { "actionType": "upload" } });
    let (status, json) = validate(&app, "10.1.0.2", body, &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "Suspicious activity detected");
}

#[tokio::test]
async fn test_free_batch_abuse_flagged() {
    let app = test_app();
    let body = json!({ "planType": "free", "usage": { "actionType": "batch", "batchSize": 2 } });
    for _ in 0..5 {
        // Batch is not available on free, but that is a plain decision.
        let (status, json) = validate(&app, "10.1.0.3", body.clone(), &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["valid"], false);
    }
    let (status, _) = validate(&app, "10.1.0.3", body, &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_fraud_windows_keyed_by_client() {
    let app = test_app();
    for (client, plan) in [
        ("10.1.0.4", "free"),
        ("10.1.0.5", "starter"),
        ("10.1.0.6", "pro"),
        ("10.1.0.7", "teams"),
    ] {
        let body = json!({ "planType": plan, "usage": { "actionType": "upload" } });
        let (status, _) = validate(&app, client, body, &[]).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_wrong_method_rejected() {
    let app = test_app();
    let (status, _, _) = send(&app, "GET", "/validate-plan-usage", &[], None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = test_app();
    let (status, body, headers) = send(
        &app,
        "OPTIONS",
        "/validate-plan-usage",
        &[
            ("origin", "https://proofpixapp.com"),
            ("access-control-request-method", "POST"),
        ],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "https://proofpixapp.com"
    );
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let app = test_app();
    for (method, uri) in [("GET", "/health"), ("POST", "/validate-plan-usage")] {
        let (_, _, headers) = send(&app, method, uri, &[], Some(json!({}))).await;
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            headers.get("strict-transport-security").unwrap(),
            "max-age=31536000; includeSubDomains"
        );
    }
}

#[tokio::test]
async fn test_plan_catalog_endpoints() {
    let app = test_app();
    let (status, json, _) = send(&app, "GET", "/plans", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 7);

    let (status, json, _) = send(&app, "GET", "/plans/pro", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "pro");
    assert_eq!(json["limits"]["batchSize"], 100);

    let (status, _, _) = send(&app, "GET", "/plans/premium", &[], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_feature_profile_endpoint() {
    let app = test_app();
    let (status, json, _) = send(&app, "GET", "/features/business", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tier"], "business");
    assert!(json["resolvedFeatures"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f == "advanced_ai"));

    let (status, json, _) = send(
        &app,
        "GET",
        "/features/free?addons=legal_ai_package",
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["resolvedFeatures"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f == "legal_ai_package"));

    let (status, json, _) = send(&app, "GET", "/features/platinum", &[], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("platinum"));
}

//! Black-box HTTP fixtures straight from the end-to-end scenarios: happy
//! path, tampered sibling, revoked output, and auth/role enforcement.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use ed25519_dalek::SigningKey;
use http_body_util::BodyExt;
use rand::rngs::OsRng;
use serde_json::{json, Value};
use tower::ServiceExt;

use symbi_ticket::config::Config;
use symbi_ticket::crypto::Keystore;
use symbi_ticket::ratelimit::RateLimitConfig;
use symbi_ticket::service::{build_router, AppState};
use symbi_ticket::ticket::{BuildArgs, Scope, SubReceipts, TicketBuilder};

fn test_config(keystore: Keystore) -> Config {
    Config {
        addr: "0.0.0.0:0".parse().unwrap(),
        keystore: Arc::new(keystore),
        rate_limit: RateLimitConfig {
            capacity: 1000.0,
            refill_per_sec: 1000.0,
        },
        retention_days: 90,
    }
}

fn make_router(keystore: Keystore) -> axum::Router {
    let state = Arc::new(AppState::new(test_config(keystore), None));
    build_router(state)
}

fn make_router_with_rate_limit(keystore: Keystore, rate_limit: RateLimitConfig) -> axum::Router {
    let mut config = test_config(keystore);
    config.rate_limit = rate_limit;
    let state = Arc::new(AppState::new(config, None));
    build_router(state)
}

fn sample_ticket(ks: &Keystore) -> Value {
    let ticket = TicketBuilder::build(
        BuildArgs {
            tenant_id: "t1".into(),
            conversation_id: "c1".into(),
            output_id: "o1".into(),
            created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
            model: "m1".into(),
            policy_pack: "pp1".into(),
            shards: vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec()],
            sub_receipts: SubReceipts::default(),
            scope: Scope {
                allow_raw: false,
                allow_training: false,
                max_retention_days: 30,
                purpose: "audit".into(),
            },
            transparency_log: vec![],
            summary: "test".into(),
        },
        ks,
        ks,
        ks,
        ks,
    );
    serde_json::to_value(ticket).unwrap()
}

async fn post_verify(router: &axum::Router, ticket: &Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/verify")
        .header("content-type", "application/json")
        .header("X-Tenant-Id", "t1")
        .header("X-Role", "analyst")
        .body(Body::from(serde_json::to_vec(ticket).unwrap()))
        .unwrap();

    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

#[tokio::test]
async fn happy_path_ticket_verifies_as_valid() {
    let ks = Keystore::new().with_signing_key(SigningKey::generate(&mut OsRng));
    let router = make_router(ks.clone());
    let ticket = sample_ticket(&ks);

    let (status, body) = post_verify(&router, &ticket).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(true));
    assert_eq!(body["checks"]["merkleOk"], json!(true));
    assert_eq!(body["checks"]["proofOk"], json!(true));
}

#[tokio::test]
async fn tampered_proof_sibling_fails_verification() {
    let ks = Keystore::new().with_signing_key(SigningKey::generate(&mut OsRng));
    let router = make_router(ks.clone());
    let mut ticket = sample_ticket(&ks);
    ticket["receipts"]["merkle_proofs"][0]["siblings"][0] = json!("x".repeat(64));

    let (status, body) = post_verify(&router, &ticket).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["checks"]["proofOk"], json!(false));
}

#[tokio::test]
async fn revoked_output_is_rejected_without_crypto_checks() {
    let ks = Keystore::new().with_signing_key(SigningKey::generate(&mut OsRng));
    let router = make_router(ks.clone());
    let ticket = sample_ticket(&ks);

    let revoke_req = Request::builder()
        .method("POST")
        .uri("/revoke")
        .header("content-type", "application/json")
        .header("X-Tenant-Id", "t1")
        .header("X-Role", "admin")
        .body(Body::from(
            serde_json::to_vec(&json!({ "output_id": "o1", "reason": "test" })).unwrap(),
        ))
        .unwrap();
    let resp = router.clone().oneshot(revoke_req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, body) = post_verify(&router, &ticket).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(false));
    assert_eq!(body["error"], json!("Revoked output"));
    assert!(body.get("checks").is_none() || body["checks"].is_null());
}

#[tokio::test]
async fn missing_tenant_header_is_rejected() {
    let ks = Keystore::new().with_signing_key(SigningKey::generate(&mut OsRng));
    let router = make_router(ks.clone());
    let ticket = sample_ticket(&ks);

    let req = Request::builder()
        .method("POST")
        .uri("/verify")
        .header("content-type", "application/json")
        .header("X-Role", "analyst")
        .body(Body::from(serde_json::to_vec(&ticket).unwrap()))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn read_only_role_cannot_revoke() {
    let ks = Keystore::new().with_signing_key(SigningKey::generate(&mut OsRng));
    let router = make_router(ks);

    let req = Request::builder()
        .method("POST")
        .uri("/revoke")
        .header("content-type", "application/json")
        .header("X-Tenant-Id", "t1")
        .header("X-Role", "read-only")
        .body(Body::from(
            serde_json::to_vec(&json!({ "output_id": "o1", "reason": "test" })).unwrap(),
        ))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn healthz_and_readyz_require_no_auth() {
    let ks = Keystore::new();
    let router = make_router(ks);

    for path in ["/healthz", "/readyz"] {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn exhausting_the_rate_limit_bucket_yields_429() {
    let ks = Keystore::new().with_signing_key(SigningKey::generate(&mut OsRng));
    let router = make_router_with_rate_limit(
        ks.clone(),
        RateLimitConfig {
            capacity: 1.0,
            refill_per_sec: 0.0,
        },
    );
    let ticket = sample_ticket(&ks);

    let (first_status, _) = post_verify(&router, &ticket).await;
    assert_eq!(first_status, StatusCode::OK);

    let (second_status, _) = post_verify(&router, &ticket).await;
    assert_eq!(second_status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn ledger_append_then_list_round_trips_over_http() {
    let ks = Keystore::new();
    let router = make_router(ks);

    let append_req = Request::builder()
        .method("POST")
        .uri("/ledger/append")
        .header("content-type", "application/json")
        .header("X-Tenant-Id", "t1")
        .header("X-Role", "auditor")
        .body(Body::from(
            serde_json::to_vec(&json!({ "type": "receipt", "hash": "a".repeat(64) })).unwrap(),
        ))
        .unwrap();
    let resp = router.clone().oneshot(append_req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let list_req = Request::builder()
        .uri("/ledger")
        .header("X-Tenant-Id", "t1")
        .header("X-Role", "auditor")
        .body(Body::empty())
        .unwrap();
    let resp = router.clone().oneshot(list_req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["entries"].as_array().unwrap().len(), 1);
}

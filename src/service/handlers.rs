//! HTTP handlers for the verification service. Request bodies are parsed
//! manually rather than via `axum::Json` so a malformed body surfaces as
//! `AppError::MalformedInput` (spec-mandated 400) rather than axum's own
//! rejection type.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Extension, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::ticket::{verify_ticket_crypto, Ticket, Verdict};

use super::auth::{Identity, ROLE_ADMIN, ROLE_AUDITOR};
use super::AppState;

fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::MalformedInput(e.to_string()))
}

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn readyz() -> Json<Value> {
    Json(json!({ "status": "ready" }))
}

pub async fn metrics_text(State(state): State<Arc<AppState>>) -> String {
    state
        .prometheus_handle
        .as_ref()
        .map(|h| h.render())
        .unwrap_or_default()
}

pub async fn metrics_json(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::to_value(state.metrics.snapshot()).unwrap_or_else(|_| json!({})))
}

/// Executes the seven-step `/verify` algorithm: revocation short-circuits
/// before any cryptographic work, and every outcome short of a handler
/// exception returns HTTP 200 with a structured verdict.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Verdict>, AppError> {
    state.metrics.assessment_started();
    let started = Instant::now();

    let ticket: Ticket = match parse_body(&body) {
        Ok(t) => t,
        Err(err) => {
            state.metrics.receipt_verification_failure();
            return Err(err);
        }
    };
    let output_id = ticket.receipts.sybi.output_id.clone();

    if let Some(record) = state.revocation.is_revoked(&output_id) {
        tracing::info!(%output_id, reason = %record.reason, "verify rejected: output revoked");
        state.metrics.receipt_verification(started.elapsed());
        state.metrics.assessment_completed();
        return Ok(Json(Verdict {
            valid: false,
            checks: None,
            root: None,
            error: Some("Revoked output".to_string()),
        }));
    }

    let checks = verify_ticket_crypto(&ticket, &state.config.keystore, &state.config.keystore);
    let valid = checks.valid();

    tracing::info!(%output_id, valid, "verify completed");
    state.metrics.receipt_verification(started.elapsed());
    state.metrics.assessment_completed();

    Ok(Json(Verdict {
        valid,
        checks: Some(checks),
        root: Some(ticket.receipts.merkle_root.clone()),
        error: None,
    }))
}

#[derive(Deserialize)]
pub struct RevokeRequest {
    pub output_id: String,
    pub reason: String,
}

pub async fn revoke(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    identity.require_role(&[ROLE_ADMIN, ROLE_AUDITOR])?;
    let req: RevokeRequest = parse_body(&body)?;
    let record = state.revocation.revoke(req.output_id, req.reason);
    Ok(Json(serde_json::to_value(record).unwrap_or_else(|_| json!({}))))
}

pub async fn ledger_list(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    identity.require_role(&[ROLE_ADMIN, ROLE_AUDITOR])?;
    let entries = state.ledger.list();
    Ok(Json(json!({ "entries": entries })))
}

#[derive(Deserialize)]
pub struct LedgerAppendRequest {
    #[serde(rename = "type", default = "default_entry_type")]
    pub entry_type: String,
    pub hash: String,
    #[serde(default)]
    pub meta: Value,
}

fn default_entry_type() -> String {
    "receipt".to_string()
}

pub async fn ledger_append(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    identity.require_role(&[ROLE_ADMIN, ROLE_AUDITOR])?;
    let req: LedgerAppendRequest = parse_body(&body)?;
    let entry = state.ledger.append(req.entry_type, req.hash, req.meta);
    Ok(Json(serde_json::to_value(entry).unwrap_or_else(|_| json!({}))))
}

pub async fn ledger_anchor_internal(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    identity.require_role(&[ROLE_ADMIN, ROLE_AUDITOR])?;
    let anchor = state.ledger.anchor_internal();
    Ok(Json(serde_json::to_value(anchor).unwrap_or_else(|_| json!({}))))
}

pub async fn ledger_anchor_external(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    identity.require_role(&[ROLE_ADMIN, ROLE_AUDITOR])?;
    let id = state.ledger.anchor_external();
    Ok(Json(json!({ "external_anchor_id": id })))
}

#[derive(Serialize)]
pub struct PurgeReport {
    pub ledger_rows_removed: usize,
    pub revocation_rows_removed: usize,
}

pub async fn jobs_purge(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    identity.require_role(&[ROLE_ADMIN])?;
    let cutoff = chrono::Utc::now() - chrono::Duration::days(state.config.retention_days);
    let report = PurgeReport {
        ledger_rows_removed: state.ledger.purge_older_than(cutoff),
        revocation_rows_removed: state.revocation.purge_older_than(cutoff),
    };
    Ok(Json(serde_json::to_value(report).unwrap_or_else(|_| json!({}))))
}

pub async fn jobs_anchor(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    identity.require_role(&[ROLE_ADMIN, ROLE_AUDITOR])?;
    let internal = state.ledger.anchor_internal();
    let external_id = state.ledger.anchor_external();
    Ok(Json(json!({ "internal_anchor": internal, "external_anchor_id": external_id })))
}

/// Analytical-only; reports drift but never gates `/verify`.
pub async fn jobs_drift(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    identity.require_role(&[ROLE_ADMIN, ROLE_AUDITOR])?;
    let drift = state.ledger.drift();
    Ok(Json(serde_json::to_value(drift).unwrap_or_else(|_| json!({}))))
}

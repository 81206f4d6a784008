//! Tenant/role extraction and per-tenant rate limiting middleware.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::error::AppError;

use super::AppState;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_AUDITOR: &str = "auditor";
pub const ROLE_ANALYST: &str = "analyst";
pub const ROLE_READ_ONLY: &str = "read-only";

const ALL_ROLES: [&str; 4] = [ROLE_ADMIN, ROLE_AUDITOR, ROLE_ANALYST, ROLE_READ_ONLY];

/// Request-scoped identity extracted from `X-Tenant-Id`/`X-Role`.
#[derive(Debug, Clone)]
pub struct Identity {
    pub tenant_id: String,
    pub role: String,
}

/// Validates tenant/role headers, consumes one rate-limit token, and attaches
/// a request id (and any incoming `traceparent`) to the tracing span. Role
/// allow-listing per endpoint happens in the handler, not here, since the
/// allow-list varies per route.
pub async fn require_identity(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let request_id = Uuid::new_v4();
    let traceparent = req
        .headers()
        .get("traceparent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let tenant_id = req
        .headers()
        .get("X-Tenant-Id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(AppError::MissingTenant)?;

    let role = req
        .headers()
        .get("X-Role")
        .and_then(|v| v.to_str().ok())
        .filter(|s| ALL_ROLES.contains(s))
        .map(str::to_string)
        .ok_or(AppError::InvalidRole)?;

    if !state.rate_limiter.try_consume(&tenant_id) {
        tracing::debug!(%tenant_id, "rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    tracing::debug!(%request_id, ?traceparent, %tenant_id, %role, "authorized request");

    req.extensions_mut().insert(Identity { tenant_id, role });
    Ok(next.run(req).await)
}

impl Identity {
    pub fn require_role(&self, allowed: &[&str]) -> Result<(), AppError> {
        if allowed.contains(&self.role.as_str()) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

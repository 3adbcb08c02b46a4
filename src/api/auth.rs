//! Identity extraction. Session verification lives in the auth gateway
//! upstream; by the time a request reaches this service the gateway has
//! already authenticated it and injected the account identity as headers.
//! These extractors only read that contract - they never re-verify.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::TokenError;
use crate::AppState;

const CHILD_HEADER: &str = "x-child-id";
const FAMILY_HEADER: &str = "x-family-id";
const INTERNAL_SECRET_HEADER: &str = "x-internal-secret";

/// Verified child account id for child-facing routes.
pub struct ChildId(pub String);

/// Verified family account id for parent-facing routes.
pub struct FamilyId(pub String);

/// Marker for internal operational routes (scheduler, profile service).
pub struct InternalAuth;

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for ChildId {
    type Rejection = TokenError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        header_value(parts, CHILD_HEADER)
            .map(ChildId)
            .ok_or_else(|| TokenError::Unauthorized("child session required".to_string()))
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for FamilyId {
    type Rejection = TokenError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        header_value(parts, FAMILY_HEADER)
            .map(FamilyId)
            .ok_or_else(|| TokenError::Unauthorized("parent session required".to_string()))
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for InternalAuth {
    type Rejection = TokenError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let supplied = header_value(parts, INTERNAL_SECRET_HEADER);
        if supplied.as_deref() == Some(state.internal_api_secret.as_str()) {
            Ok(InternalAuth)
        } else {
            Err(TokenError::Unauthorized(
                "invalid internal secret".to_string(),
            ))
        }
    }
}

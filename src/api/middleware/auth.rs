//! Service credential middleware
//!
//! Every endpoint except the health probes sits behind this check. The
//! credential can arrive as a bearer token, an `X-API-Key` header, or a
//! `token` query parameter (the validation endpoint is called by clients
//! that can only pass a query string).

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;

/// Extractor that requires the configured service credential
#[derive(Debug, Clone, Copy)]
pub struct RequireServiceKey;

impl FromRequestParts<AppState> for RequireServiceKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = extract_credential(parts)?;

        if !state.verify_service_key(&presented) {
            debug!("Service credential mismatch");
            return Err(ApiError::unauthorized("Invalid service credential"));
        }

        Ok(RequireServiceKey)
    }
}

fn extract_credential(parts: &Parts) -> Result<String, ApiError> {
    // Authorization header first (Bearer token)
    if let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid Authorization header encoding"))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(token.trim().to_string());
        }
    }

    // X-API-Key header
    if let Some(api_key_header) = parts.headers.get("x-api-key") {
        let key = api_key_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid X-API-Key header encoding"))?;

        return Ok(key.trim().to_string());
    }

    // token query parameter, percent-decoded
    if let Ok(Query(params)) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri) {
        if let Some(token) = params.get("token") {
            return Ok(token.trim().to_string());
        }
    }

    Err(ApiError::unauthorized(
        "Service credential required. Provide via 'Authorization: Bearer <key>', \
         'X-API-Key: <key>' header, or '?token=<key>' query parameter",
    ))
}

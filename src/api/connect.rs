//! Subscription key validation endpoint

use axum::extract::{Path, State};
use serde::Serialize;
use tracing::debug;

use crate::api::middleware::RequireServiceKey;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, SubscriptionSnapshot};

/// Validation response with the record snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ConnectResponse {
    pub success: bool,
    pub subscription: SubscriptionSnapshot,
}

/// GET /users/user/connect/{key}
///
/// Validates a subscription key. An expired key is deactivated as a side
/// effect (persisted before the 410 goes out) and a valid one gets its
/// `last_checked_at` touched.
pub async fn connect(
    State(state): State<AppState>,
    RequireServiceKey: RequireServiceKey,
    Path(key): Path<String>,
) -> Result<Json<ConnectResponse>, ApiError> {
    debug!(key = %key, "Validation request");

    let record = state
        .subscriptions
        .check_key(&key)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ConnectResponse {
        success: true,
        subscription: SubscriptionSnapshot::from(&record),
    }))
}

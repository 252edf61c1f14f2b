//! Subscription management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::api::middleware::RequireServiceKey;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, SubscriptionSnapshot};
use crate::domain::{OwnerProfile, SubscriptionFilter};
use crate::infrastructure::IssueSubscriptionRequest;

/// Request to issue a new subscription key
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Caller-supplied key string
    pub key: String,
    pub plan_type: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Days until expiry; zero or absent issues a permanent key
    #[serde(default)]
    pub duration_days: Option<i64>,
}

impl From<CreateSubscriptionRequest> for IssueSubscriptionRequest {
    fn from(req: CreateSubscriptionRequest) -> Self {
        let owner = OwnerProfile {
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
        };

        Self {
            key: req.key,
            plan_type: req.plan_type,
            owner_id: req.owner_id,
            owner: (!owner.is_empty()).then_some(owner),
            duration_days: req.duration_days,
        }
    }
}

/// Exact-match list filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListSubscriptionsQuery {
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub plan_type: Option<String>,
}

impl From<ListSubscriptionsQuery> for SubscriptionFilter {
    fn from(query: ListSubscriptionsQuery) -> Self {
        Self {
            owner_id: query.owner_id,
            is_active: query.is_active,
            plan_type: query.plan_type,
        }
    }
}

/// Single-subscription response envelope
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub success: bool,
    pub subscription: SubscriptionSnapshot,
}

impl SubscriptionResponse {
    fn of(record: &crate::domain::SubscriptionRecord) -> Self {
        Self {
            success: true,
            subscription: SubscriptionSnapshot::from(record),
        }
    }
}

/// List response with count + array
#[derive(Debug, Clone, Serialize)]
pub struct ListSubscriptionsResponse {
    pub success: bool,
    pub total: usize,
    pub subscriptions: Vec<SubscriptionSnapshot>,
}

/// Delete confirmation
#[derive(Debug, Clone, Serialize)]
pub struct DeleteSubscriptionResponse {
    pub success: bool,
    pub deleted: String,
}

/// On-demand cleanup result
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub deactivated: u64,
}

/// POST /subscriptions
pub async fn create_subscription(
    State(state): State<AppState>,
    RequireServiceKey: RequireServiceKey,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), ApiError> {
    debug!(key = %request.key, plan = %request.plan_type, "Creating subscription");

    let record = state
        .subscriptions
        .issue(request.into())
        .await
        .map_err(ApiError::from)?;

    Ok((StatusCode::CREATED, Json(SubscriptionResponse::of(&record))))
}

/// GET /subscriptions/{key}
pub async fn get_subscription(
    State(state): State<AppState>,
    RequireServiceKey: RequireServiceKey,
    Path(key): Path<String>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    debug!(key = %key, "Getting subscription");

    let record = state
        .subscriptions
        .get(&key)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found(format!("Subscription '{}' not found", key)))?;

    Ok(Json(SubscriptionResponse::of(&record)))
}

/// PUT /subscriptions/{key}
///
/// Permissive field merge: allow-listed fields are applied, unknown field
/// names are ignored.
pub async fn update_subscription(
    State(state): State<AppState>,
    RequireServiceKey: RequireServiceKey,
    Path(key): Path<String>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    debug!(key = %key, "Updating subscription");

    let record = state
        .subscriptions
        .update_fields(&key, &fields)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(SubscriptionResponse::of(&record)))
}

/// DELETE /subscriptions/{key}
pub async fn delete_subscription(
    State(state): State<AppState>,
    RequireServiceKey: RequireServiceKey,
    Path(key): Path<String>,
) -> Result<Json<DeleteSubscriptionResponse>, ApiError> {
    debug!(key = %key, "Deleting subscription");

    state
        .subscriptions
        .delete(&key)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(DeleteSubscriptionResponse {
        success: true,
        deleted: key,
    }))
}

/// GET /subscriptions
pub async fn list_subscriptions(
    State(state): State<AppState>,
    RequireServiceKey: RequireServiceKey,
    Query(query): Query<ListSubscriptionsQuery>,
) -> Result<Json<ListSubscriptionsResponse>, ApiError> {
    debug!("Listing subscriptions");

    let records = state
        .subscriptions
        .list(&query.into())
        .await
        .map_err(ApiError::from)?;

    let subscriptions: Vec<SubscriptionSnapshot> =
        records.iter().map(SubscriptionSnapshot::from).collect();

    Ok(Json(ListSubscriptionsResponse {
        success: true,
        total: subscriptions.len(),
        subscriptions,
    }))
}

/// POST /subscriptions/cleanup
///
/// Operator-triggered sweep; same atomic bulk update as the scheduled tick.
pub async fn cleanup_subscriptions(
    State(state): State<AppState>,
    RequireServiceKey: RequireServiceKey,
) -> Result<Json<CleanupResponse>, ApiError> {
    debug!("On-demand expiration sweep");

    let deactivated = state
        .subscriptions
        .sweep_expired()
        .await
        .map_err(ApiError::from)?;

    Ok(Json(CleanupResponse {
        success: true,
        deactivated,
    }))
}

/// POST /subscriptions/{key}/toggle
pub async fn toggle_subscription(
    State(state): State<AppState>,
    RequireServiceKey: RequireServiceKey,
    Path(key): Path<String>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    debug!(key = %key, "Toggling subscription active flag");

    let record = state
        .subscriptions
        .toggle_active(&key)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(SubscriptionResponse::of(&record)))
}

/// POST /subscriptions/{key}/freeze
pub async fn freeze_subscription(
    State(state): State<AppState>,
    RequireServiceKey: RequireServiceKey,
    Path(key): Path<String>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    debug!(key = %key, "Freezing subscription");

    let record = state
        .subscriptions
        .freeze(&key)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(SubscriptionResponse::of(&record)))
}

/// POST /subscriptions/{key}/unfreeze
pub async fn unfreeze_subscription(
    State(state): State<AppState>,
    RequireServiceKey: RequireServiceKey,
    Path(key): Path<String>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    debug!(key = %key, "Unfreezing subscription");

    let record = state
        .subscriptions
        .unfreeze(&key)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(SubscriptionResponse::of(&record)))
}

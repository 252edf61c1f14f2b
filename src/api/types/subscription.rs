//! Subscription snapshot DTO shared by the validation and admin endpoints

use serde::Serialize;

use crate::domain::SubscriptionRecord;

/// Wire representation of one subscription record
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionSnapshot {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub plan_type: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    pub is_active: bool,
    pub is_frozen: bool,
    pub frozen_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<String>,
}

impl From<&SubscriptionRecord> for SubscriptionSnapshot {
    fn from(record: &SubscriptionRecord) -> Self {
        let owner = record.owner();

        Self {
            key: record.key().to_string(),
            owner_id: record.owner_id().map(String::from),
            username: owner.and_then(|o| o.username.clone()),
            first_name: owner.and_then(|o| o.first_name.clone()),
            last_name: owner.and_then(|o| o.last_name.clone()),
            plan_type: record.plan_type().to_string(),
            created_at: record.created_at().to_rfc3339(),
            expires_at: record.expires_at().map(|dt| dt.to_rfc3339()),
            is_active: record.is_active(),
            is_frozen: record.is_frozen(),
            frozen_days: record.frozen_days(),
            last_checked_at: record.last_checked_at().map(|dt| dt.to_rfc3339()),
        }
    }
}

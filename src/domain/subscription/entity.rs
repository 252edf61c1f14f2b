//! Subscription record entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_subscription_key, SubscriptionValidationError};

/// Display-only information about the key holder.
///
/// Carried for operator convenience; nothing in the lifecycle reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl OwnerProfile {
    /// True when no display field is set
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.first_name.is_none() && self.last_name.is_none()
    }
}

/// A subscription key record - the sole persisted entity.
///
/// The key string is caller-supplied and immutable after creation, as is
/// `created_at`. `is_active` is the authoritative validity flag: expiration
/// (lazy or eager) only ever clears it, and only an explicit admin toggle
/// sets it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Opaque credential string, globally unique
    key: String,
    /// Identifier of the external principal the key is issued to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner_id: Option<String>,
    /// Optional display fields for the holder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<OwnerProfile>,
    /// Subscription tier tag; opaque exact-match filter field
    plan_type: String,
    /// Creation timestamp, set once
    created_at: DateTime<Utc>,
    /// Expiry timestamp; None means the key never expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    /// Authoritative validity flag
    is_active: bool,
    /// Manual suspension flag, orthogonal to expiry
    is_frozen: bool,
    /// Days accrued while frozen, for manual crediting on unfreeze
    frozen_days: u32,
    /// Last successful validation read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_checked_at: Option<DateTime<Utc>>,
}

impl SubscriptionRecord {
    /// Create a new active, unfrozen record
    pub fn new(
        key: impl Into<String>,
        plan_type: impl Into<String>,
    ) -> Result<Self, SubscriptionValidationError> {
        let key = key.into();
        validate_subscription_key(&key)?;

        Ok(Self {
            key,
            owner_id: None,
            owner: None,
            plan_type: plan_type.into(),
            created_at: Utc::now(),
            expires_at: None,
            is_active: true,
            is_frozen: false,
            frozen_days: 0,
            last_checked_at: None,
        })
    }

    /// Set the owner identifier
    pub fn with_owner_id(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Set the owner display profile
    pub fn with_owner(mut self, owner: OwnerProfile) -> Self {
        if !owner.is_empty() {
            self.owner = Some(owner);
        }
        self
    }

    /// Set an expiry timestamp
    pub fn with_expiration(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    // Getters

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn owner(&self) -> Option<&OwnerProfile> {
        self.owner.as_ref()
    }

    pub fn plan_type(&self) -> &str {
        &self.plan_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_frozen(&self) -> bool {
        self.is_frozen
    }

    pub fn frozen_days(&self) -> u32 {
        self.frozen_days
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        self.last_checked_at
    }

    /// A key with no expiry is permanent and never auto-expires
    pub fn is_permanent(&self) -> bool {
        self.expires_at.is_none()
    }

    // Mutators

    /// Clear the active flag (expiration transition)
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Set the active flag unconditionally (admin override; bypasses expiry)
    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// Flip the active flag, returning the new value
    pub fn toggle_active(&mut self) -> bool {
        self.is_active = !self.is_active;
        self.is_active
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.is_frozen = frozen;
    }

    pub fn set_frozen_days(&mut self, days: u32) {
        self.frozen_days = days;
    }

    pub fn set_expires_at(&mut self, expires_at: Option<DateTime<Utc>>) {
        self.expires_at = expires_at;
    }

    pub fn set_plan_type(&mut self, plan_type: impl Into<String>) {
        self.plan_type = plan_type.into();
    }

    pub fn set_owner_id(&mut self, owner_id: Option<String>) {
        self.owner_id = owner_id;
    }

    pub fn set_owner(&mut self, owner: Option<OwnerProfile>) {
        self.owner = owner.filter(|o| !o.is_empty());
    }

    /// Record a successful validation read
    pub fn mark_checked(&mut self, now: DateTime<Utc>) {
        self.last_checked_at = Some(now);
    }
}

//! Subscription repository trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use super::entity::SubscriptionRecord;
use crate::domain::DomainError;

/// Exact-match filters for listing subscriptions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub owner_id: Option<String>,
    pub is_active: Option<bool>,
    pub plan_type: Option<String>,
}

impl SubscriptionFilter {
    /// True when no filter field is set
    pub fn is_empty(&self) -> bool {
        self.owner_id.is_none() && self.is_active.is_none() && self.plan_type.is_none()
    }

    /// Check a record against every set filter field
    pub fn matches(&self, record: &SubscriptionRecord) -> bool {
        if let Some(owner_id) = &self.owner_id {
            if record.owner_id() != Some(owner_id.as_str()) {
                return false;
            }
        }

        if let Some(is_active) = self.is_active {
            if record.is_active() != is_active {
                return false;
            }
        }

        if let Some(plan_type) = &self.plan_type {
            if record.plan_type() != plan_type {
                return false;
            }
        }

        true
    }
}

/// Mutation applied to one record under the store's exclusive guard
pub type RecordMutation =
    Box<dyn FnOnce(&mut SubscriptionRecord) -> Result<(), DomainError> + Send>;

/// Repository trait for subscription record storage.
///
/// Implementations must serialize conflicting writes to the same record and
/// run [`deactivate_expired`](SubscriptionRepository::deactivate_expired) as
/// one atomic conditional update; the lifecycle engine holds no locks of its
/// own and relies on these guarantees.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync + Debug {
    /// Get a record by exact key match
    async fn get(&self, key: &str) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Insert a new record; fails with Conflict if the key already exists
    async fn insert(
        &self,
        record: SubscriptionRecord,
    ) -> Result<SubscriptionRecord, DomainError>;

    /// Replace an existing record; fails with NotFound if the key is absent
    async fn update(
        &self,
        record: &SubscriptionRecord,
    ) -> Result<SubscriptionRecord, DomainError>;

    /// Apply a mutation to one record as an atomic read-modify-write.
    ///
    /// The closure runs while the record is exclusively held, so the
    /// mutation cannot interleave with any other write to the same key.
    /// `Ok(None)` when the key is absent; when the closure fails the
    /// record is left unchanged. On success returns the record as it was
    /// before the mutation and as persisted after it.
    async fn update_with(
        &self,
        key: &str,
        mutate: RecordMutation,
    ) -> Result<Option<(SubscriptionRecord, SubscriptionRecord)>, DomainError>;

    /// Remove a record; Ok(false) when the key was absent
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// List records matching the filter, newest creation first
    async fn list(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<SubscriptionRecord>, DomainError>;

    /// Count records matching the filter
    async fn count(&self, filter: &SubscriptionFilter) -> Result<usize, DomainError> {
        Ok(self.list(filter).await?.len())
    }

    /// Atomically deactivate every record with `expires_at` earlier than
    /// `now` that is still active; returns the number transitioned.
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, DomainError>;
}

//! Subscription service
//!
//! High-level operations over the record store: per-request key validation
//! with lazy expiration, the admin mutation surface, and the bulk sweep
//! entry point shared by the scheduler and the on-demand cleanup endpoint.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::domain::subscription::lifecycle;
use crate::domain::{
    validate_subscription_key, DomainError, OwnerProfile, SubscriptionFilter, SubscriptionRecord,
    SubscriptionRepository,
};

/// Parameters for issuing a new subscription key
#[derive(Debug, Clone)]
pub struct IssueSubscriptionRequest {
    /// Caller-supplied key string; the service never generates keys
    pub key: String,
    /// Subscription tier tag
    pub plan_type: String,
    /// External principal the key is issued to; may be absent for
    /// admin-issued keys
    pub owner_id: Option<String>,
    /// Optional display profile
    pub owner: Option<OwnerProfile>,
    /// Days until expiry; zero or absent issues a permanent key
    pub duration_days: Option<i64>,
}

/// Subscription service over a record store
#[derive(Debug)]
pub struct SubscriptionService<R>
where
    R: SubscriptionRepository,
{
    repository: Arc<R>,
}

impl<R: SubscriptionRepository> SubscriptionService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Validate a subscription key.
    ///
    /// Runs the expiration rule and the resulting write as one atomic
    /// read-modify-write against the store, so the outcome cannot
    /// interleave with a concurrent sweep or admin update on the same key.
    /// The persisted state is either the lazy deactivation (written before
    /// the Expired error is returned, so a concurrent second check observes
    /// the inactive state) or the `last_checked_at` touch. Every successful
    /// or expired validation leaves exactly one persisted write.
    pub async fn check_key(&self, key: &str) -> Result<SubscriptionRecord, DomainError> {
        if key.is_empty() {
            return Err(DomainError::validation("Subscription key cannot be empty"));
        }

        debug!(key = %key, "Checking subscription key");

        let now = Utc::now();
        let (before, after) = self
            .repository
            .update_with(
                key,
                Box::new(move |record| {
                    if let Some(deactivated) = lifecycle::evaluate(record, now) {
                        *record = deactivated;
                    } else if record.is_active() {
                        record.mark_checked(now);
                    }
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| not_found(key))?;

        // Inactive at read time looks the same as absent
        if !before.is_active() {
            return Err(not_found(key));
        }

        if !after.is_active() {
            info!(key = %key, "Subscription expired on validation read");
            return Err(DomainError::expired(format!(
                "Subscription '{}' has expired",
                key
            )));
        }

        Ok(after)
    }

    /// Issue a new subscription key
    pub async fn issue(
        &self,
        request: IssueSubscriptionRequest,
    ) -> Result<SubscriptionRecord, DomainError> {
        validate_subscription_key(&request.key)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        if request.plan_type.is_empty() {
            return Err(DomainError::validation("Field 'plan_type' is required"));
        }

        info!(key = %request.key, plan = %request.plan_type, "Issuing subscription key");

        let mut record = SubscriptionRecord::new(&request.key, &request.plan_type)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        if let Some(owner_id) = request.owner_id {
            record = record.with_owner_id(owner_id);
        }
        if let Some(owner) = request.owner {
            record = record.with_owner(owner);
        }
        if let Some(days) = request.duration_days {
            if days > 0 {
                let expires_at = Duration::try_days(days)
                    .and_then(|span| Utc::now().checked_add_signed(span))
                    .ok_or_else(|| {
                        DomainError::validation("Field 'duration_days' is out of range")
                    })?;
                record = record.with_expiration(expires_at);
            }
        }

        self.repository.insert(record).await
    }

    /// Get one subscription by key
    pub async fn get(&self, key: &str) -> Result<Option<SubscriptionRecord>, DomainError> {
        self.repository.get(key).await
    }

    /// Permissive field-level update; unknown field names are ignored
    pub async fn update_fields(
        &self,
        key: &str,
        fields: &Map<String, Value>,
    ) -> Result<SubscriptionRecord, DomainError> {
        info!(key = %key, "Updating subscription fields");

        let fields = fields.clone();
        let (_, updated) = self
            .repository
            .update_with(
                key,
                Box::new(move |record| lifecycle::apply_fields(record, &fields)),
            )
            .await?
            .ok_or_else(|| not_found(key))?;

        Ok(updated)
    }

    /// Flip the active flag unconditionally.
    ///
    /// Bypasses expiration: an admin can reactivate an expired key and it
    /// will validate again until the next expiration pass deactivates it.
    pub async fn toggle_active(&self, key: &str) -> Result<SubscriptionRecord, DomainError> {
        let (_, updated) = self
            .repository
            .update_with(
                key,
                Box::new(|record| {
                    record.toggle_active();
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| not_found(key))?;

        info!(key = %key, active = updated.is_active(), "Toggled subscription active flag");
        Ok(updated)
    }

    /// Raise the frozen flag
    pub async fn freeze(&self, key: &str) -> Result<SubscriptionRecord, DomainError> {
        info!(key = %key, "Freezing subscription");

        let (_, updated) = self
            .repository
            .update_with(
                key,
                Box::new(|record| {
                    *record = lifecycle::freeze(record);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| not_found(key))?;

        Ok(updated)
    }

    /// Clear the frozen flag
    pub async fn unfreeze(&self, key: &str) -> Result<SubscriptionRecord, DomainError> {
        info!(key = %key, "Unfreezing subscription");

        let (_, updated) = self
            .repository
            .update_with(
                key,
                Box::new(|record| {
                    *record = lifecycle::unfreeze(record);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| not_found(key))?;

        Ok(updated)
    }

    /// Remove a subscription; fails with NotFound if the key is absent
    pub async fn delete(&self, key: &str) -> Result<(), DomainError> {
        info!(key = %key, "Deleting subscription");

        if !self.repository.delete(key).await? {
            return Err(DomainError::not_found(format!(
                "Subscription '{}' not found",
                key
            )));
        }

        Ok(())
    }

    /// List subscriptions matching the filter, newest first
    pub async fn list(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<SubscriptionRecord>, DomainError> {
        self.repository.list(filter).await
    }

    /// Eagerly deactivate every expired, still-active record in one atomic
    /// bulk update. Shared by the scheduled sweep and the on-demand cleanup
    /// endpoint so the two paths cannot drift.
    pub async fn sweep_expired(&self) -> Result<u64, DomainError> {
        let transitioned = self.repository.deactivate_expired(Utc::now()).await?;

        if transitioned > 0 {
            info!(count = transitioned, "Sweep deactivated expired subscriptions");
        } else {
            debug!("Sweep found no expired subscriptions");
        }

        Ok(transitioned)
    }
}

fn not_found(key: &str) -> DomainError {
    DomainError::not_found(format!("Subscription '{}' not found", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::subscription::InMemorySubscriptionRepository;
    use serde_json::json;

    fn service() -> SubscriptionService<InMemorySubscriptionRepository> {
        SubscriptionService::new(Arc::new(InMemorySubscriptionRepository::new()))
    }

    fn issue_request(key: &str, duration_days: Option<i64>) -> IssueSubscriptionRequest {
        IssueSubscriptionRequest {
            key: key.to_string(),
            plan_type: "premium".to_string(),
            owner_id: Some("42".to_string()),
            owner: None,
            duration_days,
        }
    }

    #[tokio::test]
    async fn test_issue_and_check() {
        let service = service();
        service.issue(issue_request("K1", Some(30))).await.unwrap();

        let checked = service.check_key("K1").await.unwrap();
        assert!(checked.is_active());
        assert!(checked.last_checked_at().is_some());
        assert!(checked.expires_at().is_some());
    }

    #[tokio::test]
    async fn test_issue_zero_duration_is_permanent() {
        let service = service();
        let record = service.issue(issue_request("K1", Some(0))).await.unwrap();

        assert!(record.is_permanent());
        // Immediately valid
        assert!(service.check_key("K1").await.is_ok());
    }

    #[tokio::test]
    async fn test_issue_without_duration_is_permanent() {
        let service = service();
        let record = service.issue(issue_request("K1", None)).await.unwrap();
        assert!(record.is_permanent());
    }

    #[tokio::test]
    async fn test_issue_duplicate_key_conflicts() {
        let service = service();
        service.issue(issue_request("K1", None)).await.unwrap();

        let mut second = issue_request("K1", Some(5));
        second.owner_id = Some("other".to_string());
        let err = service.issue(second).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));

        // Original record unmodified
        let original = service.get("K1").await.unwrap().unwrap();
        assert_eq!(original.owner_id(), Some("42"));
        assert!(original.is_permanent());
    }

    #[tokio::test]
    async fn test_issue_rejects_missing_fields() {
        let service = service();

        let mut request = issue_request("", None);
        assert!(matches!(
            service.issue(request.clone()).await.unwrap_err(),
            DomainError::Validation { .. }
        ));

        request.key = "K1".to_string();
        request.plan_type = String::new();
        assert!(matches!(
            service.issue(request).await.unwrap_err(),
            DomainError::Validation { .. }
        ));
    }

    #[tokio::test]
    async fn test_issue_rejects_out_of_range_duration() {
        let service = service();

        let err = service
            .issue(issue_request("K1", Some(i64::MAX)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        // Nothing was persisted
        assert!(service.get("K1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_check_ghost_key_not_found() {
        let service = service();
        let err = service.check_key("ghost").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_check_empty_key_is_validation_error() {
        let service = service();
        let err = service.check_key("").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_lazy_expiration_persists_before_response() {
        let service = service();
        service.issue(issue_request("K1", None)).await.unwrap();

        // Push the expiry into the past via the permissive update
        let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
        service
            .update_fields("K1", json!({ "expires_at": past }).as_object().unwrap())
            .await
            .unwrap();

        let err = service.check_key("K1").await.unwrap_err();
        assert!(matches!(err, DomainError::Expired { .. }));

        // Deactivation was written back
        let record = service.get("K1").await.unwrap().unwrap();
        assert!(!record.is_active());

        // Subsequent checks consistently miss; the key never reverts to found
        let err = service.check_key("K1").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_lazy_and_eager_expiration_agree() {
        let lazy = service();
        let eager = service();
        let past = (Utc::now() - Duration::hours(1)).to_rfc3339();

        for svc in [&lazy, &eager] {
            svc.issue(issue_request("K1", None)).await.unwrap();
            svc.update_fields("K1", json!({ "expires_at": past }).as_object().unwrap())
                .await
                .unwrap();
        }

        let _ = lazy.check_key("K1").await;
        eager.sweep_expired().await.unwrap();

        let from_lazy = lazy.get("K1").await.unwrap().unwrap();
        let from_eager = eager.get("K1").await.unwrap().unwrap();
        assert!(!from_lazy.is_active());
        assert!(!from_eager.is_active());

        // Applying both transitions in either order is idempotent
        assert_eq!(lazy.sweep_expired().await.unwrap(), 0);
        assert!(matches!(
            eager.check_key("K1").await.unwrap_err(),
            DomainError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_sweep_ignores_permanent_keys() {
        let service = service();
        service.issue(issue_request("K1", None)).await.unwrap();

        for _ in 0..5 {
            assert_eq!(service.sweep_expired().await.unwrap(), 0);
        }

        assert!(service.get("K1").await.unwrap().unwrap().is_active());
    }

    #[tokio::test]
    async fn test_toggle_reactivates_expired_key() {
        let service = service();
        service.issue(issue_request("K1", None)).await.unwrap();
        let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
        service
            .update_fields("K1", json!({ "expires_at": past }).as_object().unwrap())
            .await
            .unwrap();

        service.sweep_expired().await.unwrap();
        assert!(!service.get("K1").await.unwrap().unwrap().is_active());

        // Manual override: toggle back on with expires_at still in the past
        let toggled = service.toggle_active("K1").await.unwrap();
        assert!(toggled.is_active());
        assert!(toggled.expires_at().unwrap() < Utc::now());
    }

    #[tokio::test]
    async fn test_freeze_and_unfreeze() {
        let service = service();
        service.issue(issue_request("K1", Some(30))).await.unwrap();

        let frozen = service.freeze("K1").await.unwrap();
        assert!(frozen.is_frozen());
        assert!(frozen.is_active());

        let thawed = service.unfreeze("K1").await.unwrap();
        assert!(!thawed.is_frozen());
    }

    #[tokio::test]
    async fn test_freeze_does_not_pause_expiry() {
        let service = service();
        service.issue(issue_request("K1", None)).await.unwrap();
        service.freeze("K1").await.unwrap();

        let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
        service
            .update_fields("K1", json!({ "expires_at": past }).as_object().unwrap())
            .await
            .unwrap();

        // Frozen keys still expire; the flag is orthogonal
        assert!(matches!(
            service.check_key("K1").await.unwrap_err(),
            DomainError::Expired { .. }
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_key() {
        let service = service();
        let err = service.delete("ghost").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_existing_key() {
        let service = service();
        service.issue(issue_request("K1", None)).await.unwrap();

        service.delete("K1").await.unwrap();
        assert!(service.get("K1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let service = service();
        service.issue(issue_request("K1", None)).await.unwrap();
        let mut other = issue_request("K2", None);
        other.plan_type = "basic".to_string();
        other.owner_id = Some("7".to_string());
        service.issue(other).await.unwrap();

        let premium = service
            .list(&SubscriptionFilter {
                plan_type: Some("premium".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(premium.len(), 1);
        assert_eq!(premium[0].key(), "K1");
    }

    #[tokio::test]
    async fn test_concurrent_check_does_not_revert_admin_update() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let service = Arc::new(SubscriptionService::new(repo));
        service.issue(issue_request("K1", None)).await.unwrap();

        for round in 0..20 {
            let owner = format!("owner-{round}");

            let check = {
                let svc = Arc::clone(&service);
                tokio::spawn(async move { svc.check_key("K1").await })
            };
            let update = {
                let svc = Arc::clone(&service);
                let owner = owner.clone();
                tokio::spawn(async move {
                    let fields = json!({ "owner_id": owner });
                    svc.update_fields("K1", fields.as_object().unwrap()).await
                })
            };

            check.await.unwrap().unwrap();
            update.await.unwrap().unwrap();

            // The admin write survives the validation write in either order
            let record = service.get("K1").await.unwrap().unwrap();
            assert_eq!(record.owner_id(), Some(owner.as_str()));
        }
    }

    #[tokio::test]
    async fn test_sweep_deactivation_survives_racing_validation() {
        for _ in 0..20 {
            let repo = Arc::new(InMemorySubscriptionRepository::new());
            let service = Arc::new(SubscriptionService::new(repo));
            service.issue(issue_request("K1", None)).await.unwrap();

            let past = (Utc::now() - Duration::milliseconds(1)).to_rfc3339();
            service
                .update_fields("K1", json!({ "expires_at": past }).as_object().unwrap())
                .await
                .unwrap();

            let check = {
                let svc = Arc::clone(&service);
                tokio::spawn(async move { svc.check_key("K1").await })
            };
            let sweep = {
                let svc = Arc::clone(&service);
                tokio::spawn(async move { svc.sweep_expired().await })
            };

            assert!(check.await.unwrap().is_err());
            sweep.await.unwrap().unwrap();

            // Deactivation is monotonic: no write path flips it back
            let record = service.get("K1").await.unwrap().unwrap();
            assert!(!record.is_active());
        }
    }

    #[tokio::test]
    async fn test_sweep_concurrent_with_validation_reads() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let service = Arc::new(SubscriptionService::new(repo));

        // A disjoint set of still-valid keys plus an expired subset
        for i in 0..50 {
            service
                .issue(issue_request(&format!("valid-{i}"), Some(365)))
                .await
                .unwrap();
        }
        let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
        for i in 0..10 {
            let key = format!("expired-{i}");
            service.issue(issue_request(&key, None)).await.unwrap();
            service
                .update_fields(&key, json!({ "expires_at": past }).as_object().unwrap())
                .await
                .unwrap();
        }

        let mut tasks = Vec::new();
        for i in 0..50 {
            let svc = Arc::clone(&service);
            tasks.push(tokio::spawn(async move {
                svc.check_key(&format!("valid-{i}")).await
            }));
        }
        let sweep = {
            let svc = Arc::clone(&service);
            tokio::spawn(async move { svc.sweep_expired().await })
        };

        for result in futures::future::join_all(tasks).await {
            assert!(result.unwrap().is_ok());
        }
        assert_eq!(sweep.await.unwrap().unwrap(), 10);

        // Only the expired subset transitioned; every valid key kept its
        // own read's timestamp and active flag
        for i in 0..50 {
            let record = service.get(&format!("valid-{i}")).await.unwrap().unwrap();
            assert!(record.is_active());
            assert!(record.last_checked_at().is_some());
        }
        for i in 0..10 {
            let record = service.get(&format!("expired-{i}")).await.unwrap().unwrap();
            assert!(!record.is_active());
        }
    }
}

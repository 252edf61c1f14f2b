//! In-memory subscription repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::subscription::lifecycle;
use crate::domain::{
    DomainError, RecordMutation, SubscriptionFilter, SubscriptionRecord, SubscriptionRepository,
};

/// In-memory implementation of SubscriptionRepository.
///
/// Every write takes the map's write guard, so single-record updates are
/// atomic and the bulk expiration in `deactivate_expired` runs as one
/// exclusive section with respect to concurrent per-request writes.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionRepository {
    records: Arc<RwLock<HashMap<String, SubscriptionRecord>>>,
}

impl InMemorySubscriptionRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn get(&self, key: &str) -> Result<Option<SubscriptionRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records.get(key).cloned())
    }

    async fn insert(
        &self,
        record: SubscriptionRecord,
    ) -> Result<SubscriptionRecord, DomainError> {
        let mut records = self.records.write().await;
        let key = record.key().to_string();

        if records.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "Subscription key '{}' already exists",
                key
            )));
        }

        records.insert(key, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        record: &SubscriptionRecord,
    ) -> Result<SubscriptionRecord, DomainError> {
        let mut records = self.records.write().await;
        let key = record.key().to_string();

        if !records.contains_key(&key) {
            return Err(DomainError::not_found(format!(
                "Subscription '{}' not found",
                key
            )));
        }

        records.insert(key, record.clone());
        Ok(record.clone())
    }

    async fn update_with(
        &self,
        key: &str,
        mutate: RecordMutation,
    ) -> Result<Option<(SubscriptionRecord, SubscriptionRecord)>, DomainError> {
        let mut records = self.records.write().await;

        let Some(record) = records.get_mut(key) else {
            return Ok(None);
        };

        let before = record.clone();
        let mut draft = record.clone();
        mutate(&mut draft)?;
        *record = draft.clone();

        Ok(Some((before, draft)))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut records = self.records.write().await;
        Ok(records.remove(key).is_some())
    }

    async fn list(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<SubscriptionRecord>, DomainError> {
        let records = self.records.read().await;

        let mut result: Vec<SubscriptionRecord> = records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        // Newest first; key as a tie-breaker for a stable order
        result.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.key().cmp(b.key()))
        });

        Ok(result)
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        let mut records = self.records.write().await;

        let mut transitioned = 0u64;
        for record in records.values_mut() {
            if let Some(updated) = lifecycle::evaluate(record, now) {
                *record = updated;
                transitioned += 1;
            }
        }

        Ok(transitioned)
    }
}

//! Application state for shared services

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::domain::{DomainError, SubscriptionFilter, SubscriptionRecord, SubscriptionRepository};
use crate::infrastructure::{IssueSubscriptionRequest, SubscriptionService};

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub subscriptions: Arc<dyn SubscriptionServiceTrait>,
    service_key: Arc<str>,
}

impl AppState {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionServiceTrait>,
        service_key: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            subscriptions,
            service_key: service_key.into(),
        }
    }

    /// Check a presented credential against the configured service key.
    ///
    /// An empty configured key matches nothing; the API cannot be left
    /// accidentally open by blanking the credential.
    pub fn verify_service_key(&self, presented: &str) -> bool {
        !self.service_key.is_empty() && *self.service_key == *presented
    }
}

/// Trait for subscription service operations, allowing handlers to use
/// dynamic dispatch over the repository-generic service
#[async_trait::async_trait]
pub trait SubscriptionServiceTrait: Send + Sync {
    async fn check_key(&self, key: &str) -> Result<SubscriptionRecord, DomainError>;
    async fn issue(
        &self,
        request: IssueSubscriptionRequest,
    ) -> Result<SubscriptionRecord, DomainError>;
    async fn get(&self, key: &str) -> Result<Option<SubscriptionRecord>, DomainError>;
    async fn update_fields(
        &self,
        key: &str,
        fields: &Map<String, Value>,
    ) -> Result<SubscriptionRecord, DomainError>;
    async fn toggle_active(&self, key: &str) -> Result<SubscriptionRecord, DomainError>;
    async fn freeze(&self, key: &str) -> Result<SubscriptionRecord, DomainError>;
    async fn unfreeze(&self, key: &str) -> Result<SubscriptionRecord, DomainError>;
    async fn delete(&self, key: &str) -> Result<(), DomainError>;
    async fn list(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<SubscriptionRecord>, DomainError>;
    async fn sweep_expired(&self) -> Result<u64, DomainError>;
}

#[async_trait::async_trait]
impl<R: SubscriptionRepository + 'static> SubscriptionServiceTrait for SubscriptionService<R> {
    async fn check_key(&self, key: &str) -> Result<SubscriptionRecord, DomainError> {
        SubscriptionService::check_key(self, key).await
    }

    async fn issue(
        &self,
        request: IssueSubscriptionRequest,
    ) -> Result<SubscriptionRecord, DomainError> {
        SubscriptionService::issue(self, request).await
    }

    async fn get(&self, key: &str) -> Result<Option<SubscriptionRecord>, DomainError> {
        SubscriptionService::get(self, key).await
    }

    async fn update_fields(
        &self,
        key: &str,
        fields: &Map<String, Value>,
    ) -> Result<SubscriptionRecord, DomainError> {
        SubscriptionService::update_fields(self, key, fields).await
    }

    async fn toggle_active(&self, key: &str) -> Result<SubscriptionRecord, DomainError> {
        SubscriptionService::toggle_active(self, key).await
    }

    async fn freeze(&self, key: &str) -> Result<SubscriptionRecord, DomainError> {
        SubscriptionService::freeze(self, key).await
    }

    async fn unfreeze(&self, key: &str) -> Result<SubscriptionRecord, DomainError> {
        SubscriptionService::unfreeze(self, key).await
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        SubscriptionService::delete(self, key).await
    }

    async fn list(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<SubscriptionRecord>, DomainError> {
        SubscriptionService::list(self, filter).await
    }

    async fn sweep_expired(&self) -> Result<u64, DomainError> {
        SubscriptionService::sweep_expired(self).await
    }
}

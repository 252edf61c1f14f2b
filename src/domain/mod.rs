//! Domain layer - core business logic and entities

pub mod error;
pub mod subscription;

pub use error::DomainError;
pub use subscription::{
    validate_subscription_key, OwnerProfile, RecordMutation, SubscriptionFilter,
    SubscriptionRecord, SubscriptionRepository, SubscriptionValidationError,
};

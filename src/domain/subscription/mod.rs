//! Subscription key domain
//!
//! Domain types and the lifecycle engine for subscription keys: the record
//! entity, pure expiration/freeze decision logic, and the repository trait
//! backing the record store.

mod entity;
pub mod lifecycle;
mod repository;
mod validation;

pub use entity::{OwnerProfile, SubscriptionRecord};
pub use repository::{RecordMutation, SubscriptionFilter, SubscriptionRepository};
pub use validation::{validate_subscription_key, SubscriptionValidationError};

//! Infrastructure layer - storage implementations and background services

pub mod logging;
pub mod subscription;

pub use subscription::{
    InMemorySubscriptionRepository, IssueSubscriptionRequest, SubscriptionService, SweepScheduler,
};

//! Subscription infrastructure: record store implementation, service, and
//! the expiration sweep scheduler

mod in_memory;
pub mod service;
mod sweeper;

pub use in_memory::InMemorySubscriptionRepository;
pub use service::{IssueSubscriptionRequest, SubscriptionService};
pub use sweeper::SweepScheduler;

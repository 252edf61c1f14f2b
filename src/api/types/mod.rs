//! Shared API types

pub mod error;
pub mod json;
pub mod subscription;

pub use error::{ApiError, ApiErrorResponse};
pub use json::Json;
pub use subscription::SubscriptionSnapshot;

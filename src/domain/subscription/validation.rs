//! Subscription key format checks
//!
//! The key string is opaque and caller-supplied; only structural sanity is
//! enforced here, not an alphabet or generation scheme.

use thiserror::Error;

/// Errors that can occur when checking a subscription key string
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionValidationError {
    #[error("Subscription key cannot be empty")]
    EmptyKey,

    #[error("Subscription key exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("Subscription key cannot contain whitespace or control characters")]
    InvalidCharacter,
}

const MAX_KEY_LENGTH: usize = 128;

/// Validate a subscription key string
///
/// Rules:
/// - Cannot be empty
/// - Maximum 128 characters
/// - No whitespace or control characters
pub fn validate_subscription_key(key: &str) -> Result<(), SubscriptionValidationError> {
    if key.is_empty() {
        return Err(SubscriptionValidationError::EmptyKey);
    }

    if key.len() > MAX_KEY_LENGTH {
        return Err(SubscriptionValidationError::TooLong(MAX_KEY_LENGTH));
    }

    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(SubscriptionValidationError::InvalidCharacter);
    }

    Ok(())
}

//! Subscription lifecycle engine
//!
//! Pure decision logic over a single record plus "now". Both the lazy path
//! (per-validation read) and the eager path (bulk sweep) go through
//! [`evaluate`], so the two always agree on the expiration decision given
//! the same inputs.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::entity::SubscriptionRecord;
use crate::domain::DomainError;

/// True iff the record has an expiry and `now` is past it.
///
/// Records without an expiry are permanent and never expire, regardless of
/// the current state of the active flag.
pub fn is_expired(record: &SubscriptionRecord, now: DateTime<Utc>) -> bool {
    match record.expires_at() {
        Some(expires_at) => now > expires_at,
        None => false,
    }
}

/// Apply the expiration transition.
///
/// Returns `Some(deactivated)` iff the record is expired and still active;
/// `None` means no state change is owed. Deactivation is monotonic: nothing
/// in the engine ever sets the flag back, only an explicit admin toggle.
pub fn evaluate(record: &SubscriptionRecord, now: DateTime<Utc>) -> Option<SubscriptionRecord> {
    if record.is_active() && is_expired(record, now) {
        let mut updated = record.clone();
        updated.deactivate();
        Some(updated)
    } else {
        None
    }
}

/// Set the frozen flag.
///
/// Freezing does not stop an expiry clock that is already running and does
/// not touch `is_active` or `expires_at`; it only raises the flag. Any
/// crediting of frozen time happens through an explicit field update.
pub fn freeze(record: &SubscriptionRecord) -> SubscriptionRecord {
    let mut updated = record.clone();
    updated.set_frozen(true);
    updated
}

/// Clear the frozen flag.
///
/// Does not auto-extend `expires_at`; the `frozen_days` counter is left for
/// the caller to apply via an explicit update.
pub fn unfreeze(record: &SubscriptionRecord) -> SubscriptionRecord {
    let mut updated = record.clone();
    updated.set_frozen(false);
    updated
}

/// Permissive field-level update.
///
/// Applies an allow-listed set of mutable fields from a JSON map. Unknown
/// field names are silently ignored (deliberate permissive policy); `key`
/// and `created_at` are immutable and therefore not in the list. A value
/// that cannot coerce to its field's type is a validation error.
pub fn apply_fields(
    record: &mut SubscriptionRecord,
    fields: &Map<String, Value>,
) -> Result<(), DomainError> {
    for (name, value) in fields {
        match name.as_str() {
            "owner_id" => record.set_owner_id(opt_string(name, value)?),
            "username" => {
                let mut owner = record.owner().cloned().unwrap_or_default();
                owner.username = opt_string(name, value)?;
                record.set_owner(Some(owner));
            }
            "first_name" => {
                let mut owner = record.owner().cloned().unwrap_or_default();
                owner.first_name = opt_string(name, value)?;
                record.set_owner(Some(owner));
            }
            "last_name" => {
                let mut owner = record.owner().cloned().unwrap_or_default();
                owner.last_name = opt_string(name, value)?;
                record.set_owner(Some(owner));
            }
            "plan_type" => {
                let plan = opt_string(name, value)?
                    .ok_or_else(|| DomainError::validation("Field 'plan_type' cannot be null"))?;
                record.set_plan_type(plan);
            }
            "expires_at" => record.set_expires_at(opt_datetime(name, value)?),
            "is_active" => record.set_active(boolean(name, value)?),
            "is_frozen" => record.set_frozen(boolean(name, value)?),
            "frozen_days" => record.set_frozen_days(unsigned(name, value)?),
            "last_checked_at" => {
                if let Some(at) = opt_datetime(name, value)? {
                    record.mark_checked(at);
                }
            }
            // Unknown field names fall through untouched
            _ => {}
        }
    }

    Ok(())
}

fn opt_string(name: &str, value: &Value) -> Result<Option<String>, DomainError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(DomainError::validation(format!(
            "Field '{name}' must be a string"
        ))),
    }
}

fn opt_datetime(name: &str, value: &Value) -> Result<Option<DateTime<Utc>>, DomainError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| {
                DomainError::validation(format!("Field '{name}' must be an RFC 3339 timestamp"))
            }),
        _ => Err(DomainError::validation(format!(
            "Field '{name}' must be an RFC 3339 timestamp or null"
        ))),
    }
}

fn boolean(name: &str, value: &Value) -> Result<bool, DomainError> {
    value.as_bool().ok_or_else(|| {
        DomainError::validation(format!("Field '{name}' must be a boolean"))
    })
}

fn unsigned(name: &str, value: &Value) -> Result<u32, DomainError> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| {
            DomainError::validation(format!("Field '{name}' must be a non-negative integer"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn record_with_expiry(offset: Duration) -> SubscriptionRecord {
        SubscriptionRecord::new("K1", "premium")
            .unwrap()
            .with_expiration(Utc::now() + offset)
    }

    #[test]
    fn test_is_expired_past_expiry() {
        let record = record_with_expiry(-Duration::seconds(1));
        assert!(is_expired(&record, Utc::now()));
    }

    #[test]
    fn test_is_expired_future_expiry() {
        let record = record_with_expiry(Duration::hours(1));
        assert!(!is_expired(&record, Utc::now()));
    }

    #[test]
    fn test_is_expired_boundary_is_strict() {
        let record = SubscriptionRecord::new("K1", "premium").unwrap();
        let at = Utc::now();
        let record = record.with_expiration(at);

        // now == expires_at is not yet expired; only now > expires_at is
        assert!(!is_expired(&record, at));
        assert!(is_expired(&record, at + Duration::milliseconds(1)));
    }

    #[test]
    fn test_permanent_key_never_expires() {
        let record = SubscriptionRecord::new("K1", "premium").unwrap();
        assert!(!is_expired(&record, Utc::now() + Duration::days(10_000)));
    }

    #[test]
    fn test_evaluate_deactivates_expired_active() {
        let record = record_with_expiry(-Duration::hours(1));
        let updated = evaluate(&record, Utc::now()).expect("transition owed");

        assert!(!updated.is_active());
        // Source record is untouched
        assert!(record.is_active());
    }

    #[test]
    fn test_evaluate_leaves_valid_record_alone() {
        let record = record_with_expiry(Duration::hours(1));
        assert!(evaluate(&record, Utc::now()).is_none());
    }

    #[test]
    fn test_evaluate_is_idempotent_on_inactive() {
        let mut record = record_with_expiry(-Duration::hours(1));
        record.deactivate();

        // Already transitioned; applying the rule again changes nothing
        assert!(evaluate(&record, Utc::now()).is_none());
    }

    #[test]
    fn test_evaluate_ignores_inactive_permanent() {
        let mut record = SubscriptionRecord::new("K1", "premium").unwrap();
        record.deactivate();

        assert!(evaluate(&record, Utc::now()).is_none());
    }

    #[test]
    fn test_freeze_only_sets_flag() {
        let record = record_with_expiry(Duration::days(7));
        let expires = record.expires_at();

        let frozen = freeze(&record);
        assert!(frozen.is_frozen());
        assert!(frozen.is_active());
        assert_eq!(frozen.expires_at(), expires);
    }

    #[test]
    fn test_unfreeze_does_not_credit_days() {
        let mut record = record_with_expiry(Duration::days(7));
        record.set_frozen(true);
        record.set_frozen_days(3);
        let expires = record.expires_at();

        let thawed = unfreeze(&record);
        assert!(!thawed.is_frozen());
        assert_eq!(thawed.frozen_days(), 3);
        assert_eq!(thawed.expires_at(), expires);
    }

    #[test]
    fn test_apply_fields_known_fields() {
        let mut record = SubscriptionRecord::new("K1", "basic").unwrap();
        let fields = json!({
            "plan_type": "premium",
            "owner_id": "42",
            "username": "alice",
            "frozen_days": 5,
            "is_frozen": true
        });

        apply_fields(&mut record, fields.as_object().unwrap()).unwrap();

        assert_eq!(record.plan_type(), "premium");
        assert_eq!(record.owner_id(), Some("42"));
        assert_eq!(record.owner().unwrap().username.as_deref(), Some("alice"));
        assert_eq!(record.frozen_days(), 5);
        assert!(record.is_frozen());
    }

    #[test]
    fn test_apply_fields_ignores_unknown_names() {
        let mut record = SubscriptionRecord::new("K1", "basic").unwrap();
        let fields = json!({
            "no_such_field": "value",
            "key": "K2",
            "created_at": "2020-01-01T00:00:00Z"
        });

        apply_fields(&mut record, fields.as_object().unwrap()).unwrap();

        // key and created_at are immutable, unknown names are dropped
        assert_eq!(record.key(), "K1");
        assert_eq!(record.plan_type(), "basic");
    }

    #[test]
    fn test_apply_fields_expires_at_roundtrip() {
        let mut record = SubscriptionRecord::new("K1", "basic").unwrap();

        let fields = json!({ "expires_at": "2030-06-01T12:00:00Z" });
        apply_fields(&mut record, fields.as_object().unwrap()).unwrap();
        assert!(record.expires_at().is_some());

        let fields = json!({ "expires_at": null });
        apply_fields(&mut record, fields.as_object().unwrap()).unwrap();
        assert!(record.is_permanent());
    }

    #[test]
    fn test_apply_fields_rejects_bad_types() {
        let mut record = SubscriptionRecord::new("K1", "basic").unwrap();

        let fields = json!({ "is_active": "yes" });
        assert!(apply_fields(&mut record, fields.as_object().unwrap()).is_err());

        let fields = json!({ "frozen_days": -1 });
        assert!(apply_fields(&mut record, fields.as_object().unwrap()).is_err());

        let fields = json!({ "expires_at": "not-a-date" });
        assert!(apply_fields(&mut record, fields.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_apply_fields_toggle_reactivates() {
        let mut record = record_with_expiry(-Duration::hours(1));
        record.deactivate();

        let fields = json!({ "is_active": true });
        apply_fields(&mut record, fields.as_object().unwrap()).unwrap();

        // Admin override: active again even though expires_at is past
        assert!(record.is_active());
        assert!(is_expired(&record, Utc::now()));
    }
}

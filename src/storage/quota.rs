//! Quota state
//!
//! Process-wide storage limit shared by every request.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};

const UNLIMITED: u64 = u64::MAX;

/// Storage limit in bytes; `None` means unlimited
#[derive(Debug)]
pub struct QuotaState {
    limit: AtomicU64,
}

impl QuotaState {
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            limit: AtomicU64::new(encode(limit)),
        }
    }

    pub fn get(&self) -> Option<u64> {
        match self.limit.load(Ordering::Acquire) {
            UNLIMITED => None,
            limit => Some(limit),
        }
    }

    /// Last writer wins
    pub fn set(&self, limit: Option<u64>) {
        self.limit.store(encode(limit), Ordering::Release);
    }
}

impl Default for QuotaState {
    fn default() -> Self {
        Self::new(None)
    }
}

fn encode(limit: Option<u64>) -> u64 {
    // u64::MAX is the unlimited sentinel
    limit.map_or(UNLIMITED, |l| l.min(UNLIMITED - 1))
}

/// Interprets a client-supplied limit.
///
/// Absent, null or negative means unlimited; other numbers (or numeric
/// strings) are floored to whole bytes.
pub fn parse_limit(value: Option<&Value>) -> GatewayResult<Option<u64>> {
    let number = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match number {
        Some(n) if n < 0.0 => Ok(None),
        Some(n) if n.is_finite() => Ok(Some(n.floor() as u64)),
        _ => Err(GatewayError::validation("limit must be a number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quota_state_get_set() {
        let quota = QuotaState::default();
        assert_eq!(quota.get(), None);
        quota.set(Some(100));
        assert_eq!(quota.get(), Some(100));
        quota.set(Some(u64::MAX));
        assert_eq!(quota.get(), Some(u64::MAX - 1));
        quota.set(None);
        assert_eq!(quota.get(), None);
    }

    #[test]
    fn test_parse_limit_unlimited_forms() {
        assert_eq!(parse_limit(None).unwrap(), None);
        assert_eq!(parse_limit(Some(&Value::Null)).unwrap(), None);
        assert_eq!(parse_limit(Some(&json!(-1))).unwrap(), None);
        assert_eq!(parse_limit(Some(&json!("-5"))).unwrap(), None);
    }

    #[test]
    fn test_parse_limit_floors() {
        assert_eq!(parse_limit(Some(&json!(1024))).unwrap(), Some(1024));
        assert_eq!(parse_limit(Some(&json!(99.9))).unwrap(), Some(99));
        assert_eq!(parse_limit(Some(&json!("2048"))).unwrap(), Some(2048));
        assert_eq!(parse_limit(Some(&json!(0))).unwrap(), Some(0));
    }

    #[test]
    fn test_parse_limit_rejects_non_numbers() {
        for value in [json!("lots"), json!(true), json!([1]), json!({"n": 1})] {
            assert!(matches!(
                parse_limit(Some(&value)),
                Err(GatewayError::Validation(_))
            ));
        }
    }
}

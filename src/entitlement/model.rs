//! Entitlement claims and the validity predicate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Access tier. Ordered: `Free < Pro < Enterprise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Pro,
    Enterprise,
}

impl Tier {
    /// Pro and enterprise unlock the same tool set.
    pub fn is_paid(self) -> bool {
        self >= Tier::Pro
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Enterprise => "enterprise",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing status of the subscription behind an entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Deleted,
}

/// A subscriber's access grant as issued by the remote authority.
///
/// Fetched at most once per process and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub subscription_id: String,
    pub org_id: String,
    pub tier: Tier,
    pub seats: u32,
    /// Epoch seconds.
    pub expires_at: i64,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
}

impl Entitlement {
    /// Validity at `now` (epoch seconds).
    ///
    /// Canceled subscriptions stay valid until `expires_at` (grace period).
    pub fn is_valid_at(&self, now: i64) -> bool {
        match self.status {
            SubscriptionStatus::Active | SubscriptionStatus::Trialing => true,
            SubscriptionStatus::PastDue | SubscriptionStatus::Deleted => false,
            SubscriptionStatus::Canceled => self.expires_at > now,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_epoch_secs())
    }

    /// Unknown flags read as disabled.
    pub fn has_feature(&self, key: &str) -> bool {
        self.features.get(key).copied().unwrap_or(false)
    }
}

/// `is_valid` over an optional entitlement; absence is never valid.
pub fn is_valid_at(entitlement: Option<&Entitlement>, now: i64) -> bool {
    entitlement.is_some_and(|e| e.is_valid_at(now))
}

pub fn is_valid(entitlement: Option<&Entitlement>) -> bool {
    is_valid_at(entitlement, now_epoch_secs())
}

pub(crate) fn now_epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

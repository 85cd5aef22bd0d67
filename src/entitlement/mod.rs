//! Entitlement - the caller's access grant, resolved once at startup.
//!
//! Lifecycle: `Uninitialized → Absent | {tier, status}`. No transitions after
//! the first fetch; a refresh policy is left to a longer-lived host.

pub mod model;
pub mod resolver;

pub use model::{is_valid, is_valid_at, Entitlement, SubscriptionStatus, Tier};
pub use resolver::{
    fetch_entitlement, fetch_tier_info, TierInfo, TierLimits, ENTITLEMENT_CONTRACT_VERSION,
    ENTITLEMENT_PATH, TIER_INFO_PATH,
};

//! Tool access control - entitlement-scoped tool permissions.
//!
//! The allow-set is derived once from the resolved entitlement and then only
//! read. Membership is over [`ToolName`], so the set can never name a tool the
//! catalog does not know.

use std::collections::BTreeSet;

use serde::Serialize;

use super::catalog::ToolName;
use crate::client::ApiClient;
use crate::entitlement::{self, model::now_epoch_secs, Entitlement, Tier};

/// Set of operations a session may invoke.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AllowSet(BTreeSet<ToolName>);

impl AllowSet {
    /// Tools available without a paid entitlement.
    pub fn free() -> Self {
        Self::up_to(Tier::Free)
    }

    /// Every known tool.
    pub fn full() -> Self {
        Self(ToolName::ALL.into_iter().collect())
    }

    fn up_to(tier: Tier) -> Self {
        Self(
            ToolName::ALL
                .into_iter()
                .filter(|name| name.required_tier() <= tier)
                .collect(),
        )
    }

    pub fn contains(&self, name: ToolName) -> bool {
        self.0.contains(&name)
    }

    /// Membership by wire name; unknown names are never allowed.
    pub fn contains_name(&self, name: &str) -> bool {
        name.parse::<ToolName>()
            .map(|n| self.contains(n))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = ToolName> + '_ {
        self.0.iter().copied()
    }

    /// Wire names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(ToolName::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Allow-set for `entitlement` at `now` (epoch seconds).
///
/// Absent, free, or invalid entitlements get the free set; valid pro and
/// enterprise entitlements get everything.
pub fn resolve_allowed_tools_at(entitlement: Option<&Entitlement>, now: i64) -> AllowSet {
    match entitlement {
        Some(e) if e.tier.is_paid() && e.is_valid_at(now) => AllowSet::full(),
        _ => AllowSet::free(),
    }
}

pub fn resolve_allowed_tools(entitlement: Option<&Entitlement>) -> AllowSet {
    resolve_allowed_tools_at(entitlement, now_epoch_secs())
}

/// Write-once session grant: the entitlement plus the allow-set derived from it.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    entitlement: Option<Entitlement>,
    allowed: AllowSet,
}

impl AccessGrant {
    pub fn new(entitlement: Option<Entitlement>) -> Self {
        let allowed = resolve_allowed_tools(entitlement.as_ref());
        Self {
            entitlement,
            allowed,
        }
    }

    /// Grant for a session with no entitlement.
    pub fn free() -> Self {
        Self::new(None)
    }

    /// Fetch the entitlement once and derive the grant. Never fails.
    pub async fn establish(client: &ApiClient) -> Self {
        let grant = Self::new(entitlement::fetch_entitlement(client).await);
        tracing::info!(
            tier = %grant.effective_tier(),
            tools = ?grant.allowed.names(),
            "tool access resolved"
        );
        grant
    }

    pub fn entitlement(&self) -> Option<&Entitlement> {
        self.entitlement.as_ref()
    }

    pub fn allowed(&self) -> &AllowSet {
        &self.allowed
    }

    /// Tier the session actually operates at.
    pub fn effective_tier(&self) -> Tier {
        match &self.entitlement {
            Some(e) if self.allowed.len() == ToolName::ALL.len() => e.tier,
            _ => Tier::Free,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::SubscriptionStatus;
    use std::collections::BTreeMap;

    const DAY: i64 = 86_400;
    const NOW: i64 = 1_750_000_000;

    fn entitlement(tier: Tier, status: SubscriptionStatus, expires_at: i64) -> Entitlement {
        Entitlement {
            subscription_id: "sub_1".to_string(),
            org_id: "org_1".to_string(),
            tier,
            seats: 1,
            expires_at,
            status,
            features: BTreeMap::new(),
        }
    }

    #[test]
    fn test_absent_gets_free_set() {
        let allowed = resolve_allowed_tools(None);
        assert_eq!(
            allowed.names(),
            vec![
                "mahakalp_sf_constraints",
                "mahakalp_sf_doc_search",
                "mahakalp_sf_releases"
            ]
        );
    }

    #[test]
    fn test_pro_in_grace_period_gets_full_set() {
        let e = entitlement(Tier::Pro, SubscriptionStatus::Canceled, NOW + DAY);
        assert_eq!(resolve_allowed_tools_at(Some(&e), NOW), AllowSet::full());
        assert_eq!(AllowSet::full().len(), 6);
    }

    #[test]
    fn test_pro_after_grace_period_gets_free_set() {
        let e = entitlement(Tier::Pro, SubscriptionStatus::Canceled, NOW - DAY);
        assert_eq!(resolve_allowed_tools_at(Some(&e), NOW), AllowSet::free());
    }

    #[test]
    fn test_enterprise_matches_pro() {
        let pro = entitlement(Tier::Pro, SubscriptionStatus::Active, 0);
        let enterprise = entitlement(Tier::Enterprise, SubscriptionStatus::Trialing, 0);
        assert_eq!(
            resolve_allowed_tools_at(Some(&pro), NOW),
            resolve_allowed_tools_at(Some(&enterprise), NOW)
        );
    }

    #[test]
    fn test_free_tier_stays_free_even_when_active() {
        let e = entitlement(Tier::Free, SubscriptionStatus::Active, NOW + DAY);
        assert_eq!(resolve_allowed_tools_at(Some(&e), NOW), AllowSet::free());
    }

    #[test]
    fn test_contains_name() {
        let free = AllowSet::free();
        assert!(free.contains_name("mahakalp_sf_doc_search"));
        assert!(!free.contains_name("mahakalp_sf_rules"));
        assert!(!free.contains_name("rm_rf"));
    }

    #[test]
    fn test_grant_effective_tier() {
        assert_eq!(AccessGrant::free().effective_tier(), Tier::Free);

        let lapsed = entitlement(Tier::Enterprise, SubscriptionStatus::PastDue, 0);
        let grant = AccessGrant::new(Some(lapsed));
        assert_eq!(grant.effective_tier(), Tier::Free);
        assert_eq!(grant.allowed(), &AllowSet::free());
        assert!(grant.entitlement().is_some());

        let active = entitlement(Tier::Enterprise, SubscriptionStatus::Active, 0);
        assert_eq!(AccessGrant::new(Some(active)).effective_tier(), Tier::Enterprise);
    }

    #[test]
    fn test_allow_set_serializes_as_names() {
        let value = serde_json::to_value(AllowSet::free()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                "mahakalp_sf_constraints",
                "mahakalp_sf_doc_search",
                "mahakalp_sf_releases"
            ])
        );
    }
}

//! Property tests for entitlement validity and tool access.

use std::collections::BTreeMap;

use proptest::prelude::*;

use mahakalp_mcp::entitlement::{is_valid_at, Entitlement, SubscriptionStatus, Tier};
use mahakalp_mcp::tools::{resolve_allowed_tools_at, AllowSet, ToolName};

fn tier() -> impl Strategy<Value = Tier> {
    prop_oneof![Just(Tier::Free), Just(Tier::Pro), Just(Tier::Enterprise)]
}

fn status() -> impl Strategy<Value = SubscriptionStatus> {
    prop_oneof![
        Just(SubscriptionStatus::Active),
        Just(SubscriptionStatus::Trialing),
        Just(SubscriptionStatus::PastDue),
        Just(SubscriptionStatus::Canceled),
        Just(SubscriptionStatus::Deleted),
    ]
}

/// Entitlement with `expires_at` anywhere within ~30 years of `now`.
fn entitlement_near(now: i64) -> impl Strategy<Value = Entitlement> {
    (tier(), status(), -1_000_000_000i64..1_000_000_000i64, 1u32..500).prop_map(
        move |(tier, status, offset, seats)| Entitlement {
            subscription_id: "sub_prop".to_string(),
            org_id: "org_prop".to_string(),
            tier,
            seats,
            expires_at: now + offset,
            status,
            features: BTreeMap::new(),
        },
    )
}

const NOW: i64 = 1_760_000_000;

proptest! {
    #[test]
    fn prop_validity_truth_table(e in entitlement_near(NOW)) {
        let expected = match e.status {
            SubscriptionStatus::Active | SubscriptionStatus::Trialing => true,
            SubscriptionStatus::Canceled => e.expires_at > NOW,
            SubscriptionStatus::PastDue | SubscriptionStatus::Deleted => false,
        };
        prop_assert_eq!(is_valid_at(Some(&e), NOW), expected);
    }

    #[test]
    fn prop_allow_set_is_free_or_full(e in proptest::option::of(entitlement_near(NOW))) {
        let allowed = resolve_allowed_tools_at(e.as_ref(), NOW);
        let paid_and_valid = e
            .as_ref()
            .is_some_and(|e| e.tier.is_paid() && e.is_valid_at(NOW));

        if paid_and_valid {
            prop_assert_eq!(allowed.len(), 6);
            prop_assert_eq!(&allowed, &AllowSet::full());
        } else {
            prop_assert_eq!(allowed.len(), 3);
            prop_assert_eq!(&allowed, &AllowSet::free());
        }
    }

    #[test]
    fn prop_resolution_is_idempotent(e in proptest::option::of(entitlement_near(NOW))) {
        let first = resolve_allowed_tools_at(e.as_ref(), NOW);
        let second = resolve_allowed_tools_at(e.as_ref(), NOW);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_allow_set_only_names_known_tools(e in proptest::option::of(entitlement_near(NOW))) {
        let allowed = resolve_allowed_tools_at(e.as_ref(), NOW);
        for name in allowed.names() {
            prop_assert!(name.parse::<ToolName>().is_ok());
        }
    }

    #[test]
    fn prop_free_tools_always_allowed(e in proptest::option::of(entitlement_near(NOW))) {
        let allowed = resolve_allowed_tools_at(e.as_ref(), NOW);
        for tool in AllowSet::free().iter() {
            prop_assert!(allowed.contains(tool));
        }
    }
}

#[test]
fn test_absent_entitlement_is_never_valid() {
    assert!(!is_valid_at(None, NOW));
    assert!(!is_valid_at(None, 0));
}

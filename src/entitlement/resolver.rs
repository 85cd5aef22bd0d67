//! Entitlement resolution against the remote authority.
//!
//! Resolution is fail-open: every failure degrades to "no entitlement", which
//! the access policy treats as free tier, so the bridge stays usable offline
//! or while the billing backend is down.

use serde::{Deserialize, Serialize};

use super::model::{Entitlement, Tier};
use crate::client::{ApiClient, ApiRequest};
use crate::types::Result;

/// Canonical entitlement endpoint, claims shape `{entitlement: {...}}`.
pub const ENTITLEMENT_PATH: &str = "/api/auth/entitlement";

/// Version of the entitlement wire contract this client speaks.
pub const ENTITLEMENT_CONTRACT_VERSION: u32 = 2;

/// Legacy tier-list endpoint. Read for diagnostics only, never for gating.
pub const TIER_INFO_PATH: &str = "/api/auth/tier";

#[derive(Debug, Deserialize)]
struct EntitlementEnvelope {
    #[serde(default)]
    entitlement: Option<Entitlement>,
}

/// Fetch the caller's entitlement. Never fails; absence is the fallback.
///
/// Issues exactly one request, without retries.
pub async fn fetch_entitlement(client: &ApiClient) -> Option<Entitlement> {
    match client
        .request_once::<EntitlementEnvelope>(ApiRequest::get(ENTITLEMENT_PATH))
        .await
    {
        Ok(EntitlementEnvelope {
            entitlement: Some(entitlement),
        }) => {
            tracing::info!(
                tier = %entitlement.tier,
                status = ?entitlement.status,
                org_id = %entitlement.org_id,
                contract = ENTITLEMENT_CONTRACT_VERSION,
                "entitlement resolved"
            );
            Some(entitlement)
        }
        Ok(EntitlementEnvelope { entitlement: None }) => {
            tracing::warn!("entitlement response carried no entitlement; using free tier");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "entitlement unavailable; using free tier");
            None
        }
    }
}

/// Request limits reported by the tier endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    #[serde(default)]
    pub requests_per_day: Option<u64>,
}

/// Account summary from `GET /api/auth/tier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierInfo {
    pub tier: Tier,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub limits: TierLimits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Diagnostic account summary. Unlike [`fetch_entitlement`] this reports
/// failures to the caller.
pub async fn fetch_tier_info(client: &ApiClient) -> Result<TierInfo> {
    client.request_once(ApiRequest::get(TIER_INFO_PATH)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::MockTransport;
    use crate::client::RetryPolicy;
    use crate::entitlement::SubscriptionStatus;
    use crate::types::Error;
    use bytes::Bytes;
    use std::sync::Arc;

    fn client_returning(
        result: impl Fn() -> Result<Bytes> + Send + Sync + 'static,
    ) -> ApiClient {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|request| request.path == ENTITLEMENT_PATH)
            .times(1)
            .returning(move |_| result());
        ApiClient::with_transport(Arc::new(transport), RetryPolicy::default())
    }

    #[tokio::test]
    async fn test_fetch_valid_entitlement() {
        let client = client_returning(|| {
            Ok(Bytes::from_static(
                br#"{"entitlement":{"subscription_id":"sub_1","org_id":"org_1","tier":"pro","seats":3,"expires_at":1900000000,"status":"active","features":{}}}"#,
            ))
        });

        let entitlement = fetch_entitlement(&client).await.unwrap();
        assert_eq!(entitlement.tier, Tier::Pro);
        assert_eq!(entitlement.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn test_network_failure_is_absent_without_retry() {
        let client = client_returning(|| Err(Error::transient("connection refused")));
        assert!(fetch_entitlement(&client).await.is_none());
    }

    #[tokio::test]
    async fn test_api_error_is_absent() {
        let client = client_returning(|| Err(Error::api(401, "bad key")));
        assert!(fetch_entitlement(&client).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_payload_is_absent() {
        let client = client_returning(|| Ok(Bytes::from_static(br#"{"ok":true}"#)));
        assert!(fetch_entitlement(&client).await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_absent() {
        let client = client_returning(|| {
            Ok(Bytes::from_static(br#"{"entitlement":{"tier":"platinum"}}"#))
        });
        assert!(fetch_entitlement(&client).await.is_none());
    }

    #[tokio::test]
    async fn test_tier_info_parses_and_reports_errors() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|request| request.path == TIER_INFO_PATH)
            .times(1)
            .returning(|_| {
                Ok(Bytes::from_static(
                    br#"{"tier":"free","tools":["mahakalp_sf_constraints"],"limits":{"requests_per_day":100},"warning":"key expires soon"}"#,
                ))
            });
        let client = ApiClient::with_transport(Arc::new(transport), RetryPolicy::none());

        let info = fetch_tier_info(&client).await.unwrap();
        assert_eq!(info.tier, Tier::Free);
        assert_eq!(info.limits.requests_per_day, Some(100));
        assert_eq!(info.warning.as_deref(), Some("key expires soon"));
        assert!(info.key_prefix.is_none());
    }
}

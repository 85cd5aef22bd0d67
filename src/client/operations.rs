//! Operation facade - one typed method per knowledge query.
//!
//! Read operations encode their filters as a query string, search operations
//! as a JSON body. Fields the caller leaves unset are omitted from the wire
//! entirely. Responses are pass-through envelopes; payload items stay opaque.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::transport::ApiRequest;
use super::ApiClient;
use crate::types::Result;

pub const CONSTRAINTS_PATH: &str = "/api/public/ecosystem/constraints";
pub const DOC_SEARCH_PATH: &str = "/api/public/ecosystem/docs/search";
pub const RELEASES_PATH: &str = "/api/public/ecosystem/releases";
pub const RULES_PATH: &str = "/api/public/ecosystem/rules/query";
pub const PATTERNS_PATH: &str = "/api/public/ecosystem/patterns/search";
pub const DECISION_GUIDES_PATH: &str = "/api/public/ecosystem/decision-guides/search";

/// Default `max_results` per search operation when the caller omits it.
pub const DOC_SEARCH_DEFAULT_MAX: u32 = 5;
pub const RULES_DEFAULT_MAX: u32 = 10;
pub const PATTERNS_DEFAULT_MAX: u32 = 5;
pub const DECISION_GUIDES_DEFAULT_MAX: u32 = 5;

// =============================================================================
// Wire builders
// =============================================================================

/// Ordered query-string pairs, skipping unset values.
#[derive(Debug, Default)]
struct QueryPairs(Vec<(&'static str, String)>);

impl QueryPairs {
    fn opt(mut self, key: &'static str, value: Option<impl ToString>) -> Self {
        if let Some(v) = value {
            self.0.push((key, v.to_string()));
        }
        self
    }

    fn csv(mut self, key: &'static str, values: Option<&[String]>) -> Self {
        if let Some(values) = values.filter(|v| !v.is_empty()) {
            self.0.push((key, values.join(",")));
        }
        self
    }

    fn finish(self) -> Vec<(&'static str, String)> {
        self.0
    }
}

/// JSON object body, skipping unset values.
#[derive(Debug, Default)]
struct JsonBody(Map<String, Value>);

impl JsonBody {
    fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    fn opt(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.field(key, v),
            None => self,
        }
    }

    fn finish(self) -> Value {
        Value::Object(self.0)
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Governor limits and platform constraints for a release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintsParams {
    pub release_id: Option<String>,
    pub constraint_type: Option<String>,
    pub constraint_ids: Option<Vec<String>>,
    pub context: Option<String>,
    pub max_results: Option<u32>,
}

impl ConstraintsParams {
    pub fn to_request(&self) -> ApiRequest {
        let query = QueryPairs::default()
            .opt("release_id", self.release_id.as_deref())
            .opt("constraint_type", self.constraint_type.as_deref())
            .csv("constraint_ids", self.constraint_ids.as_deref())
            .opt("context", self.context.as_deref())
            .opt("max_results", self.max_results)
            .finish();
        ApiRequest::get(CONSTRAINTS_PATH).with_query(query)
    }
}

/// Full-text documentation search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocSearchParams {
    pub query: String,
    pub release_id: Option<String>,
    pub topics: Option<Vec<String>>,
    pub max_results: Option<u32>,
}

impl DocSearchParams {
    pub fn to_request(&self) -> ApiRequest {
        let body = JsonBody::default()
            .field("query", self.query.as_str())
            .opt("release_id", self.release_id.as_deref())
            .opt("topics", self.topics.clone())
            .field(
                "max_results",
                self.max_results.unwrap_or(DOC_SEARCH_DEFAULT_MAX),
            )
            .finish();
        ApiRequest::post(DOC_SEARCH_PATH, body)
    }
}

/// Release metadata lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasesParams {
    pub release_id: Option<String>,
    pub include_archived: Option<bool>,
    pub list_all: Option<bool>,
}

impl ReleasesParams {
    pub fn to_request(&self) -> ApiRequest {
        let query = QueryPairs::default()
            .opt("release_id", self.release_id.as_deref())
            .opt("include_archived", self.include_archived)
            .opt("list_all", self.list_all)
            .finish();
        ApiRequest::get(RELEASES_PATH).with_query(query)
    }
}

/// Best-practice rule query (pro tier).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesParams {
    pub query: String,
    pub category: Option<String>,
    pub severity: Option<String>,
    pub context: Option<String>,
    pub max_results: Option<u32>,
}

impl RulesParams {
    pub fn to_request(&self) -> ApiRequest {
        let body = JsonBody::default()
            .field("query", self.query.as_str())
            .opt("category", self.category.as_deref())
            .opt("severity", self.severity.as_deref())
            .opt("context", self.context.as_deref())
            .field("max_results", self.max_results.unwrap_or(RULES_DEFAULT_MAX))
            .finish();
        ApiRequest::post(RULES_PATH, body)
    }
}

/// Search shared by the pattern and decision-guide endpoints (pro tier).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceSearchParams {
    pub query: String,
    pub category: Option<String>,
    pub context: Option<String>,
    pub max_results: Option<u32>,
}

impl GuidanceSearchParams {
    fn to_request(&self, path: &'static str, default_max: u32) -> ApiRequest {
        let body = JsonBody::default()
            .field("query", self.query.as_str())
            .opt("category", self.category.as_deref())
            .opt("context", self.context.as_deref())
            .field("max_results", self.max_results.unwrap_or(default_max))
            .finish();
        ApiRequest::post(path, body)
    }

    pub fn to_patterns_request(&self) -> ApiRequest {
        self.to_request(PATTERNS_PATH, PATTERNS_DEFAULT_MAX)
    }

    pub fn to_decision_guides_request(&self) -> ApiRequest {
        self.to_request(DECISION_GUIDES_PATH, DECISION_GUIDES_DEFAULT_MAX)
    }
}

pub type PatternsParams = GuidanceSearchParams;
pub type DecisionGuidesParams = GuidanceSearchParams;

// =============================================================================
// Responses
// =============================================================================

/// Defines a result envelope: `{success, error?, <payload>[], count, ...}`.
///
/// Unknown fields are kept in `extra` so nothing the server sends is dropped
/// on the way back to the caller.
macro_rules! define_envelope {
    ($(#[$meta:meta])* $name:ident, $payload:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub success: bool,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub error: Option<String>,
            #[serde(default)]
            pub $payload: Vec<Value>,
            #[serde(default)]
            pub count: u64,
            #[serde(flatten)]
            pub extra: Map<String, Value>,
        }
    };
}

define_envelope!(
    /// Constraints lookup result.
    ConstraintsResponse,
    constraints
);
define_envelope!(
    /// Documentation search result.
    DocSearchResponse,
    results
);
define_envelope!(
    /// Releases lookup result.
    ReleasesResponse,
    releases
);
define_envelope!(
    /// Rule query result.
    RulesResponse,
    rules
);
define_envelope!(
    /// Pattern search result.
    PatternsResponse,
    patterns
);
define_envelope!(
    /// Decision-guide search result.
    DecisionGuidesResponse,
    guides
);

// =============================================================================
// Facade
// =============================================================================

impl ApiClient {
    pub async fn get_constraints(&self, params: &ConstraintsParams) -> Result<ConstraintsResponse> {
        self.request(params.to_request()).await
    }

    pub async fn search_docs(&self, params: &DocSearchParams) -> Result<DocSearchResponse> {
        self.request(params.to_request()).await
    }

    pub async fn get_releases(&self, params: &ReleasesParams) -> Result<ReleasesResponse> {
        self.request(params.to_request()).await
    }

    pub async fn query_rules(&self, params: &RulesParams) -> Result<RulesResponse> {
        self.request(params.to_request()).await
    }

    pub async fn search_patterns(&self, params: &PatternsParams) -> Result<PatternsResponse> {
        self.request(params.to_patterns_request()).await
    }

    pub async fn search_decision_guides(
        &self,
        params: &DecisionGuidesParams,
    ) -> Result<DecisionGuidesResponse> {
        self.request(params.to_decision_guides_request()).await
    }
}

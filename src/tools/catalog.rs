//! Tool catalog - typed metadata, parameter validation, input schemas.
//!
//! Owns tool *metadata* only. Implementations live behind the dispatcher's
//! handler table; the catalog is what `tools/list` advertises and what
//! incoming arguments are checked against before any network call.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::entitlement::Tier;
use crate::types::Error;

// =============================================================================
// Tool names
// =============================================================================

/// The closed set of knowledge operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolName {
    Constraints,
    DocSearch,
    Releases,
    Rules,
    Patterns,
    DecisionGuides,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::Constraints,
        ToolName::DocSearch,
        ToolName::Releases,
        ToolName::Rules,
        ToolName::Patterns,
        ToolName::DecisionGuides,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::Constraints => "mahakalp_sf_constraints",
            ToolName::DocSearch => "mahakalp_sf_doc_search",
            ToolName::Releases => "mahakalp_sf_releases",
            ToolName::Rules => "mahakalp_sf_rules",
            ToolName::Patterns => "mahakalp_sf_patterns",
            ToolName::DecisionGuides => "mahakalp_sf_decision_guides",
        }
    }

    /// Lowest tier that unlocks this tool.
    pub fn required_tier(self) -> Tier {
        match self {
            ToolName::Constraints | ToolName::DocSearch | ToolName::Releases => Tier::Free,
            ToolName::Rules | ToolName::Patterns | ToolName::DecisionGuides => Tier::Pro,
        }
    }
}

impl Serialize for ToolName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::not_found(format!("Unknown tool: {}", s)))
    }
}

// =============================================================================
// Parameter types
// =============================================================================

/// Parameter type for tool inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Int,
    Bool,
    StringList,
    Enum(&'static [&'static str]),
}

/// Bounds for [`ParamType::Int`]; counts are carried as `u32` on the wire.
const INT_MIN: u64 = 1;
const INT_MAX: u64 = u32::MAX as u64;

impl ParamType {
    /// Validate a JSON value against this parameter type.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match self {
            ParamType::String => {
                if value.is_string() {
                    Ok(())
                } else {
                    Err(format!("expected string, got {}", value_type_name(value)))
                }
            }
            ParamType::Int => match value.as_u64() {
                Some(n) if (INT_MIN..=INT_MAX).contains(&n) => Ok(()),
                Some(n) => Err(format!(
                    "expected integer between {} and {}, got {}",
                    INT_MIN, INT_MAX, n
                )),
                None => Err(format!(
                    "expected positive integer, got {}",
                    value_type_name(value)
                )),
            },
            ParamType::Bool => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(format!("expected boolean, got {}", value_type_name(value)))
                }
            }
            ParamType::StringList => {
                if let Some(arr) = value.as_array() {
                    for (i, item) in arr.iter().enumerate() {
                        if !item.is_string() {
                            return Err(format!(
                                "expected string at index {}, got {}",
                                i,
                                value_type_name(item)
                            ));
                        }
                    }
                    Ok(())
                } else {
                    Err(format!("expected array, got {}", value_type_name(value)))
                }
            }
            ParamType::Enum(variants) => match value.as_str() {
                Some(s) if variants.contains(&s) => Ok(()),
                Some(s) => Err(format!(
                    "invalid enum value '{}', expected one of: {}",
                    s,
                    variants.join(", ")
                )),
                None => Err(format!(
                    "expected string for enum, got {}",
                    value_type_name(value)
                )),
            },
        }
    }

    /// JSON Schema fragment for this type.
    pub fn json_schema(&self) -> Value {
        match self {
            ParamType::String => json!({"type": "string"}),
            ParamType::Int => json!({"type": "integer", "minimum": INT_MIN, "maximum": INT_MAX}),
            ParamType::Bool => json!({"type": "boolean"}),
            ParamType::StringList => json!({"type": "array", "items": {"type": "string"}}),
            ParamType::Enum(variants) => json!({"type": "string", "enum": variants}),
        }
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Parameter definition
// =============================================================================

/// A single parameter definition for a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ParamDef {
    pub name: &'static str,
    pub param_type: ParamType,
    pub description: &'static str,
    pub required: bool,
}

impl ParamDef {
    const fn optional(name: &'static str, param_type: ParamType, description: &'static str) -> Self {
        Self {
            name,
            param_type,
            description,
            required: false,
        }
    }

    const fn required(name: &'static str, param_type: ParamType, description: &'static str) -> Self {
        Self {
            name,
            param_type,
            description,
            required: true,
        }
    }
}

// =============================================================================
// Tool entry
// =============================================================================

/// Complete tool metadata entry.
#[derive(Debug, Clone, Serialize)]
pub struct ToolEntry {
    pub name: ToolName,
    pub description: &'static str,
    pub parameters: Vec<ParamDef>,
}

impl ToolEntry {
    /// JSON Schema object describing the tool's arguments.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut schema = param.param_type.json_schema();
            if let Some(obj) = schema.as_object_mut() {
                obj.insert("description".to_string(), json!(param.description));
            }
            properties.insert(param.name.to_string(), schema);
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Listing shape used by `tools/list`.
    pub fn to_listing(&self) -> Value {
        json!({
            "name": self.name.as_str(),
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }
}

// =============================================================================
// Tool catalog
// =============================================================================

const RELEASE_ID: &str = "Salesforce release identifier, e.g. \"spring-26\"";
const CONTEXT: &str = "Free-text description of what you are building";
const MAX_RESULTS: &str = "Maximum number of results to return";
const CATEGORY: &str = "Restrict results to a category";
const SEVERITIES: &[&str] = &["critical", "high", "medium", "low"];

/// Static tool catalog, in advertisement order.
#[derive(Debug)]
pub struct ToolCatalog {
    entries: Vec<ToolEntry>,
}

impl ToolCatalog {
    /// The six knowledge operations.
    pub fn standard() -> Self {
        use ParamType::{Bool, Int, StringList};

        let entries = vec![
            ToolEntry {
                name: ToolName::Constraints,
                description: "Look up Salesforce governor limits and platform constraints for a release.",
                parameters: vec![
                    ParamDef::optional("release_id", ParamType::String, RELEASE_ID),
                    ParamDef::optional(
                        "constraint_type",
                        ParamType::String,
                        "Constraint family, e.g. \"governor_limit\"",
                    ),
                    ParamDef::optional("constraint_ids", StringList, "Specific constraint identifiers"),
                    ParamDef::optional("context", ParamType::String, CONTEXT),
                    ParamDef::optional("max_results", Int, MAX_RESULTS),
                ],
            },
            ToolEntry {
                name: ToolName::DocSearch,
                description: "Search Salesforce platform documentation.",
                parameters: vec![
                    ParamDef::required("query", ParamType::String, "Search query"),
                    ParamDef::optional("release_id", ParamType::String, RELEASE_ID),
                    ParamDef::optional("topics", StringList, "Restrict the search to these topics"),
                    ParamDef::optional("max_results", Int, MAX_RESULTS),
                ],
            },
            ToolEntry {
                name: ToolName::Releases,
                description: "Get Salesforce release metadata: current release, dates and API versions.",
                parameters: vec![
                    ParamDef::optional("release_id", ParamType::String, RELEASE_ID),
                    ParamDef::optional("include_archived", Bool, "Include archived releases"),
                    ParamDef::optional("list_all", Bool, "List every known release"),
                ],
            },
            ToolEntry {
                name: ToolName::Rules,
                description: "Query Salesforce development rules and best practices.",
                parameters: vec![
                    ParamDef::required("query", ParamType::String, "What the rule should cover"),
                    ParamDef::optional("category", ParamType::String, CATEGORY),
                    ParamDef::optional("severity", ParamType::Enum(SEVERITIES), "Minimum rule severity"),
                    ParamDef::optional("context", ParamType::String, CONTEXT),
                    ParamDef::optional("max_results", Int, MAX_RESULTS),
                ],
            },
            ToolEntry {
                name: ToolName::Patterns,
                description: "Search proven Salesforce implementation patterns.",
                parameters: vec![
                    ParamDef::required("query", ParamType::String, "Problem the pattern should solve"),
                    ParamDef::optional("category", ParamType::String, CATEGORY),
                    ParamDef::optional("context", ParamType::String, CONTEXT),
                    ParamDef::optional("max_results", Int, MAX_RESULTS),
                ],
            },
            ToolEntry {
                name: ToolName::DecisionGuides,
                description: "Search Salesforce architecture decision guides.",
                parameters: vec![
                    ParamDef::required("query", ParamType::String, "Decision you are facing"),
                    ParamDef::optional("category", ParamType::String, CATEGORY),
                    ParamDef::optional("context", ParamType::String, CONTEXT),
                    ParamDef::optional("max_results", Int, MAX_RESULTS),
                ],
            },
        ];

        Self { entries }
    }

    /// Get a tool entry by name.
    pub fn get(&self, name: ToolName) -> Option<&ToolEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Entries whose name passes `allowed`.
    pub fn list_allowed<F>(&self, allowed: F) -> Vec<&ToolEntry>
    where
        F: Fn(ToolName) -> bool,
    {
        self.entries.iter().filter(|e| allowed(e.name)).collect()
    }

    /// Validate arguments against a tool's parameter definitions.
    ///
    /// Returns a list of validation errors (empty = valid). `null` values are
    /// treated as absent; a blank required string counts as missing.
    pub fn validate_params(&self, name: ToolName, params: &Value) -> Vec<String> {
        let Some(entry) = self.get(name) else {
            return vec![format!("Unknown tool: {}", name)];
        };

        let empty = Map::new();
        let param_map = match params {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => {
                return vec![format!(
                    "arguments must be an object, got {}",
                    value_type_name(other)
                )]
            }
        };

        let mut errors = Vec::new();

        for param_def in entry.parameters.iter().filter(|p| p.required) {
            let present = match param_map.get(param_def.name) {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) => !s.trim().is_empty(),
                Some(_) => true,
            };
            if !present {
                errors.push(format!("{} is required", param_def.name));
            }
        }

        for (key, value) in param_map {
            if value.is_null() {
                continue;
            }
            match entry.parameters.iter().find(|p| p.name == key.as_str()) {
                Some(param_def) => {
                    if let Err(e) = param_def.param_type.validate(value) {
                        errors.push(format!("Parameter '{}': {}", key, e));
                    }
                }
                None => errors.push(format!("Unknown parameter: {}", key)),
            }
        }

        errors
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

// =============================================================================
// Tests
// =============================================================================

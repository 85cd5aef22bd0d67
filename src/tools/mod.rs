//! Tool infrastructure - catalog, validation, access control.
//!
//! The catalog is static metadata for the six knowledge operations; access
//! control narrows it to what the session's entitlement permits.

pub mod access;
pub mod catalog;

pub use access::{resolve_allowed_tools, resolve_allowed_tools_at, AccessGrant, AllowSet};
pub use catalog::{ParamDef, ParamType, ToolCatalog, ToolEntry, ToolName};

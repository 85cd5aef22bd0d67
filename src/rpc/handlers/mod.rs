//! Per-method handlers.

pub mod session;
pub mod tools;

pub use tools::{error_envelope, handler_for, HandlerFn, ToolDispatcher};

//! Tool system: registry, typed actions, executor and built-in tools

pub mod base;
pub mod builtin;
pub mod executor;
pub mod registry;

pub use base::{ToolAction, ToolInvocation, ToolKind, ToolResult};
pub use executor::ToolExecutor;
pub use registry::{ParamType, ParameterSpec, ToolDefinition, ToolRegistry};

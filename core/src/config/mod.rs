//! Minimal configuration module for appgen core
//!
//! Only exports pure data types. All discovery and loading logic is in the CLI layer.

pub mod types;

pub use types::{ModelParams, Protocol, ResolvedLlmConfig};

//! Speed Overlay Core - Plugin-based frame analysis architecture
//!
//! This crate provides the core abstractions for the vehicle speed overlay
//! pipeline: an execution context, a plugin trait for analysis stages, and
//! the operations those stages perform.

pub mod context;
pub mod error;
pub mod operation;
pub mod plugin;

pub use context::{Context, ExecutionMode};
pub use error::PluginError;
pub use operation::Operation;
pub use plugin::{Plugin, PluginConfig, PluginData, PluginRequest, PluginResponse, RuntimeConfig};

//! Plugin trait and related types

use crate::error::PluginError;
use crate::{Context, Operation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Core plugin trait - all analysis stages implement this
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique plugin identifier
    fn name(&self) -> &str;

    /// Get plugin configuration
    fn config(&self) -> &PluginConfig;

    /// Check if this plugin can handle the given input type
    fn supports_input(&self, input_type: &str) -> bool;

    /// Check if this plugin produces the given output type
    fn produces_output(&self, output_type: &str) -> bool;

    /// Execute the plugin operation
    async fn execute(
        &self,
        ctx: &Context,
        request: &PluginRequest,
    ) -> Result<PluginResponse, PluginError>;
}

/// Plugin configuration loaded from YAML manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Plugin name
    pub name: String,

    /// Description
    pub description: String,

    /// Supported input types
    pub inputs: Vec<String>,

    /// Output types produced
    pub outputs: Vec<String>,

    /// Runtime configuration
    pub config: RuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Maximum detections accepted per frame before warning
    pub max_detections_per_frame: u32,

    /// Whether this is experimental
    pub experimental: bool,
}

/// Request passed to plugin execution
#[derive(Debug, Clone)]
pub struct PluginRequest {
    /// The operation to perform
    pub operation: Operation,

    /// Input data
    pub input: PluginData,
}

/// Response from plugin execution
#[derive(Debug, Clone)]
pub struct PluginResponse {
    /// Output data
    pub output: PluginData,

    /// Processing duration
    pub duration: std::time::Duration,

    /// Any warnings or notes
    pub warnings: Vec<String>,
}

/// Data passed between plugins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PluginData {
    /// File path reference
    FilePath(std::path::PathBuf),

    /// JSON value
    Json(serde_json::Value),
}

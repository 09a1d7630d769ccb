//! Execution context for plugin operations

use serde::{Deserialize, Serialize};

/// Execution mode that determines optimization priorities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Debug mode - verbose logging, intermediate outputs
    Debug,

    /// Live mode - one frame at a time, minimum latency
    Live,
}

/// Context passed to plugins during execution
#[derive(Debug, Clone)]
pub struct Context {
    /// Execution mode
    pub mode: ExecutionMode,

    /// Whether to include intermediate outputs (e.g. anchor coordinates)
    pub save_intermediates: bool,

    /// Whether verbose logging is enabled
    pub verbose: bool,
}

impl Context {
    /// Create a debug context
    pub fn debug() -> Self {
        Self {
            mode: ExecutionMode::Debug,
            save_intermediates: true,
            verbose: true,
        }
    }

    /// Create a live context
    pub fn live() -> Self {
        Self {
            mode: ExecutionMode::Live,
            save_intermediates: false,
            verbose: false,
        }
    }

    /// Create a context for the given mode
    pub fn new(mode: ExecutionMode) -> Self {
        match mode {
            ExecutionMode::Debug => Self::debug(),
            ExecutionMode::Live => Self::live(),
        }
    }
}

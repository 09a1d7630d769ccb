//! CLI command implementations

pub mod calibration;
pub mod manifest;
pub mod plugins;
pub mod run;

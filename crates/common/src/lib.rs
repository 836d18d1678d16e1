//! ClipForge Common Utilities
//!
//! Shared infrastructure for all ClipForge crates:
//! - Error types and result aliases
//! - Tracing/logging initialization
//! - Configuration loading (export defaults, encoder settings, logging)

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;

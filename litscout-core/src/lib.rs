//! Litscout Core - Shared data structures, configuration, and utilities
//!
//! This module defines the core abstractions used across the litscout system

pub mod async_utils;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod text;
pub mod types;

pub use async_utils::*;
pub use cache::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use text::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;

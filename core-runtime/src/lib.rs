//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the Branch SDK core:
//! - SDK configuration and bridge wiring
//! - Logging and tracing infrastructure
//! - Session event bus
//!
//! Other crates depend on this one for configuration and logging
//! conventions; it never performs network or storage work itself.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{SdkConfig, SdkConfigBuilder, TransportConfig};
pub use error::{Error, Result};

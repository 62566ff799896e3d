//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the SDK core and the host it is
//! embedded in. Each trait represents a capability the core requires but that
//! must be provided differently per platform (desktop, mobile shells, web views).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP execution for the primary and fallback transports
//!
//! ### Storage
//! - [`KeyValueStore`](storage::KeyValueStore) - String key-value persistence for session records
//! - [`MemoryStore`](storage::MemoryStore) - In-process store used when the host store is unusable
//!
//! ### Platform Integration
//! - [`DeviceDataProvider`](device::DeviceDataProvider) - Device attributes sent with install/open
//! - [`LifecycleObserver`](lifecycle::LifecycleObserver) - App foreground/background transitions
//!
//! ### Utilities
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! let http_client = builder.http_client
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "No HTTP client implementation provided. \
//!                  Desktop: enable the desktop-shims feature. \
//!                  Other hosts: inject a platform adapter.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors into it and report an unusable capability as
//! [`BridgeError::NotAvailable`]; the transport treats that variant as the
//! signal to switch to its fallback path.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared across
//! async tasks behind `Arc`.

pub mod device;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod log;
pub mod storage;

pub use error::BridgeError;

pub use device::{DeviceDataProvider, DeviceRequest, StaticDeviceData};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use lifecycle::{LifecycleChangeStream, LifecycleObserver, LifecycleState};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use storage::{KeyValueStore, MemoryStore};

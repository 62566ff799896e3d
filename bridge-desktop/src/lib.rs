//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `KeyValueStore` using a SQLite table (one scope per store)
//! - `DeviceDataProvider` from process environment and OS constants
//! - `LifecycleObserver` driven by the host (desktop apps start in the foreground)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteKeyValueStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let http_client = ReqwestHttpClient::try_new()?;
//!     let permanent = SqliteKeyValueStore::open(
//!         SqliteKeyValueStore::default_path()?,
//!         "permanent",
//!     )
//!     .await?;
//!     // Hand both to the SDK configuration
//!     Ok(())
//! }
//! ```

mod device;
mod http;
mod lifecycle;
mod store;

pub use device::DesktopDeviceData;
pub use http::ReqwestHttpClient;
pub use lifecycle::DesktopLifecycleObserver;
pub use store::SqliteKeyValueStore;

//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, key-value
//! storage, device data, lifecycle) into a [`BranchClient`]. Desktop apps
//! typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) and call [`bootstrap_desktop`].
//!
//! Hosts that want a single process-wide client can register one with
//! [`install_default`] and remove it with [`teardown_default`].

pub mod default_instance;
pub mod error;

pub use default_instance::{default_client, install_default, teardown_default};
pub use error::{CoreError, Result};

pub use core_runtime::config::{SdkConfig, SdkConfigBuilder, TransportConfig};
pub use core_runtime::events::SessionEvent;
pub use core_session::{
    BranchClient, CreditHistoryQuery, IdentityResult, InitOptions, InitState, LinkData,
    ReferralCodeRequest, SessionData, SessionError, SmsOptions,
};
pub use core_transport::TransportError;

use bridge_traits::{DeviceDataProvider, HttpClient, KeyValueStore, LifecycleObserver};
use core_async::task::JoinHandle;
use std::sync::Arc;
use tracing::info;

/// Aggregated handle to all bridge dependencies the client requires.
pub struct SdkDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub device_data: Arc<dyn DeviceDataProvider>,
    pub fallback_http_client: Option<Arc<dyn HttpClient>>,
    pub session_store: Option<Arc<dyn KeyValueStore>>,
    pub permanent_store: Option<Arc<dyn KeyValueStore>>,
    pub lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
}

impl SdkDependencies {
    /// Construct a dependency bundle from the two bridges without defaults.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        device_data: Arc<dyn DeviceDataProvider>,
    ) -> Self {
        Self {
            http_client,
            device_data,
            fallback_http_client: None,
            session_store: None,
            permanent_store: None,
            lifecycle_observer: None,
        }
    }

    pub fn with_fallback_http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.fallback_http_client = Some(client);
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn with_permanent_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.permanent_store = Some(store);
        self
    }

    pub fn with_lifecycle_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle_observer = Some(observer);
        self
    }

    /// Hand every bridge in the bundle to `builder`.
    pub fn apply(self, builder: SdkConfigBuilder) -> SdkConfigBuilder {
        let mut builder = builder
            .http_client(self.http_client)
            .device_data(self.device_data);
        if let Some(client) = self.fallback_http_client {
            builder = builder.fallback_http_client(client);
        }
        if let Some(store) = self.session_store {
            builder = builder.session_store(store);
        }
        if let Some(store) = self.permanent_store {
            builder = builder.permanent_store(store);
        }
        if let Some(observer) = self.lifecycle_observer {
            builder = builder.lifecycle_observer(observer);
        }
        builder
    }
}

/// Primary façade exposed to host applications.
///
/// Owns the client and, when a lifecycle observer is configured, the task
/// that closes the session on backgrounding. Dropping the service stops
/// that task.
pub struct CoreService {
    client: BranchClient,
    lifecycle_task: Option<JoinHandle<()>>,
}

impl CoreService {
    /// Create a service from a finished configuration.
    pub async fn new(config: SdkConfig) -> Result<Self> {
        let client = BranchClient::new(config).await?;
        let lifecycle_task = client.watch_lifecycle().await?;
        info!(lifecycle = lifecycle_task.is_some(), "Core service started");
        Ok(Self {
            client,
            lifecycle_task,
        })
    }

    /// Build a configuration from `deps` on top of `builder`, then start.
    pub async fn from_dependencies(
        deps: SdkDependencies,
        builder: SdkConfigBuilder,
    ) -> Result<Self> {
        let config = deps.apply(builder).build()?;
        Self::new(config).await
    }

    pub fn client(&self) -> &BranchClient {
        &self.client
    }

    pub fn is_watching_lifecycle(&self) -> bool {
        self.lifecycle_task.is_some()
    }
}

impl Drop for CoreService {
    fn drop(&mut self) {
        if let Some(task) = self.lifecycle_task.take() {
            task.abort();
        }
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Uses the desktop defaults for HTTP, device data and lifecycle, keeps the
/// short-lived session in memory and persists first-session data in SQLite at
/// `db_path` (or the platform data directory when `None`).
///
/// ```ignore
/// use core_service::{bootstrap_desktop, InitOptions, SdkConfig};
///
/// let service = bootstrap_desktop(SdkConfig::builder(), None).await?;
/// let session = service.client().init("key_live_...", InitOptions::default()).await?;
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(
    builder: SdkConfigBuilder,
    db_path: Option<std::path::PathBuf>,
) -> Result<CoreService> {
    use bridge_desktop::SqliteKeyValueStore;

    let path = match db_path {
        Some(path) => path,
        None => SqliteKeyValueStore::default_path()?,
    };
    let permanent = SqliteKeyValueStore::open(&path, "permanent")
        .await
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

    let config = builder.permanent_store(Arc::new(permanent)).build()?;
    CoreService::new(config).await
}

//! # SDK Configuration Module
//!
//! Provides configuration management for the Branch SDK core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an `SdkConfig`
//! instance holding every bridge and tunable the session core needs. It
//! enforces fail-fast validation so a misconfigured client is rejected before
//! any network traffic happens.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - Primary transport (desktop default: reqwest)
//! - `DeviceDataProvider` - Install/open attributes (desktop default: environment based)
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `fallback_http_client` - Client used by the padded-callback fallback transport (default: the primary client)
//! - `session_store` / `permanent_store` - Session records (default: in-memory)
//! - `LifecycleObserver` - Closes the session when the host backgrounds (optional)
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults for
//! `HttpClient`, `DeviceDataProvider` and `LifecycleObserver` are injected
//! automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{SdkConfig, TransportConfig};
//! use std::time::Duration;
//!
//! let config = SdkConfig::builder()
//!     .transport(TransportConfig::default().with_retries(1))
//!     .task_watchdog(Duration::from_secs(30))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! Missing bridges without a default produce [`Error::CapabilityMissing`]
//! with an actionable message; out-of-range values produce [`Error::Config`].

use crate::error::{Error, Result};
use bridge_traits::{
    DeviceDataProvider, HttpClient, KeyValueStore, LifecycleObserver, MemoryStore,
};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default API host for attribution requests.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.branch.io";

/// Default short-link service host.
pub const DEFAULT_LINK_SERVICE_ENDPOINT: &str = "https://bnc.lt";

/// SDK identifier attached to requests that accept an `sdk` parameter.
pub const DEFAULT_SDK_IDENTIFIER: &str = concat!("rust", env!("CARGO_PKG_VERSION"));

const MAX_RETRIES: u32 = 10;
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Transport tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Per-attempt timeout applied to both transports. Default: 5 s.
    pub timeout: Duration,
    /// Additional attempts after a 5xx-class failure. Default: 2.
    pub retries: u32,
    /// Fixed delay between attempts. Default: 200 ms.
    pub retry_delay: Duration,
    /// Start on the fallback transport instead of the primary client.
    pub prefer_fallback: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retries: 2,
            retry_delay: Duration::from_millis(200),
            prefer_fallback: false,
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_prefer_fallback(mut self, prefer: bool) -> Self {
        self.prefer_fallback = prefer;
        self
    }

    /// Validates transport bounds.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::Config(
                "Transport timeout must be greater than 0".to_string(),
            ));
        }

        if self.retries > MAX_RETRIES {
            return Err(Error::Config(format!(
                "Transport retries exceed maximum of {}",
                MAX_RETRIES
            )));
        }

        if self.retry_delay > MAX_RETRY_DELAY {
            return Err(Error::Config(
                "Retry delay exceeds maximum of 60 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration for a Branch SDK client.
///
/// Use [`SdkConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct SdkConfig {
    /// Base URL of the attribution API
    pub api_endpoint: String,

    /// Base URL of the link service (short links, SMS, click registration)
    pub link_service_endpoint: String,

    /// Value sent as the `sdk` request parameter
    pub sdk_identifier: String,

    /// Timeout, retry and fallback behaviour
    pub transport: TransportConfig,

    /// Debug mode: device data reports fresh hardware ids
    pub debug: bool,

    /// Upper bound on a single queued task; `None` waits indefinitely
    pub task_watchdog: Option<Duration>,

    /// Close the session when the lifecycle observer reports background
    pub close_on_background: bool,

    /// Capacity of the session event channel
    pub event_buffer_size: usize,

    /// Primary HTTP client
    pub http_client: Arc<dyn HttpClient>,

    /// HTTP client used by the fallback transport
    pub fallback_http_client: Arc<dyn HttpClient>,

    /// Short-lived store (current app run)
    pub session_store: Arc<dyn KeyValueStore>,

    /// Long-lived store (first session, device identity)
    pub permanent_store: Arc<dyn KeyValueStore>,

    /// Device attribute collector
    pub device_data: Arc<dyn DeviceDataProvider>,

    /// App lifecycle observer (optional)
    pub lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
}

impl std::fmt::Debug for SdkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("link_service_endpoint", &self.link_service_endpoint)
            .field("sdk_identifier", &self.sdk_identifier)
            .field("transport", &self.transport)
            .field("debug", &self.debug)
            .field("task_watchdog", &self.task_watchdog)
            .field("close_on_background", &self.close_on_background)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .field("fallback_http_client", &"HttpClient { ... }")
            .field("session_store", &"KeyValueStore { ... }")
            .field("permanent_store", &"KeyValueStore { ... }")
            .field("device_data", &"DeviceDataProvider { ... }")
            .field(
                "lifecycle_observer",
                &self
                    .lifecycle_observer
                    .as_ref()
                    .map(|_| "LifecycleObserver { ... }"),
            )
            .finish()
    }
}

impl SdkConfig {
    /// Creates a new builder for constructing an `SdkConfig`.
    pub fn builder() -> SdkConfigBuilder {
        SdkConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Endpoints are absolute http(s) URLs
    /// - The SDK identifier is not empty
    /// - Transport bounds (timeout > 0, retries <= 10, delay <= 60 s)
    /// - The watchdog, when set, is non-zero
    /// - The event buffer holds at least one event
    pub fn validate(&self) -> Result<()> {
        validate_endpoint("API endpoint", &self.api_endpoint)?;
        validate_endpoint("Link service endpoint", &self.link_service_endpoint)?;

        if self.sdk_identifier.trim().is_empty() {
            return Err(Error::Config("SDK identifier cannot be empty".to_string()));
        }

        self.transport.validate()?;

        if matches!(self.task_watchdog, Some(d) if d.is_zero()) {
            return Err(Error::Config(
                "Task watchdog must be greater than 0 when set".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_endpoint(label: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| Error::Config(format!("{} is not a valid URL: {}", label, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Config(format!(
            "{} must use http or https, got '{}'",
            label, other
        ))),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Other hosts: inject a platform HTTP adapter."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn device_data_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "DeviceDataProvider".to_string(),
        message: "No device data provider given. Install and open requests need device attributes. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use DesktopDeviceData. \
                 Other hosts: inject a provider backed by the platform device APIs."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(transport: &TransportConfig) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(transport.timeout).map_err(|e| {
        Error::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: format!("Default reqwest client could not be created: {}", e),
        }
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_transport: &TransportConfig) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_device_data() -> Result<Arc<dyn DeviceDataProvider>> {
    use bridge_desktop::DesktopDeviceData;

    Ok(Arc::new(DesktopDeviceData::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_device_data() -> Result<Arc<dyn DeviceDataProvider>> {
    Err(device_data_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_lifecycle_observer() -> Option<Arc<dyn LifecycleObserver>> {
    use bridge_desktop::DesktopLifecycleObserver;

    Some(Arc::new(DesktopLifecycleObserver::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_lifecycle_observer() -> Option<Arc<dyn LifecycleObserver>> {
    None
}

/// Builder for constructing [`SdkConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](SdkConfigBuilder::build) to create the final config.
#[derive(Default)]
pub struct SdkConfigBuilder {
    api_endpoint: Option<String>,
    link_service_endpoint: Option<String>,
    sdk_identifier: Option<String>,
    transport: TransportConfig,
    debug: bool,
    task_watchdog: Option<Duration>,
    close_on_background: Option<bool>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    fallback_http_client: Option<Arc<dyn HttpClient>>,
    session_store: Option<Arc<dyn KeyValueStore>>,
    permanent_store: Option<Arc<dyn KeyValueStore>>,
    device_data: Option<Arc<dyn DeviceDataProvider>>,
    lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
}

impl SdkConfigBuilder {
    /// Sets the attribution API base URL.
    ///
    /// Default: `https://api.branch.io`
    pub fn api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the link service base URL.
    ///
    /// Default: `https://bnc.lt`
    pub fn link_service_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.link_service_endpoint = Some(endpoint.into());
        self
    }

    /// Overrides the `sdk` request parameter.
    pub fn sdk_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.sdk_identifier = Some(identifier.into());
        self
    }

    /// Sets timeout, retry and fallback behaviour.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::{SdkConfig, TransportConfig};
    /// use std::time::Duration;
    ///
    /// let builder = SdkConfig::builder()
    ///     .transport(TransportConfig::default().with_retry_delay(Duration::from_millis(50)));
    /// ```
    pub fn transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Enables debug mode.
    ///
    /// Default: false
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Bounds how long a single queued operation may hold the queue.
    ///
    /// Default: unbounded
    pub fn task_watchdog(mut self, limit: Duration) -> Self {
        self.task_watchdog = Some(limit);
        self
    }

    /// Controls whether a background transition closes the session.
    ///
    /// Default: true
    pub fn close_on_background(mut self, enabled: bool) -> Self {
        self.close_on_background = Some(enabled);
        self
    }

    /// Sets the session event channel capacity.
    ///
    /// Default: 64
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the primary HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the client used by the fallback transport.
    ///
    /// Defaults to the primary client.
    pub fn fallback_http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.fallback_http_client = Some(client);
        self
    }

    /// Sets the short-lived session store.
    pub fn session_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Sets the long-lived store.
    pub fn permanent_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.permanent_store = Some(store);
        self
    }

    /// Sets the device data provider.
    pub fn device_data(mut self, provider: Arc<dyn DeviceDataProvider>) -> Self {
        self.device_data = Some(provider);
        self
    }

    /// Sets the lifecycle observer implementation (optional).
    pub fn lifecycle_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle_observer = Some(observer);
        self
    }

    /// Builds the final `SdkConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(SdkConfig)` on success, or an error if:
    /// - Required bridges are missing and no default is available
    /// - Configuration values are invalid
    pub fn build(self) -> Result<SdkConfig> {
        // Validate transport first so the default client is built with sane bounds.
        self.transport.validate()?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(&self.transport)?,
        };

        let device_data = match self.device_data {
            Some(provider) => provider,
            None => provide_default_device_data()?,
        };

        let fallback_http_client = self
            .fallback_http_client
            .unwrap_or_else(|| Arc::clone(&http_client));

        let session_store: Arc<dyn KeyValueStore> = self
            .session_store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let permanent_store: Arc<dyn KeyValueStore> = self
            .permanent_store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));

        let lifecycle_observer = self
            .lifecycle_observer
            .or_else(provide_default_lifecycle_observer);

        let config = SdkConfig {
            api_endpoint: trim_endpoint(
                self.api_endpoint
                    .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
            ),
            link_service_endpoint: trim_endpoint(
                self.link_service_endpoint
                    .unwrap_or_else(|| DEFAULT_LINK_SERVICE_ENDPOINT.to_string()),
            ),
            sdk_identifier: self
                .sdk_identifier
                .unwrap_or_else(|| DEFAULT_SDK_IDENTIFIER.to_string()),
            transport: self.transport,
            debug: self.debug,
            task_watchdog: self.task_watchdog,
            close_on_background: self.close_on_background.unwrap_or(true),
            event_buffer_size: self.event_buffer_size.unwrap_or(64),
            http_client,
            fallback_http_client,
            session_store,
            permanent_store,
            device_data,
            lifecycle_observer,
        };

        config.validate()?;

        Ok(config)
    }
}

fn trim_endpoint(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

//! Device data for desktop hosts

use async_trait::async_trait;
use bridge_traits::{
    device::{DeviceDataProvider, DeviceRequest},
    error::Result,
};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Collects device attributes from the process environment.
///
/// The hardware id is a SHA-256 digest of host and user name so it is
/// stable across runs without exposing either value. When neither is
/// available a random id is reported with `is_hardware_id_real = false`.
#[derive(Debug, Clone)]
pub struct DesktopDeviceData {
    app_version: Option<String>,
    uri_scheme: Option<String>,
}

impl DesktopDeviceData {
    pub fn new() -> Self {
        Self {
            app_version: None,
            uri_scheme: None,
        }
    }

    /// Version string of the embedding application
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    /// Custom URI scheme the application is registered for
    pub fn with_uri_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.uri_scheme = Some(scheme.into());
        self
    }

    fn stable_hardware_id() -> Option<String> {
        let host = std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .ok();
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok();
        if host.is_none() && user.is_none() {
            return None;
        }

        let mut hasher = Sha256::new();
        hasher.update(host.unwrap_or_default().as_bytes());
        hasher.update(b"/");
        hasher.update(user.unwrap_or_default().as_bytes());
        let digest = hasher.finalize();
        Some(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    fn hardware_id(debug: bool) -> (String, bool) {
        if !debug {
            if let Some(id) = Self::stable_hardware_id() {
                return (id, true);
            }
        }
        (uuid::Uuid::new_v4().to_string(), false)
    }

    fn collect(&self, request: DeviceRequest, include_install_fields: bool) -> Map<String, Value> {
        let (hardware_id, is_real) = Self::hardware_id(request.debug);
        let mut data = Map::new();
        data.insert("hardware_id".into(), Value::from(hardware_id));
        data.insert("is_hardware_id_real".into(), Value::from(is_real));
        data.insert("os".into(), Value::from(os_name()));
        data.insert(
            "is_referrable".into(),
            Value::from(u8::from(request.is_referrable)),
        );
        if let Some(version) = &self.app_version {
            data.insert("app_version".into(), Value::from(version.as_str()));
        }
        if let Some(scheme) = &self.uri_scheme {
            data.insert("uri_scheme".into(), Value::from(scheme.as_str()));
        }
        if include_install_fields {
            data.insert("model".into(), Value::from(std::env::consts::ARCH));
            data.insert("add_tracking_enabled".into(), Value::from(false));
        }
        debug!(debug = request.debug, is_real, "Collected device data");
        data
    }
}

impl Default for DesktopDeviceData {
    fn default() -> Self {
        Self::new()
    }
}

fn os_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "Mac OS",
        "windows" => "Windows",
        "linux" => "Linux",
        other => other,
    }
}

#[async_trait]
impl DeviceDataProvider for DesktopDeviceData {
    async fn install_data(&self, request: DeviceRequest) -> Result<Map<String, Value>> {
        Ok(self.collect(request, true))
    }

    async fn open_data(&self, request: DeviceRequest) -> Result<Map<String, Value>> {
        Ok(self.collect(request, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_install_data_contains_core_fields() {
        let provider = DesktopDeviceData::new().with_app_version("2.3.0");
        let data = provider
            .install_data(DeviceRequest {
                debug: false,
                is_referrable: true,
            })
            .await
            .unwrap();

        assert!(data["hardware_id"].as_str().is_some());
        assert!(data["is_hardware_id_real"].is_boolean());
        assert_eq!(data["app_version"], "2.3.0");
        assert_eq!(data["is_referrable"], 1);
        assert!(data.contains_key("model"));
    }

    #[tokio::test]
    async fn test_open_data_omits_install_only_fields() {
        let provider = DesktopDeviceData::new();
        let data = provider.open_data(DeviceRequest::default()).await.unwrap();
        assert!(!data.contains_key("model"));
        assert_eq!(data["is_referrable"], 0);
    }

    #[tokio::test]
    async fn test_debug_reports_fresh_ids() {
        let provider = DesktopDeviceData::new();
        let request = DeviceRequest {
            debug: true,
            is_referrable: false,
        };
        let first = provider.install_data(request).await.unwrap();
        let second = provider.install_data(request).await.unwrap();

        assert_ne!(first["hardware_id"], second["hardware_id"]);
        assert_eq!(first["is_hardware_id_real"], false);
    }
}

//! Device Data
//!
//! Install and open requests carry a bag of device attributes (hardware id,
//! OS, screen metrics, app version). Collecting them is host-specific, so the
//! core only sees a flat JSON parameter map.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

/// Options forwarded from `init` to the device data collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceRequest {
    /// Debug mode: report a fresh, non-persistent hardware id so every
    /// install is treated as a new device.
    pub debug: bool,
    /// Whether this session may be attributed to a referring link.
    pub is_referrable: bool,
}

/// Device data provider trait
///
/// Keys returned must match the install/open parameter names (`hardware_id`,
/// `is_hardware_id_real`, `app_version`, `os`, `os_version`, `brand`,
/// `model`, `screen_width`, `is_referrable`, ...). Unknown keys are dropped
/// by the transport's parameter filter.
#[async_trait]
pub trait DeviceDataProvider: Send + Sync {
    /// Attributes sent with a first-run install
    async fn install_data(&self, request: DeviceRequest) -> Result<Map<String, Value>>;

    /// Attributes sent when reopening with a known identity
    async fn open_data(&self, request: DeviceRequest) -> Result<Map<String, Value>>;
}

/// Provider that returns a fixed attribute map for both calls.
///
/// Useful for hosts that collect device data once up front, and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceData {
    attributes: Map<String, Value>,
}

impl StaticDeviceData {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self { attributes }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    fn collect(&self, request: DeviceRequest) -> Map<String, Value> {
        let mut attributes = self.attributes.clone();
        attributes.insert(
            "is_referrable".to_string(),
            Value::from(u8::from(request.is_referrable)),
        );
        attributes
    }
}

#[async_trait]
impl DeviceDataProvider for StaticDeviceData {
    async fn install_data(&self, request: DeviceRequest) -> Result<Map<String, Value>> {
        Ok(self.collect(request))
    }

    async fn open_data(&self, request: DeviceRequest) -> Result<Map<String, Value>> {
        Ok(self.collect(request))
    }
}

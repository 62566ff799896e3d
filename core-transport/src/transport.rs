use bridge_traits::{BridgeError, HttpClient, HttpRequest, HttpResponse};
use core_async::time::timeout;
use core_runtime::config::{SdkConfig, TransportConfig};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::fallback::FallbackTransport;
use crate::request::{build_request, Endpoints, PreparedRequest};
use crate::resources::Resource;
use crate::retry::RetryPolicy;

/// Sends validated resource calls over the primary client, switching to the
/// fallback transport once the primary reports it cannot be used.
pub struct Transport {
    primary: Arc<dyn HttpClient>,
    fallback: FallbackTransport,
    endpoints: Endpoints,
    config: TransportConfig,
    use_fallback: AtomicBool,
}

impl Transport {
    pub fn new(
        primary: Arc<dyn HttpClient>,
        fallback_client: Arc<dyn HttpClient>,
        endpoints: Endpoints,
        config: TransportConfig,
    ) -> Self {
        Self {
            primary,
            fallback: FallbackTransport::new(fallback_client, config.timeout),
            endpoints,
            use_fallback: AtomicBool::new(config.prefer_fallback),
            config,
        }
    }

    pub fn from_config(config: &SdkConfig) -> Self {
        Self::new(
            config.http_client.clone(),
            config.fallback_http_client.clone(),
            Endpoints::new(
                config.api_endpoint.clone(),
                config.link_service_endpoint.clone(),
            ),
            config.transport,
        )
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Whether later attempts go through the fallback transport.
    pub fn is_using_fallback(&self) -> bool {
        self.use_fallback.load(Ordering::Acquire)
    }

    /// Validate `params`, send the call and decode the JSON reply.
    ///
    /// Validation failures return before anything is sent. 5xx-class
    /// failures are retried per the configured policy.
    pub async fn request(
        &self,
        resource: &Resource,
        params: &Map<String, Value>,
    ) -> Result<Value> {
        let prepared = build_request(resource, params, &self.endpoints)?;
        let policy = RetryPolicy::new(self.config.retries, self.config.retry_delay);

        policy
            .run(resource.label(), |_| self.attempt(resource, &prepared))
            .await
    }

    async fn attempt(&self, resource: &Resource, prepared: &PreparedRequest) -> Result<Value> {
        if resource.fallback_only || self.is_using_fallback() {
            return self.fallback.send(prepared).await;
        }

        let mut http = HttpRequest::new(prepared.method, prepared.target_url())
            .timeout(self.config.timeout);
        if let Some(body) = prepared.form_body() {
            http = http.form(body);
        }

        debug!(method = prepared.method.as_str(), url = %prepared.url, "Sending API request");

        match timeout(self.config.timeout, self.primary.execute(http)).await {
            Err(_) | Ok(Err(BridgeError::Timeout(_))) => Err(TransportError::Timeout),
            Ok(Err(BridgeError::NotAvailable(reason))) => {
                warn!(
                    reason = %reason,
                    "Primary HTTP client unavailable, switching to fallback transport"
                );
                self.use_fallback.store(true, Ordering::Release);
                self.fallback.send(prepared).await
            }
            Ok(Err(e)) => Err(TransportError::Network(e.to_string())),
            Ok(Ok(response)) => interpret(&response),
        }
    }
}

/// Map a primary-transport response to a payload or error.
pub fn interpret(response: &HttpResponse) -> Result<Value> {
    if response.is_success() {
        return Ok(response
            .json::<Value>()
            .unwrap_or_else(|_| Value::Object(Map::new())));
    }

    match response.status {
        402 => Err(TransportError::InsufficientCredits),
        status => Err(TransportError::Api { status }),
    }
}

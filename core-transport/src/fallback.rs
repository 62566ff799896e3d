//! Padded-callback fallback transport.
//!
//! Every call is a GET whose URL carries the payload and a callback token;
//! the server answers with `token(<json>)`. Used when the primary client is
//! unavailable and for resources that only exist on this path.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bridge_traits::{BridgeError, HttpClient, HttpMethod, HttpRequest};
use core_async::time::{timeout, Duration};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::request::PreparedRequest;
use crate::resources::Destination;

const CALLBACK_PREFIX: &str = "branch_callback__";

pub struct FallbackTransport {
    client: Arc<dyn HttpClient>,
    counter: AtomicU64,
    timeout: Duration,
}

impl FallbackTransport {
    pub fn new(client: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self {
            client,
            counter: AtomicU64::new(0),
            timeout,
        }
    }

    /// Next callback token; indices increase for the life of the transport.
    pub fn next_callback(&self) -> String {
        let index = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", CALLBACK_PREFIX, index)
    }

    /// Build the padded URL for `request` with the given callback token.
    pub fn padded_url(request: &PreparedRequest, callback: &str) -> String {
        let mut url = request.target_url();
        if !url.contains('?') {
            url.push('?');
        }

        if request.method == HttpMethod::Post {
            let json = Value::Object(request.payload.clone()).to_string();
            let encoded = urlencoding::encode(&BASE64.encode(json)).into_owned();
            if !encoded.is_empty() {
                url.push_str(match request.destination {
                    Destination::Api => "&data=",
                    Destination::LinkService => "&post_data=",
                });
                url.push_str(&encoded);
            }
        }

        if url.contains("/c/") {
            url.push_str("&click=1");
        }

        url.push_str("&callback=");
        url.push_str(callback);
        url
    }

    /// Perform one fallback exchange.
    pub async fn send(&self, request: &PreparedRequest) -> Result<Value> {
        let callback = self.next_callback();
        let url = Self::padded_url(request, &callback);
        debug!(callback = %callback, "Sending request via fallback transport");

        let http = HttpRequest::new(HttpMethod::Get, url).timeout(self.timeout);
        let response = match timeout(self.timeout, self.client.execute(http)).await {
            Err(_) | Ok(Err(BridgeError::Timeout(_))) => return Err(TransportError::Timeout),
            Ok(Err(BridgeError::NotAvailable(msg))) => {
                return Err(TransportError::Unavailable(msg))
            }
            Ok(Err(e)) => return Err(TransportError::Network(e.to_string())),
            Ok(Ok(response)) => response,
        };

        if response.status == 402 {
            return Err(TransportError::InsufficientCredits);
        }
        if !response.is_success() {
            return Err(TransportError::Api {
                status: response.status,
            });
        }

        let body = response
            .text()
            .map_err(|_| TransportError::CallbackNotInvoked(callback.clone()))?;
        parse_callback(&body, &callback)
    }
}

/// Extract the JSON argument of `callback(...)` from a padded response.
pub fn parse_callback(body: &str, callback: &str) -> Result<Value> {
    let not_invoked = || TransportError::CallbackNotInvoked(callback.to_string());

    let trimmed = body.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    let inner = trimmed
        .strip_prefix(callback)
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(not_invoked)?;

    serde_json::from_str(inner).map_err(|_| not_invoked())
}

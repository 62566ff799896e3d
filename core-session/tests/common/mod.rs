#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{HttpClient, HttpRequest, HttpResponse, KeyValueStore, MemoryStore};
use bridge_traits::StaticDeviceData;
use core_runtime::config::SdkConfig;
use core_session::BranchClient;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const KEY: &str = "key_live_abcdefghijklmnopqrstuvwxyz012345";
pub const SESSION_ID: &str = "111111111111111";
pub const IDENTITY_ID: &str = "222222222222222";
pub const FINGERPRINT_ID: &str = "333333333333333";

#[derive(Clone)]
struct Route {
    path: String,
    status: u16,
    body: String,
    delay: Duration,
}

/// HTTP client answering from a fixed route table and logging traffic.
#[derive(Default)]
pub struct ScriptedHttp {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
    log: Mutex<Vec<String>>,
}

impl ScriptedHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer requests whose path contains `path`. Later routes for the same
    /// path replace earlier ones.
    pub fn route(&self, path: &str, status: u16, body: &str) {
        self.route_with_delay(path, status, body, Duration::ZERO);
    }

    pub fn route_with_delay(&self, path: &str, status: u16, body: &str, delay: Duration) {
        let mut routes = self.routes.lock().unwrap();
        routes.retain(|r| r.path != path);
        routes.push(Route {
            path: path.to_string(),
            status,
            body: body.to_string(),
            delay,
        });
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| path_of(&r.url).contains(path))
            .count()
    }

    /// `start <path>` / `end <path>` entries in the order they happened.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn body_of(&self, path: &str) -> Option<String> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| path_of(&r.url).contains(path))
            .and_then(|r| r.body)
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }
}

fn path_of(url: &str) -> &str {
    let without_query = url.split('?').next().unwrap_or(url);
    match without_query.find("://") {
        Some(i) => {
            let rest = &without_query[i + 3..];
            rest.find('/').map(|p| &rest[p..]).unwrap_or("")
        }
        None => without_query,
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let path = path_of(&request.url).to_string();
        self.requests.lock().unwrap().push(request);
        self.log.lock().unwrap().push(format!("start {}", path));

        let route = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .find(|r| path.contains(&r.path))
            .cloned();

        let response = match route {
            Some(route) => {
                if !route.delay.is_zero() {
                    tokio::time::sleep(route.delay).await;
                }
                HttpResponse::new(route.status, route.body)
            }
            None => HttpResponse::new(404, ""),
        };

        self.log.lock().unwrap().push(format!("end {}", path));
        Ok(response)
    }
}

pub struct Harness {
    pub client: BranchClient,
    pub http: Arc<ScriptedHttp>,
    pub session_store: Arc<MemoryStore>,
    pub permanent_store: Arc<MemoryStore>,
}

pub fn install_body() -> String {
    serde_json::json!({
        "session_id": SESSION_ID,
        "identity_id": IDENTITY_ID,
        "device_fingerprint_id": FINGERPRINT_ID,
        "link": "https://bnc.lt/i/self",
        "data": "{\"campaign\":\"spring\"}",
        "has_app": true,
        "referring_link": "/l/ref123",
        "internal": "hidden",
    })
    .to_string()
}

pub async fn harness() -> Harness {
    harness_with(|builder| builder).await
}

pub async fn harness_with<F>(customize: F) -> Harness
where
    F: FnOnce(core_runtime::SdkConfigBuilder) -> core_runtime::SdkConfigBuilder,
{
    let http = ScriptedHttp::new();
    let session_store = Arc::new(MemoryStore::new());
    let permanent_store = Arc::new(MemoryStore::new());

    let builder = SdkConfig::builder()
        .http_client(http.clone())
        .session_store(session_store.clone())
        .permanent_store(permanent_store.clone())
        .device_data(Arc::new(
            StaticDeviceData::default()
                .with("os", "Linux")
                .with("hardware_id", "abc"),
        ));
    let config = customize(builder).build().unwrap();
    let client = BranchClient::new(config).await.unwrap();

    Harness {
        client,
        http,
        session_store,
        permanent_store,
    }
}

pub async fn stored(store: &MemoryStore) -> serde_json::Value {
    match store.get(core_session::SESSION_KEY).await.unwrap() {
        Some(raw) => serde_json::from_str(&raw).unwrap(),
        None => serde_json::Value::Null,
    }
}

/// Harness with a live session from a scripted install.
pub async fn initialized() -> Harness {
    let h = harness().await;
    h.http.route("/v1/install", 200, &install_body());
    h.client
        .init(KEY, core_session::InitOptions::default())
        .await
        .unwrap();
    h
}

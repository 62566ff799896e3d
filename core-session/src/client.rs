//! # Branch Client
//!
//! Session state machine and the public operations built on it.
//!
//! Every network operation runs as one task on a [`SerialQueue`], so the
//! network phases of calls never overlap and start in call order. Methods
//! enqueue their work synchronously and return a [`QueuedCall`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_session::{BranchClient, InitOptions, LinkData};
//!
//! let client = BranchClient::new(config).await?;
//! let init = client.init("key_live_...", InitOptions::default());
//! let link = client.link(LinkData::new().with_channel("email"));
//!
//! let session = init.await?;
//! let url = link.await?;
//! ```
//!
//! `data()` and `first()` read stored records directly and do not wait for
//! the queue.

use bridge_traits::{DeviceDataProvider, DeviceRequest, LifecycleObserver};
use core_async::sync::oneshot;
use core_async::task::JoinHandle;
use core_async::time::{timeout, Duration};
use core_runtime::config::SdkConfig;
use core_runtime::events::{EventBus, Receiver, SessionEvent};
use core_transport::{resources, Resource, Transport};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tracing::{debug, info, instrument, warn};

use crate::call::QueuedCall;
use crate::error::{Result, SessionError};
use crate::queue::SerialQueue;
use crate::state::{
    id_field, last_segment, normalize_ids, normalize_referring_link, AppCredential, InitState,
    Session, SessionData,
};
use crate::storage::SessionStorage;
use crate::types::{
    CreditHistoryQuery, IdentityResult, InitOptions, LinkData, ReferralCodeRequest, SmsOptions,
};

/// Client for one app session.
///
/// Cheap to clone; clones share the session, queue and stores.
#[derive(Clone)]
pub struct BranchClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Transport,
    queue: SerialQueue,
    storage: SessionStorage,
    permanent: SessionStorage,
    device_data: Arc<dyn DeviceDataProvider>,
    lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
    events: EventBus,
    session: RwLock<Session>,
    sdk: String,
    link_service: String,
    debug: AtomicBool,
    watchdog: Option<Duration>,
    close_on_background: bool,
}

impl BranchClient {
    /// Validate `config`, probe both stores and build a client.
    pub async fn new(config: SdkConfig) -> Result<Self> {
        config.validate()?;

        let storage = SessionStorage::open(config.session_store.clone()).await;
        let permanent = SessionStorage::open(config.permanent_store.clone()).await;

        info!(
            api_endpoint = %config.api_endpoint,
            sdk = %config.sdk_identifier,
            "Branch client created"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                transport: Transport::from_config(&config),
                queue: SerialQueue::new(),
                storage,
                permanent,
                device_data: config.device_data.clone(),
                lifecycle_observer: config.lifecycle_observer.clone(),
                events: EventBus::new(config.event_buffer_size),
                session: RwLock::new(Session::default()),
                sdk: config.sdk_identifier.clone(),
                link_service: config.link_service_endpoint.clone(),
                debug: AtomicBool::new(config.debug),
                watchdog: config.task_watchdog,
                close_on_background: config.close_on_background,
            }),
        })
    }

    pub fn init_state(&self) -> InitState {
        self.inner.read_session().init_state
    }

    pub fn is_initialized(&self) -> bool {
        self.init_state() == InitState::Succeeded
    }

    /// Current session id, if a session is live.
    pub fn session_id(&self) -> Option<String> {
        self.inner.read_session().session_id.clone()
    }

    pub fn identity_id(&self) -> Option<String> {
        self.inner.read_session().identity_id.clone()
    }

    /// Whether the transport has switched to its fallback path.
    pub fn is_using_fallback(&self) -> bool {
        self.inner.transport.is_using_fallback()
    }

    /// Report fresh device ids on install. Takes effect on the next `init`.
    pub fn set_debug(&self, debug: bool) {
        self.inner.debug.store(debug, Ordering::Relaxed);
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Start a session: resume a stored one, or call open or install.
    ///
    /// Fails immediately while another `init` is pending or a session is live.
    pub fn init(
        &self,
        identifier: impl Into<String>,
        options: InitOptions,
    ) -> QueuedCall<SessionData> {
        let identifier = identifier.into();
        {
            let mut session = self.inner.write_session();
            match session.init_state {
                InitState::Succeeded => {
                    return QueuedCall::failed(SessionError::AlreadyInitialized)
                }
                InitState::Pending => return QueuedCall::failed(SessionError::InitPending),
                InitState::Uninitialized | InitState::Failed => {}
            }
            session.init_state = InitState::Pending;
            session.credential = Some(AppCredential::classify(&identifier));
        }

        self.schedule_with_stall("init", ClientInner::abandon_init, move |inner| async move {
            inner.run_init(options).await
        })
    }

    /// Whitelisted short-lived session data, with the referring link filled
    /// from the stored click id when needed.
    pub async fn data(&self) -> SessionData {
        let record = self.inner.storage.read().await;
        let mut data = SessionData::from_record(&record);
        data.referring_link = self.referring_link().await.map(Value::String);
        data
    }

    /// Whitelisted data of the first session on this device.
    pub async fn first(&self) -> SessionData {
        SessionData::from_record(&self.inner.permanent.read().await)
    }

    /// The link that referred this session, if any.
    pub async fn referring_link(&self) -> Option<String> {
        self.inner.referring_link().await
    }

    pub fn set_identity(&self, identity: impl Into<String>) -> QueuedCall<IdentityResult> {
        let identity = identity.into();
        self.gated("set_identity", move |inner| async move {
            let mut params = Map::new();
            params.insert("identity".into(), Value::String(identity));
            let response = inner.call_object(&resources::PROFILE, params).await?;
            let result = IdentityResult::from_response(response);

            {
                let mut session = inner.write_session();
                session.identity_id = result.identity_id.clone();
                session.session_link = result.link.clone();
                session.identity = result.identity.clone();
            }

            let mut fields = Map::new();
            for (key, value) in [
                ("identity_id", &result.identity_id),
                ("link", &result.link),
                ("identity", &result.identity),
            ] {
                if let Some(v) = value {
                    fields.insert(key.into(), Value::String(v.clone()));
                }
            }
            inner.storage.merge(fields).await?;

            if let Some(identity) = &result.identity {
                inner.emit(SessionEvent::IdentitySet {
                    identity: identity.clone(),
                });
            }
            Ok(result)
        })
    }

    /// Detach the identity. The server issues fresh session and identity ids.
    pub fn logout(&self) -> QueuedCall<()> {
        self.gated("logout", |inner| async move {
            let response = inner.call_object(&resources::LOGOUT, Map::new()).await?;

            let fresh = {
                let mut session = inner.write_session();
                session.session_id = id_field(&response, "session_id");
                session.identity_id = id_field(&response, "identity_id");
                session.session_link = response
                    .get("link")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                session.identity = None;
                session.clone()
            };

            inner.storage.clear().await?;
            inner.permanent.clear().await?;

            let mut record = Map::new();
            for (key, value) in [
                ("session_id", &fresh.session_id),
                ("identity_id", &fresh.identity_id),
                ("device_fingerprint_id", &fresh.device_fingerprint_id),
                ("link", &fresh.session_link),
            ] {
                if let Some(v) = value {
                    record.insert(key.into(), Value::String(v.clone()));
                }
            }
            inner.storage.write(&record).await?;

            let mut permanent = Map::new();
            for key in ["identity_id", "device_fingerprint_id"] {
                if let Some(v) = record.get(key) {
                    permanent.insert(key.into(), v.clone());
                }
            }
            inner.permanent.write(&permanent).await?;

            info!("Logged out");
            inner.emit(SessionEvent::LoggedOut);
            Ok(())
        })
    }

    /// End the session. A later `init` starts a new one.
    pub fn close(&self) -> QueuedCall<()> {
        self.gated("close", |inner| async move { inner.run_close().await })
    }

    /// Record a custom event. `metadata` defaults to an empty object.
    pub fn track(&self, event: impl Into<String>, metadata: Option<Value>) -> QueuedCall<()> {
        let event = event.into();
        self.gated("track", move |inner| async move {
            let mut params = Map::new();
            params.insert("event".into(), Value::String(event.clone()));
            params.insert(
                "metadata".into(),
                metadata.unwrap_or_else(|| Value::Object(Map::new())),
            );
            inner.call(&resources::EVENT, params).await?;
            inner.emit(SessionEvent::EventTracked { event });
            Ok(())
        })
    }

    /// Create a deep link and return its URL.
    pub fn link(&self, link_data: LinkData) -> QueuedCall<String> {
        self.gated("link", move |inner| async move {
            let params = link_data.to_params()?;
            inner.create_link(params).await
        })
    }

    /// Text a link to `phone`.
    ///
    /// Reuses the referring link unless `options.make_new_link` is set;
    /// otherwise creates a link, registers a click on it and stores the
    /// click id for reuse.
    pub fn send_sms(
        &self,
        phone: impl Into<String>,
        mut link_data: LinkData,
        options: SmsOptions,
    ) -> QueuedCall<()> {
        let phone = phone.into();
        if link_data
            .channel
            .as_deref()
            .map_or(true, |c| c.is_empty() || c == "app banner")
        {
            link_data.channel = Some("sms".to_string());
        }
        self.gated("send_sms", move |inner| async move {
            let params = link_data.to_params()?;
            let existing = inner
                .referring_link()
                .await
                .filter(|_| !options.make_new_link)
                .and_then(|link| last_segment(&link).map(str::to_string));

            let click_id = match existing {
                Some(click_id) => click_id,
                None => inner.register_click(params).await?,
            };

            let mut sms = Map::new();
            sms.insert("link_url".into(), Value::String(click_id));
            sms.insert("phone".into(), Value::String(phone));
            inner.call(&resources::SMS_LINK_SEND, sms).await?;

            inner.emit(SessionEvent::SmsSent);
            Ok(())
        })
    }

    pub fn referrals(&self) -> QueuedCall<Value> {
        self.gated("referrals", |inner| async move {
            inner.call(&resources::REFERRALS, Map::new()).await
        })
    }

    /// Create a credit referral code.
    pub fn get_code(&self, request: ReferralCodeRequest) -> QueuedCall<Value> {
        self.gated("get_code", move |inner| async move {
            inner.call(&resources::GET_CODE, request.to_params()).await
        })
    }

    pub fn validate_code(&self, code: impl Into<String>) -> QueuedCall<()> {
        let code = code.into();
        self.gated("validate_code", move |inner| async move {
            inner.call(&resources::VALIDATE_CODE, code_params(code)).await?;
            Ok(())
        })
    }

    pub fn apply_code(&self, code: impl Into<String>) -> QueuedCall<()> {
        let code = code.into();
        self.gated("apply_code", move |inner| async move {
            inner.call(&resources::APPLY_CODE, code_params(code)).await?;
            Ok(())
        })
    }

    /// Credit balances per bucket.
    pub fn credits(&self) -> QueuedCall<Value> {
        self.gated("credits", |inner| async move {
            inner.call(&resources::CREDITS, Map::new()).await
        })
    }

    pub fn credit_history(&self, query: CreditHistoryQuery) -> QueuedCall<Value> {
        self.gated("credit_history", move |inner| async move {
            inner.call(&resources::CREDIT_HISTORY, query.to_params()).await
        })
    }

    /// Redeem `amount` credits from `bucket`.
    pub fn redeem(&self, amount: i64, bucket: impl Into<String>) -> QueuedCall<()> {
        let bucket = bucket.into();
        self.gated("redeem", move |inner| async move {
            let mut params = Map::new();
            params.insert("amount".into(), Value::from(amount));
            params.insert("bucket".into(), Value::String(bucket.clone()));
            inner.call(&resources::REDEEM, params).await?;
            inner.emit(SessionEvent::CreditsRedeemed { amount, bucket });
            Ok(())
        })
    }

    /// Close the session whenever the configured lifecycle observer reports
    /// the app left the foreground.
    ///
    /// Returns `None` when no observer is configured or
    /// `close_on_background` is off. The watcher holds only a weak
    /// reference and exits once the client is dropped.
    pub async fn watch_lifecycle(&self) -> Result<Option<JoinHandle<()>>> {
        let Some(observer) = self.inner.lifecycle_observer.clone() else {
            return Ok(None);
        };
        if !self.inner.close_on_background {
            return Ok(None);
        }

        let mut changes = observer
            .subscribe_changes()
            .await
            .map_err(|e| SessionError::UnexpectedResponse(e.to_string()))?;
        let weak: Weak<ClientInner> = Arc::downgrade(&self.inner);

        Ok(Some(core_async::spawn(async move {
            while let Some(state) = changes.next().await {
                let Some(inner) = weak.upgrade() else { break };
                let client = BranchClient { inner };
                if !state.is_inactive() || !client.is_initialized() {
                    continue;
                }
                debug!(?state, "App left the foreground, closing session");
                if let Err(e) = client.close().await {
                    warn!(error = %e, "Failed to close session on background");
                }
            }
        })))
    }

    /// Queue `body` behind every earlier call.
    fn schedule<T, F, Fut>(&self, operation: &'static str, body: F) -> QueuedCall<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<ClientInner>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.schedule_with_stall(operation, |_| {}, body)
    }

    /// [`schedule`](Self::schedule), running `on_stall` if the watchdog
    /// abandons the task.
    fn schedule_with_stall<T, F, Fut>(
        &self,
        operation: &'static str,
        on_stall: fn(&ClientInner),
        body: F,
    ) -> QueuedCall<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<ClientInner>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let inner = self.inner.clone();
        let watchdog = inner.watchdog;

        self.inner.queue.enqueue(move |done| {
            async move {
                let work = body(inner.clone());
                let result = match watchdog {
                    Some(limit) => match timeout(limit, work).await {
                        Ok(result) => result,
                        Err(_) => {
                            warn!(operation, ?limit, "Queued task stalled, releasing queue");
                            on_stall(&inner);
                            Err(SessionError::TaskStalled(operation))
                        }
                    },
                    None => work.await,
                };
                done.done();
                // Caller may have dropped the call.
                let _ = tx.send(result);
            }
            .boxed()
        });

        QueuedCall::waiting(rx)
    }

    /// Like [`schedule`](Self::schedule) for operations that need a live
    /// session. The state is checked now and again when the task runs.
    fn gated<T, F, Fut>(&self, operation: &'static str, body: F) -> QueuedCall<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<ClientInner>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if let Err(e) = self.init_state().gate() {
            debug!(operation, error = %e, "Rejected call");
            return QueuedCall::failed(e);
        }

        self.schedule(operation, move |inner| async move {
            inner.read_session().init_state.gate()?;
            body(inner).await
        })
    }
}

impl std::fmt::Debug for BranchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchClient")
            .field("session", &*self.inner.read_session())
            .field("queue", &self.inner.queue)
            .finish()
    }
}

fn code_params(code: String) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("code".into(), Value::String(code));
    params
}

impl ClientInner {
    fn read_session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No listeners is fine.
        let _ = self.events.emit(event);
    }

    /// Send one resource call with the session's ambient params.
    async fn call(&self, resource: &Resource, params: Map<String, Value>) -> Result<Value> {
        let params = self.read_session().request_params(resource, &self.sdk, params);
        Ok(self.transport.request(resource, &params).await?)
    }

    async fn call_object(
        &self,
        resource: &Resource,
        params: Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        match self.call(resource, params).await? {
            Value::Object(map) => Ok(map),
            other => Err(SessionError::UnexpectedResponse(format!(
                "{} returned {}",
                resource.name, other
            ))),
        }
    }

    async fn referring_link(&self) -> Option<String> {
        let record = self.storage.read().await;
        let text = |key: &str| {
            record
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        text("referring_link")
            .or_else(|| text("click_id").map(|id| format!("{}/c/{}", self.link_service, id)))
    }

    /// An `init` abandoned by the watchdog counts as failed.
    fn abandon_init(&self) {
        {
            let mut session = self.write_session();
            if session.init_state != InitState::Pending {
                return;
            }
            session.init_state = InitState::Failed;
        }
        self.emit(SessionEvent::InitFailed {
            reason: "initialisation stalled".to_string(),
        });
    }

    #[instrument(skip_all, fields(is_referrable = options.is_referrable))]
    async fn run_init(&self, options: InitOptions) -> Result<SessionData> {
        match self.start_session(options).await {
            Ok(data) => Ok(data),
            Err(e) => {
                warn!(error = %e, "Session initialisation failed");
                self.write_session().init_state = InitState::Failed;
                self.emit(SessionEvent::InitFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn start_session(&self, options: InitOptions) -> Result<SessionData> {
        let stored = self.storage.read().await;
        if id_field(&stored, "session_id").is_some() {
            {
                let mut session = self.write_session();
                session.adopt(&stored);
                session.init_state = InitState::Succeeded;
            }
            info!("Resumed stored session");
            self.emit(SessionEvent::Initialized {
                resumed: true,
                install: false,
            });
            return Ok(SessionData::from_record(&stored));
        }

        let request = DeviceRequest {
            debug: self.debug.load(Ordering::Relaxed),
            is_referrable: options.is_referrable,
        };
        let permanent = self.permanent.read().await;

        let (resource, params, install) = match id_field(&permanent, "identity_id") {
            Some(identity_id) => {
                let device_fingerprint_id = id_field(&permanent, "device_fingerprint_id");
                let mut params = self
                    .device_data
                    .open_data(request)
                    .await
                    .map_err(|e| SessionError::DeviceData(e.to_string()))?;
                params.insert("identity_id".into(), Value::String(identity_id.clone()));
                if let Some(id) = &device_fingerprint_id {
                    params.insert("device_fingerprint_id".into(), Value::String(id.clone()));
                }

                let mut session = self.write_session();
                session.identity_id = Some(identity_id);
                session.device_fingerprint_id = device_fingerprint_id;
                (&resources::OPEN, params, false)
            }
            None => {
                let params = self
                    .device_data
                    .install_data(request)
                    .await
                    .map_err(|e| SessionError::DeviceData(e.to_string()))?;
                (&resources::INSTALL, params, true)
            }
        };

        debug!(resource = resource.name, "Starting new session");
        let mut record = self.call_object(resource, params).await?;
        normalize_ids(&mut record);
        normalize_referring_link(&mut record, &self.link_service);

        self.storage.write(&record).await?;
        if install {
            self.permanent.write(&record).await?;
        } else {
            let mut ids = Map::new();
            for key in ["identity_id", "device_fingerprint_id"] {
                if let Some(v) = record.get(key) {
                    ids.insert(key.into(), v.clone());
                }
            }
            self.permanent.merge(ids).await?;
        }

        {
            let mut session = self.write_session();
            session.adopt(&record);
            session.init_state = InitState::Succeeded;
        }
        info!(install, "Session started");
        self.emit(SessionEvent::Initialized {
            resumed: false,
            install,
        });
        Ok(SessionData::from_record(&record))
    }

    async fn run_close(&self) -> Result<()> {
        self.call(&resources::CLOSE, Map::new()).await?;
        {
            let mut session = self.write_session();
            session.session_id = None;
            session.session_link = None;
            session.init_state = InitState::Uninitialized;
        }
        self.storage.clear().await?;
        info!("Session closed");
        self.emit(SessionEvent::Closed);
        Ok(())
    }

    async fn create_link(&self, params: Map<String, Value>) -> Result<String> {
        let response = self.call_object(&resources::LINK, params).await?;
        let url = response
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                SessionError::UnexpectedResponse("link response has no url".into())
            })?;
        self.emit(SessionEvent::LinkCreated { url: url.clone() });
        Ok(url)
    }

    /// Create a link, register a click on it and remember the click id.
    async fn register_click(&self, link_params: Map<String, Value>) -> Result<String> {
        let url = self.create_link(link_params).await?;
        let segment = last_segment(&url)
            .ok_or_else(|| SessionError::UnexpectedResponse(format!("link {} has no path", url)))?;

        let mut click = Map::new();
        click.insert("link_url".into(), Value::String(format!("l/{}", segment)));
        click.insert("click".into(), Value::String("click".into()));
        let response = self.call_object(&resources::LINK_CLICK, click).await?;

        let click_id = response
            .get("click_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                SessionError::UnexpectedResponse("click response has no click_id".into())
            })?;
        self.storage
            .store_field("click_id", Value::String(click_id.clone()))
            .await?;
        Ok(click_id)
    }
}

//! Session state machine and the whitelisted view handed to callers.

use core_transport::Resource;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SessionError};
use crate::storage::is_falsy;

/// `Uninitialized -> Pending -> {Failed, Succeeded}`; `close` returns a
/// session to `Uninitialized` and a fresh `init` leaves `Failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitState {
    #[default]
    Uninitialized,
    Pending,
    Failed,
    Succeeded,
}

impl InitState {
    /// Error for operations that need a live session, if not in one.
    pub fn gate(&self) -> Result<()> {
        match self {
            InitState::Succeeded => Ok(()),
            InitState::Pending => Err(SessionError::InitPending),
            InitState::Failed => Err(SessionError::InitFailed),
            InitState::Uninitialized => Err(SessionError::NotInitialized),
        }
    }
}

/// How the app identified itself in `init`.
#[derive(Clone, PartialEq, Eq)]
pub enum AppCredential {
    BranchKey(String),
    AppId(String),
}

impl AppCredential {
    /// Identifiers containing `key_` are branch keys; anything else is a
    /// legacy numeric app id.
    pub fn classify(identifier: &str) -> Self {
        if identifier.contains("key_") {
            AppCredential::BranchKey(identifier.to_string())
        } else {
            AppCredential::AppId(identifier.to_string())
        }
    }

    pub fn param_name(&self) -> &'static str {
        match self {
            AppCredential::BranchKey(_) => "branch_key",
            AppCredential::AppId(_) => "app_id",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            AppCredential::BranchKey(v) | AppCredential::AppId(v) => v,
        }
    }
}

impl std::fmt::Debug for AppCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({})",
            self.param_name(),
            core_runtime::logging::mask_credential(self.value())
        )
    }
}

/// Identifier fields normalised to strings when read from responses.
const ID_FIELDS: [&str; 4] = [
    "session_id",
    "identity_id",
    "device_fingerprint_id",
    "link_click_id",
];

/// String form of an id field; numbers are converted, falsy values dropped.
pub fn id_field(record: &Map<String, Value>, key: &str) -> Option<String> {
    match record.get(key) {
        Some(v) if is_falsy(v) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Rewrite numeric id fields in a response as strings.
pub fn normalize_ids(record: &mut Map<String, Value>) {
    for key in ID_FIELDS {
        if let Some(id) = id_field(record, key) {
            record.insert(key.to_string(), Value::String(id));
        }
    }
}

/// Make `referring_link` absolute and derive `click_id` from it when absent.
pub fn normalize_referring_link(record: &mut Map<String, Value>, link_service: &str) {
    let Some(link) = record
        .get("referring_link")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
    else {
        return;
    };

    let absolute = if link.starts_with("http") {
        link
    } else {
        format!("{}{}", link_service, link)
    };

    let has_click_id = record.get("click_id").map(|v| !is_falsy(v)).unwrap_or(false);
    if !has_click_id {
        if let Some(segment) = last_segment(&absolute) {
            record.insert("click_id".to_string(), Value::String(segment.to_string()));
        }
    }
    record.insert("referring_link".to_string(), Value::String(absolute));
}

/// Text after the final `/`.
pub fn last_segment(url: &str) -> Option<&str> {
    url.rsplit('/').next().filter(|s| !s.is_empty())
}

/// In-memory view of the current session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub init_state: InitState,
    pub credential: Option<AppCredential>,
    pub session_id: Option<String>,
    pub identity_id: Option<String>,
    pub device_fingerprint_id: Option<String>,
    pub link_click_id: Option<String>,
    pub session_link: Option<String>,
    pub identity: Option<String>,
}

impl Session {
    /// Take over the identifiers of an install, open or resumed record.
    pub fn adopt(&mut self, record: &Map<String, Value>) {
        self.session_id = id_field(record, "session_id");
        self.identity_id = id_field(record, "identity_id");
        self.device_fingerprint_id = id_field(record, "device_fingerprint_id");
        self.link_click_id = id_field(record, "link_click_id");
        self.session_link = text_field(record, "link");
        if let Some(identity) = text_field(record, "identity") {
            self.identity = Some(identity);
        }
    }

    /// Credential plus the ambient ids `resource` accepts, laid under the
    /// caller's own `params`. Caller values win unless they are null.
    pub fn request_params(
        &self,
        resource: &Resource,
        sdk: &str,
        mut params: Map<String, Value>,
    ) -> Map<String, Value> {
        let ambient = [
            ("session_id", self.session_id.as_deref()),
            ("identity_id", self.identity_id.as_deref()),
            ("device_fingerprint_id", self.device_fingerprint_id.as_deref()),
            ("link_click_id", self.link_click_id.as_deref()),
            ("sdk", Some(sdk)),
        ];

        for (field, value) in ambient {
            let Some(value) = value else { continue };
            if !resource.accepts(field) {
                continue;
            }
            let caller_set = params.get(field).map(|v| !v.is_null()).unwrap_or(false);
            if !caller_set {
                params.insert(field.to_string(), Value::String(value.to_string()));
            }
        }

        if let Some(credential) = &self.credential {
            params.insert(
                credential.param_name().to_string(),
                Value::String(credential.value().to_string()),
            );
        }

        params
    }
}

fn text_field(record: &Map<String, Value>, key: &str) -> Option<String> {
    match record.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Public subset of a session record.
///
/// Always serializes exactly these five keys; unset ones are `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub data: Option<Value>,
    pub referring_identity: Option<Value>,
    pub identity: Option<Value>,
    pub has_app: Option<Value>,
    pub referring_link: Option<Value>,
}

impl SessionData {
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let pick = |key: &str| record.get(key).filter(|v| !is_falsy(v)).cloned();
        Self {
            data: pick("data"),
            referring_identity: pick("referring_identity"),
            identity: pick("identity"),
            has_app: pick("has_app"),
            referring_link: pick("referring_link"),
        }
    }

    /// `data` decoded from its JSON string form, when it is one.
    pub fn data_parsed(&self) -> Option<Value> {
        match &self.data {
            Some(Value::String(s)) => serde_json::from_str(s).ok(),
            Some(other) => Some(other.clone()),
            None => None,
        }
    }
}

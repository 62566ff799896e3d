//! URL and body assembly for a single resource call.

use bridge_traits::HttpMethod;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::error::{Result, TransportError};
use crate::resources::{Destination, Resource};
use crate::validation::is_branch_id;

fn branch_key_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"key_(live|test)_[A-Za-z0-9]{32}").expect("branch key regex must compile")
    })
}

/// Whether `value` looks like a live or test branch key.
pub fn is_branch_key(value: &str) -> bool {
    branch_key_regex().is_match(value)
}

/// Base URLs the resource destinations resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api: String,
    pub link_service: String,
}

impl Endpoints {
    pub fn new(api: impl Into<String>, link_service: impl Into<String>) -> Self {
        Self {
            api: api.into(),
            link_service: link_service.into(),
        }
    }

    pub fn base(&self, destination: Destination) -> &str {
        match destination {
            Destination::Api => &self.api,
            Destination::LinkService => &self.link_service,
        }
    }
}

/// Validated request, ready for either transport.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    /// Destination, endpoint and query parts; no query string.
    pub url: String,
    /// Serialized body bag.
    pub data: String,
    /// The caller's parameters, as handed to the fallback transport.
    pub payload: Map<String, Value>,
    pub destination: Destination,
}

impl PreparedRequest {
    /// URL including the query string for GET requests.
    pub fn target_url(&self) -> String {
        match self.method {
            HttpMethod::Get if !self.data.is_empty() => format!("{}?{}", self.url, self.data),
            _ => self.url.clone(),
        }
    }

    /// Form body for POST requests.
    pub fn form_body(&self) -> Option<&str> {
        match self.method {
            HttpMethod::Post => Some(&self.data),
            HttpMethod::Get => None,
        }
    }
}

fn is_collected(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Validate `params` against `resource` and build the outgoing request.
///
/// Query parts are checked first, then params, both in table order; the
/// first failure is returned and nothing is built.
pub fn build_request(
    resource: &Resource,
    params: &Map<String, Value>,
    endpoints: &Endpoints,
) -> Result<PreparedRequest> {
    let label = resource.label();
    let mut url = format!(
        "{}{}",
        endpoints.base(resource.destination),
        resource.endpoint
    );

    for (name, validator) in resource.query_part {
        let value = params.get(*name);
        validator.validate(label, name, value)?;
        url.push('/');
        url.push_str(&raw_value(value.unwrap_or(&Value::Null)));
    }

    let mut bag: Vec<(String, Value)> = Vec::with_capacity(resource.params.len() + 1);
    for (name, validator) in resource.params {
        let value = params.get(*name);
        validator.validate(label, name, value)?;
        if let Some(v) = value.filter(|v| is_collected(v)) {
            bag.push(((*name).to_string(), v.clone()));
        }
    }

    if resource.method == HttpMethod::Post {
        bag.push(credential(label, params)?);
    }

    Ok(PreparedRequest {
        method: resource.method,
        url,
        data: serialize_params(&bag),
        payload: params.clone(),
        destination: resource.destination,
    })
}

fn credential(label: &str, params: &Map<String, Value>) -> Result<(String, Value)> {
    let branch_key = params.get("branch_key").and_then(Value::as_str);
    if let Some(key) = branch_key.filter(|k| is_branch_key(k)) {
        return Ok(("branch_key".to_string(), Value::String(key.to_string())));
    }

    let app_id = params.get("app_id").and_then(Value::as_str);
    if let Some(id) = app_id.filter(|id| is_branch_id(id)) {
        return Ok(("app_id".to_string(), Value::String(id.to_string())));
    }

    Err(TransportError::Validation(format!(
        "API request {} missing parameter branch_key or app_id",
        label
    )))
}

/// Text form of a scalar; strings are not quoted.
fn raw_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Encode a parameter bag as `key=value` pairs joined by `&`.
///
/// Nested objects flatten to dotted keys (`metadata.color=red`); arrays
/// repeat their key once per element.
pub fn serialize_params(bag: &[(String, Value)]) -> String {
    let mut pairs = Vec::new();
    for (key, value) in bag {
        push_pairs(&mut pairs, key, value);
    }
    pairs.join("&")
}

fn push_pairs(pairs: &mut Vec<String>, key: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (sub, nested) in map {
                let path = if key.is_empty() {
                    sub.clone()
                } else {
                    format!("{}.{}", key, sub)
                };
                push_pairs(pairs, &path, nested);
            }
        }
        Value::Array(items) => {
            for item in items {
                pairs.push(format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(&raw_value(item))
                ));
            }
        }
        scalar => pairs.push(format!(
            "{}={}",
            urlencoding::encode(key),
            urlencoding::encode(&raw_value(scalar))
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources;
    use serde_json::json;

    const KEY: &str = "key_live_abcdefghijklmnopqrstuvwxyz012345";
    const ID: &str = "123456789012345";

    fn endpoints() -> Endpoints {
        Endpoints::new("https://api.branch.io", "https://bnc.lt")
    }

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_branch_key_pattern() {
        assert!(is_branch_key(KEY));
        assert!(is_branch_key("key_test_ABCDEFGHIJKLMNOPQRSTUVWXYZ012345"));
        assert!(!is_branch_key("key_prod_abcdefghijklmnopqrstuvwxyz012345"));
        assert!(!is_branch_key("key_live_short"));
    }

    #[test]
    fn test_get_with_query_part() {
        let request = build_request(
            &resources::CREDITS,
            &params(json!({
                "identity_id": ID,
                "session_id": ID,
                "device_fingerprint_id": ID,
                "sdk": "rust0.1.0",
                "branch_key": KEY,
            })),
            &endpoints(),
        )
        .unwrap();

        assert_eq!(request.url, format!("https://api.branch.io/v1/credits/{}", ID));
        assert_eq!(
            request.data,
            format!(
                "session_id={id}&identity_id={id}&device_fingerprint_id={id}&sdk=rust0.1.0",
                id = ID
            )
        );
        assert_eq!(request.target_url(), format!("{}?{}", request.url, request.data));
        assert!(request.form_body().is_none());
    }

    #[test]
    fn test_post_appends_credential_last() {
        let request = build_request(
            &resources::EVENT,
            &params(json!({
                "event": "purchase",
                "metadata": {"color": "red", "size": 2},
                "session_id": ID,
                "identity_id": ID,
                "device_fingerprint_id": ID,
                "sdk": "rust0.1.0",
                "branch_key": KEY,
            })),
            &endpoints(),
        )
        .unwrap();

        assert_eq!(request.url, "https://api.branch.io/v1/event");
        assert!(request.data.starts_with("event=purchase&metadata.color=red&metadata.size=2"));
        assert!(request.data.ends_with(&format!("branch_key={}", KEY)));
        assert_eq!(request.target_url(), request.url);
        assert_eq!(request.form_body(), Some(request.data.as_str()));
    }

    #[test]
    fn test_app_id_used_when_no_branch_key() {
        let request = build_request(
            &resources::INSTALL,
            &params(json!({"app_id": "98765432109876543"})),
            &endpoints(),
        )
        .unwrap();
        assert_eq!(request.data, "app_id=98765432109876543");
    }

    #[test]
    fn test_post_without_credential_fails() {
        let err = build_request(
            &resources::INSTALL,
            &params(json!({"branch_key": "nope", "app_id": "12"})),
            &endpoints(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "API request /v1/install missing parameter branch_key or app_id"
        );
    }

    #[test]
    fn test_get_does_not_need_credential() {
        let request = build_request(
            &resources::BROWSER_FINGERPRINT,
            &params(json!({"sdk": "rust0.1.0"})),
            &endpoints(),
        )
        .unwrap();
        assert_eq!(request.url, "https://bnc.lt/_r");
        assert_eq!(request.target_url(), "https://bnc.lt/_r?sdk=rust0.1.0");
    }

    #[test]
    fn test_query_part_validated_before_params() {
        let err = build_request(
            &resources::APPLY_CODE,
            &params(json!({"branch_key": KEY})),
            &endpoints(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransportError::Validation("API request /v1/applycode missing parameter code".into())
        );
    }

    #[test]
    fn test_false_is_collected_empty_string_is_not() {
        let request = build_request(
            &resources::INSTALL,
            &params(json!({
                "has_nfc": false,
                "carrier": "",
                "screen_dpi": 0,
                "branch_key": KEY,
            })),
            &endpoints(),
        )
        .unwrap();
        assert_eq!(
            request.data,
            format!("has_nfc=false&screen_dpi=0&branch_key={}", KEY)
        );
    }

    #[test]
    fn test_unknown_params_are_dropped() {
        let request = build_request(
            &resources::INSTALL,
            &params(json!({"session_id": ID, "branch_key": KEY})),
            &endpoints(),
        )
        .unwrap();
        assert!(!request.data.contains("session_id"));
    }

    #[test]
    fn test_serialize_arrays_and_encoding() {
        let bag = vec![
            ("tags".to_string(), json!(["a b", "c&d"])),
            ("data".to_string(), json!("{\"k\":1}")),
        ];
        assert_eq!(
            serialize_params(&bag),
            "tags=a%20b&tags=c%26d&data=%7B%22k%22%3A1%7D"
        );
    }

    #[test]
    fn test_link_click_path() {
        let request = build_request(
            &resources::LINK_CLICK,
            &params(json!({"link_url": "l/abc123", "click": "click"})),
            &endpoints(),
        )
        .unwrap();
        assert_eq!(request.target_url(), "https://bnc.lt/l/abc123?click=click");
    }
}

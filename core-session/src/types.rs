//! Argument and result types of the public client operations.

use core_transport::TransportError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitOptions {
    /// Whether this session may be attributed to a referring link.
    pub is_referrable: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            is_referrable: true,
        }
    }
}

/// Deep link description for [`link`](crate::BranchClient::link) and
/// [`send_sms`](crate::BranchClient::send_sms).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkData {
    pub tags: Vec<String>,
    pub feature: Option<String>,
    pub channel: Option<String>,
    pub stage: Option<String>,
    pub alias: Option<String>,
    #[serde(rename = "type")]
    pub link_type: Option<i64>,
    /// Arbitrary key/value payload; must be a JSON object when set.
    pub data: Option<Value>,
}

impl LinkData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Request parameters for the link resource. `data` travels as a JSON
    /// string and defaults to `{}`.
    pub fn to_params(&self) -> Result<Map<String, Value>, TransportError> {
        let data = self
            .data
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()));
        if !data.is_object() {
            return Err(TransportError::Validation(
                "API request /v1/url, parameter data is not an object".to_string(),
            ));
        }

        let mut params = Map::new();
        params.insert("data".into(), Value::String(data.to_string()));
        if !self.tags.is_empty() {
            params.insert("tags".into(), Value::from(self.tags.clone()));
        }
        let text = [
            ("feature", &self.feature),
            ("channel", &self.channel),
            ("stage", &self.stage),
            ("alias", &self.alias),
        ];
        for (key, value) in text {
            if let Some(v) = value {
                params.insert(key.into(), Value::String(v.clone()));
            }
        }
        if let Some(link_type) = self.link_type {
            params.insert("type".into(), Value::from(link_type));
        }
        Ok(params)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsOptions {
    /// Create a fresh link even when a referring link is known.
    pub make_new_link: bool,
}

/// Filters for [`credit_history`](crate::BranchClient::credit_history).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditHistoryQuery {
    pub link_click_id: Option<String>,
    pub length: Option<i64>,
    pub direction: Option<i64>,
    pub begin_after_id: Option<String>,
    pub bucket: Option<String>,
}

impl CreditHistoryQuery {
    pub fn to_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        if let Some(v) = &self.link_click_id {
            params.insert("link_click_id".into(), Value::String(v.clone()));
        }
        if let Some(v) = self.length {
            params.insert("length".into(), Value::from(v));
        }
        if let Some(v) = self.direction {
            params.insert("direction".into(), Value::from(v));
        }
        if let Some(v) = &self.begin_after_id {
            params.insert("begin_after_id".into(), Value::String(v.clone()));
        }
        if let Some(v) = &self.bucket {
            params.insert("bucket".into(), Value::String(v.clone()));
        }
        params
    }
}

/// Referral code request. `type` and `creation_type` are fixed by the
/// client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralCodeRequest {
    pub prefix: Option<String>,
    pub amount: i64,
    pub expiration: Option<String>,
    pub calculation_type: i64,
    pub location: i64,
    pub bucket: Option<String>,
}

impl ReferralCodeRequest {
    pub fn to_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        if let Some(v) = &self.prefix {
            params.insert("prefix".into(), Value::String(v.clone()));
        }
        params.insert("amount".into(), Value::from(self.amount));
        if let Some(v) = &self.expiration {
            params.insert("expiration".into(), Value::String(v.clone()));
        }
        params.insert("calculation_type".into(), Value::from(self.calculation_type));
        params.insert("location".into(), Value::from(self.location));
        params.insert("type".into(), Value::from("credit"));
        params.insert("creation_type".into(), Value::from(2));
        if let Some(v) = &self.bucket {
            params.insert("bucket".into(), Value::String(v.clone()));
        }
        params
    }
}

/// Response of [`set_identity`](crate::BranchClient::set_identity).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityResult {
    pub identity_id: Option<String>,
    pub identity: Option<String>,
    pub link: Option<String>,
    /// `referring_data` decoded from its JSON string form.
    pub referring_data: Option<Value>,
    /// The full response.
    pub raw: Map<String, Value>,
}

impl IdentityResult {
    pub fn from_response(raw: Map<String, Value>) -> Self {
        let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);
        let referring_data = match raw.get("referring_data") {
            Some(Value::String(s)) if !s.is_empty() => serde_json::from_str(s).ok(),
            _ => None,
        };
        Self {
            identity_id: crate::state::id_field(&raw, "identity_id"),
            identity: text("identity"),
            link: text("link"),
            referring_data,
            raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_link_params() {
        let params = LinkData::new()
            .with_channel("facebook")
            .with_tag("a")
            .with_tag("b")
            .with_data(json!({"foo": "bar"}))
            .to_params()
            .unwrap();

        assert_eq!(params["data"], json!("{\"foo\":\"bar\"}"));
        assert_eq!(params["tags"], json!(["a", "b"]));
        assert_eq!(params["channel"], json!("facebook"));
        assert!(!params.contains_key("feature"));
    }

    #[test]
    fn test_link_data_defaults_to_empty_object() {
        let params = LinkData::new().to_params().unwrap();
        assert_eq!(params["data"], json!("{}"));
    }

    #[test]
    fn test_link_data_must_be_object() {
        let err = LinkData::new()
            .with_data(json!("plain"))
            .to_params()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "API request /v1/url, parameter data is not an object"
        );

        assert!(LinkData::new().with_data(json!([1])).to_params().is_err());
    }

    #[test]
    fn test_referral_code_forces_type() {
        let params = ReferralCodeRequest {
            amount: 10,
            calculation_type: 1,
            location: 0,
            ..Default::default()
        }
        .to_params();
        assert_eq!(params["type"], json!("credit"));
        assert_eq!(params["creation_type"], json!(2));
        assert_eq!(params["location"], json!(0));
    }

    #[test]
    fn test_identity_result() {
        let raw = match json!({
            "identity_id": 123456789012345u64,
            "identity": "user",
            "link": "https://bnc.lt/i/x",
            "referring_data": "{\"k\":true}",
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let result = IdentityResult::from_response(raw);
        assert_eq!(result.identity_id.as_deref(), Some("123456789012345"));
        assert_eq!(result.referring_data, Some(json!({"k": true})));
    }
}

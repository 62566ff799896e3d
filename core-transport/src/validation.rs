//! Parameter validators for resource descriptors.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::error::TransportError;

/// Server-issued numeric identifier (session, identity, fingerprint, click).
fn branch_id_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| Regex::new(r"^[0-9]{15,20}$").expect("branch id regex must compile"))
}

/// Whether `value` looks like a server-issued id.
pub fn is_branch_id(value: &str) -> bool {
    branch_id_regex().is_match(value)
}

/// Accepted shape of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// JSON object or array
    Object,
    Str,
    Num,
    Arr,
    Bool,
    /// String of 15 to 20 digits
    BranchId,
}

impl ParamType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::Object => value.is_object() || value.is_array(),
            ParamType::Str => value.is_string(),
            ParamType::Num => value.is_number(),
            ParamType::Arr => value.is_array(),
            ParamType::Bool => value.is_boolean(),
            ParamType::BranchId => value.as_str().map(is_branch_id).unwrap_or(false),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            ParamType::Object => "an object",
            ParamType::Str => "a string",
            ParamType::Num => "a number",
            ParamType::Arr => "an array",
            ParamType::Bool => "a boolean",
            ParamType::BranchId => "in the proper format",
        }
    }
}

/// Requirement attached to one parameter of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    Required(ParamType),
    Optional(ParamType),
}

/// A value counts as absent when missing, `null`, `""` or `false`.
/// Numbers, including zero, are always present.
pub fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Bool(b)) => !b,
        Some(_) => false,
    }
}

impl Validator {
    pub fn param_type(&self) -> ParamType {
        match self {
            Validator::Required(t) | Validator::Optional(t) => *t,
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Validator::Required(_))
    }

    /// Check `value` for parameter `param` of `endpoint`.
    pub fn validate(
        &self,
        endpoint: &str,
        param: &str,
        value: Option<&Value>,
    ) -> Result<(), TransportError> {
        if is_absent(value) {
            if self.is_required() {
                return Err(TransportError::Validation(format!(
                    "API request {} missing parameter {}",
                    endpoint, param
                )));
            }
            return Ok(());
        }

        let param_type = self.param_type();
        match value {
            Some(v) if param_type.accepts(v) => Ok(()),
            _ => Err(TransportError::Validation(format!(
                "API request {}, parameter {} is not {}",
                endpoint,
                param,
                param_type.describe()
            ))),
        }
    }
}

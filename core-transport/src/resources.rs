//! Static descriptors for every API resource the client can call.
//!
//! Parameter tables are ordered: validation runs and request bodies are
//! assembled in table order.

use bridge_traits::HttpMethod;

use crate::validation::{ParamType, Validator};

/// Which base URL a resource lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Api,
    LinkService,
}

/// One named parameter and its requirement.
pub type Param = (&'static str, Validator);

/// Immutable description of a remote resource.
#[derive(Debug)]
pub struct Resource {
    pub name: &'static str,
    pub destination: Destination,
    pub endpoint: &'static str,
    pub method: HttpMethod,
    /// Always sent through the fallback transport.
    pub fallback_only: bool,
    /// Appended to the path as `/{value}`, in order.
    pub query_part: &'static [Param],
    pub params: &'static [Param],
}

impl Resource {
    /// True when `field` is one of this resource's params or query parts.
    pub fn accepts(&self, field: &str) -> bool {
        self.query_part
            .iter()
            .chain(self.params.iter())
            .any(|(name, _)| *name == field)
    }

    /// Label used in validation messages.
    pub fn label(&self) -> &'static str {
        if self.endpoint.is_empty() {
            self.name
        } else {
            self.endpoint
        }
    }
}

const REQ_STR: Validator = Validator::Required(ParamType::Str);
const REQ_NUM: Validator = Validator::Required(ParamType::Num);
const REQ_OBJ: Validator = Validator::Required(ParamType::Object);
const REQ_ID: Validator = Validator::Required(ParamType::BranchId);
const OPT_STR: Validator = Validator::Optional(ParamType::Str);
const OPT_NUM: Validator = Validator::Optional(ParamType::Num);
const OPT_BOOL: Validator = Validator::Optional(ParamType::Bool);
const OPT_ARR: Validator = Validator::Optional(ParamType::Arr);
const OPT_ID: Validator = Validator::Optional(ParamType::BranchId);

pub static INSTALL: Resource = Resource {
    name: "install",
    destination: Destination::Api,
    endpoint: "/v1/install",
    method: HttpMethod::Post,
    fallback_only: false,
    query_part: &[],
    params: &[
        ("link_identifier", OPT_STR),
        ("sdk", OPT_STR),
        ("hardware_id", OPT_STR),
        ("is_hardware_id_real", OPT_BOOL),
        ("app_version", OPT_STR),
        ("carrier", OPT_STR),
        ("bluetooth", OPT_BOOL),
        ("bluetooth_version", OPT_STR),
        ("has_nfc", OPT_BOOL),
        ("has_telephone", OPT_BOOL),
        ("brand", OPT_STR),
        ("model", OPT_STR),
        ("os", OPT_STR),
        ("uri_scheme", OPT_STR),
        ("os_version", OPT_STR),
        ("screen_dpi", OPT_NUM),
        ("screen_width", OPT_NUM),
        ("screen_height", OPT_NUM),
        ("is_referrable", OPT_NUM),
        ("update", OPT_NUM),
        ("add_tracking_enabled", OPT_BOOL),
    ],
};

pub static OPEN: Resource = Resource {
    name: "open",
    destination: Destination::Api,
    endpoint: "/v1/open",
    method: HttpMethod::Post,
    fallback_only: false,
    query_part: &[],
    params: &[
        ("identity_id", REQ_ID),
        ("link_identifier", OPT_STR),
        ("device_fingerprint_id", REQ_ID),
        ("sdk", OPT_STR),
        ("hardware_id", OPT_STR),
        ("is_hardware_id_real", OPT_BOOL),
        ("app_version", OPT_STR),
        ("os", OPT_STR),
        ("uri_scheme", OPT_STR),
        ("os_version", OPT_STR),
        ("is_referrable", OPT_NUM),
    ],
};

pub static CLOSE: Resource = Resource {
    name: "close",
    destination: Destination::Api,
    endpoint: "/v1/close",
    method: HttpMethod::Post,
    fallback_only: false,
    query_part: &[],
    params: &[
        ("identity_id", REQ_ID),
        ("sdk", REQ_STR),
        ("session_id", REQ_ID),
        ("link_click_id", OPT_ID),
        ("device_fingerprint_id", REQ_ID),
    ],
};

pub static PROFILE: Resource = Resource {
    name: "profile",
    destination: Destination::Api,
    endpoint: "/v1/profile",
    method: HttpMethod::Post,
    fallback_only: false,
    query_part: &[],
    params: &[
        ("identity_id", REQ_ID),
        ("identity", REQ_STR),
        ("session_id", REQ_ID),
        ("device_fingerprint_id", REQ_ID),
        ("sdk", REQ_STR),
    ],
};

pub static LOGOUT: Resource = Resource {
    name: "logout",
    destination: Destination::Api,
    endpoint: "/v1/logout",
    method: HttpMethod::Post,
    fallback_only: false,
    query_part: &[],
    params: &[
        ("session_id", REQ_ID),
        ("identity_id", REQ_ID),
        ("device_fingerprint_id", REQ_ID),
        ("sdk", REQ_STR),
    ],
};

pub static EVENT: Resource = Resource {
    name: "event",
    destination: Destination::Api,
    endpoint: "/v1/event",
    method: HttpMethod::Post,
    fallback_only: false,
    query_part: &[],
    params: &[
        ("event", REQ_STR),
        ("metadata", REQ_OBJ),
        ("session_id", REQ_ID),
        ("identity_id", REQ_ID),
        ("device_fingerprint_id", REQ_ID),
        ("sdk", REQ_STR),
    ],
};

pub static LINK: Resource = Resource {
    name: "link",
    destination: Destination::Api,
    endpoint: "/v1/url",
    method: HttpMethod::Post,
    fallback_only: false,
    query_part: &[],
    params: &[
        ("identity_id", REQ_ID),
        ("data", OPT_STR),
        ("tags", OPT_ARR),
        ("feature", OPT_STR),
        ("channel", OPT_STR),
        ("stage", OPT_STR),
        ("type", OPT_NUM),
        ("alias", OPT_STR),
        ("session_id", REQ_ID),
        ("device_fingerprint_id", REQ_ID),
        ("sdk", REQ_STR),
    ],
};

pub static LINK_CLICK: Resource = Resource {
    name: "link_click",
    destination: Destination::LinkService,
    endpoint: "",
    method: HttpMethod::Get,
    fallback_only: false,
    query_part: &[("link_url", REQ_STR)],
    params: &[("click", REQ_STR)],
};

pub static SMS_LINK_SEND: Resource = Resource {
    name: "sms_link_send",
    destination: Destination::LinkService,
    endpoint: "/c",
    method: HttpMethod::Post,
    fallback_only: false,
    query_part: &[("link_url", REQ_STR)],
    params: &[("sdk", OPT_STR), ("phone", REQ_STR)],
};

pub static REFERRALS: Resource = Resource {
    name: "referrals",
    destination: Destination::Api,
    endpoint: "/v1/referrals",
    method: HttpMethod::Get,
    fallback_only: false,
    query_part: &[("identity_id", REQ_ID)],
    params: &[
        ("session_id", REQ_ID),
        ("identity_id", REQ_ID),
        ("device_fingerprint_id", REQ_ID),
        ("sdk", REQ_STR),
    ],
};

pub static GET_CODE: Resource = Resource {
    name: "get_code",
    destination: Destination::Api,
    endpoint: "/v1/referralcode",
    method: HttpMethod::Post,
    fallback_only: false,
    query_part: &[],
    params: &[
        ("prefix", OPT_STR),
        ("amount", REQ_NUM),
        ("expiration", OPT_STR),
        ("calculation_type", REQ_NUM),
        ("location", REQ_NUM),
        ("creation_type", REQ_NUM),
        ("type", REQ_STR),
        ("bucket", OPT_STR),
        ("session_id", REQ_ID),
        ("identity_id", REQ_ID),
        ("device_fingerprint_id", REQ_ID),
        ("sdk", REQ_STR),
    ],
};

pub static VALIDATE_CODE: Resource = Resource {
    name: "validate_code",
    destination: Destination::Api,
    endpoint: "/v1/referralcode",
    method: HttpMethod::Post,
    fallback_only: false,
    query_part: &[("code", REQ_STR)],
    params: &[
        ("session_id", REQ_ID),
        ("identity_id", REQ_ID),
        ("device_fingerprint_id", REQ_ID),
        ("sdk", REQ_STR),
    ],
};

pub static APPLY_CODE: Resource = Resource {
    name: "apply_code",
    destination: Destination::Api,
    endpoint: "/v1/applycode",
    method: HttpMethod::Post,
    fallback_only: false,
    query_part: &[("code", REQ_STR)],
    params: &[
        ("session_id", REQ_ID),
        ("identity_id", REQ_ID),
        ("device_fingerprint_id", REQ_ID),
        ("sdk", REQ_STR),
    ],
};

pub static CREDITS: Resource = Resource {
    name: "credits",
    destination: Destination::Api,
    endpoint: "/v1/credits",
    method: HttpMethod::Get,
    fallback_only: false,
    query_part: &[("identity_id", REQ_ID)],
    params: &[
        ("session_id", REQ_ID),
        ("identity_id", REQ_ID),
        ("device_fingerprint_id", REQ_ID),
        ("sdk", REQ_STR),
    ],
};

pub static CREDIT_HISTORY: Resource = Resource {
    name: "credit_history",
    destination: Destination::Api,
    endpoint: "/v1/credithistory",
    method: HttpMethod::Get,
    fallback_only: false,
    query_part: &[],
    params: &[
        ("link_click_id", OPT_ID),
        ("length", OPT_NUM),
        ("direction", OPT_NUM),
        ("begin_after_id", OPT_ID),
        ("bucket", OPT_STR),
        ("session_id", REQ_ID),
        ("identity_id", REQ_ID),
        ("device_fingerprint_id", REQ_ID),
        ("sdk", REQ_STR),
    ],
};

pub static REDEEM: Resource = Resource {
    name: "redeem",
    destination: Destination::Api,
    endpoint: "/v1/redeem",
    method: HttpMethod::Post,
    fallback_only: false,
    query_part: &[],
    params: &[
        ("identity_id", REQ_ID),
        ("amount", REQ_NUM),
        ("bucket", OPT_STR),
        ("session_id", REQ_ID),
        ("device_fingerprint_id", REQ_ID),
        ("sdk", REQ_STR),
    ],
};

/// Browser fingerprint lookup on the link service; only reachable through
/// the fallback transport.
pub static BROWSER_FINGERPRINT: Resource = Resource {
    name: "browser_fingerprint",
    destination: Destination::LinkService,
    endpoint: "/_r",
    method: HttpMethod::Get,
    fallback_only: true,
    query_part: &[],
    params: &[("sdk", REQ_STR)],
};

static ALL: [&Resource; 17] = [
    &INSTALL,
    &OPEN,
    &CLOSE,
    &PROFILE,
    &LOGOUT,
    &EVENT,
    &LINK,
    &LINK_CLICK,
    &SMS_LINK_SEND,
    &REFERRALS,
    &GET_CODE,
    &VALIDATE_CODE,
    &APPLY_CODE,
    &CREDITS,
    &CREDIT_HISTORY,
    &REDEEM,
    &BROWSER_FINGERPRINT,
];

/// Every known resource.
pub fn all() -> &'static [&'static Resource] {
    &ALL
}

/// Find a resource by name.
pub fn lookup(name: &str) -> Option<&'static Resource> {
    ALL.iter().copied().find(|r| r.name == name)
}

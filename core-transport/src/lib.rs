//! # Core Transport
//!
//! Request plumbing for the Branch API: a static table of resource
//! descriptors, parameter validation, URL and form body assembly, and a
//! [`Transport`] that sends calls over the host `HttpClient` with a fixed
//! retry policy.
//!
//! When the primary client reports `BridgeError::NotAvailable` the transport
//! switches, for the rest of its lifetime, to a padded-callback fallback that
//! carries every call as a GET.
//!
//! ```ignore
//! use core_transport::{resources, Transport};
//!
//! let transport = Transport::from_config(&config);
//! let credits = transport.request(&resources::CREDITS, &params).await?;
//! ```

pub mod error;
pub mod fallback;
pub mod request;
pub mod resources;
pub mod retry;
pub mod transport;
pub mod validation;

pub use error::{Result, TransportError};
pub use fallback::FallbackTransport;
pub use request::{build_request, is_branch_key, serialize_params, Endpoints, PreparedRequest};
pub use resources::{Destination, Resource};
pub use retry::RetryPolicy;
pub use transport::Transport;
pub use validation::{is_branch_id, ParamType, Validator};

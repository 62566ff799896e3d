//! # Core Session
//!
//! The Branch session client: a serial task queue, session records kept in
//! host key-value stores, the `Uninitialized -> Pending -> Succeeded/Failed`
//! state machine, and [`BranchClient`], which exposes every public operation
//! as a queued future.
//!
//! Operations other than `init`, `data` and `first` require a live session
//! and fail immediately with [`SessionError::NotInitialized`] (or
//! `InitPending`/`InitFailed`) without touching the network.

pub mod call;
pub mod client;
pub mod error;
pub mod queue;
pub mod state;
pub mod storage;
pub mod types;

pub use call::QueuedCall;
pub use client::BranchClient;
pub use error::{Result, SessionError};
pub use queue::{Done, SerialQueue};
pub use state::{AppCredential, InitState, SessionData};
pub use storage::{SessionStorage, SESSION_KEY};
pub use types::{
    CreditHistoryQuery, IdentityResult, InitOptions, LinkData, ReferralCodeRequest, SmsOptions,
};

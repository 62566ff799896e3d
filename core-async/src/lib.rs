//! Runtime-agnostic async abstraction layer for the Branch SDK.
//!
//! All core-* and bridge-* crates depend on this crate instead of reaching
//! into Tokio directly for spawning, timers, and synchronization. Keeping the
//! executor behind one seam means the session queue and the transport never
//! name a runtime type in their public APIs.
//!
//! # Modules
//!
//! - `task`: Task spawning
//! - `time`: Sleep, timeout, duration, instant
//! - `sync`: Async-aware synchronization primitives and channels
//! - `runtime`: Handles and blocking entry points
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};

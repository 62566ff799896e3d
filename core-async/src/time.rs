//! Time-related abstractions.
//!
//! Timers integrate with Tokio's timer wheel, so tests running under a paused
//! clock (`start_paused = true`) observe `sleep` and `timeout` advancing
//! deterministically.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_millis(200)).await;
//!     println!("Took {:?}", start.elapsed());
//! }
//! ```

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};
pub use tokio::time::{error::Elapsed, sleep, timeout, Instant};

/// Returns the current time as milliseconds since UNIX_EPOCH.
///
/// A clock set before the epoch reports `0`.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

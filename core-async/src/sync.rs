//! Synchronization primitives.
//!
//! All primitives are `Send + Sync` and async-aware; holding one of these
//! guards across an `.await` never blocks the executor.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{oneshot, Mutex};
//!
//! async fn example() {
//!     let mutex = Mutex::new(42);
//!     *mutex.lock().await += 1;
//!
//!     let (tx, rx) = oneshot::channel();
//!     tx.send(7).unwrap();
//!     assert_eq!(rx.await.unwrap(), 7);
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

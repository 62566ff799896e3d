//! Desktop lifecycle observer

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    lifecycle::{LifecycleChangeStream, LifecycleObserver, LifecycleState},
};
use core_async::sync::watch;
use tracing::debug;

/// Desktop lifecycle observer.
///
/// Desktop processes have no OS-driven background state, so the observer
/// starts in `Foreground` and only changes when the host application calls
/// [`set_state`](Self::set_state) (e.g. on window minimise or before exit).
pub struct DesktopLifecycleObserver {
    state: watch::Sender<LifecycleState>,
}

impl DesktopLifecycleObserver {
    /// Create a new lifecycle observer.
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Foreground);
        Self { state }
    }

    /// Report a lifecycle transition from the host application.
    pub fn set_state(&self, state: LifecycleState) {
        debug!(?state, "Lifecycle state changed");
        self.state.send_replace(state);
    }
}

impl Default for DesktopLifecycleObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LifecycleObserver for DesktopLifecycleObserver {
    async fn get_state(&self) -> Result<LifecycleState> {
        Ok(*self.state.borrow())
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn LifecycleChangeStream>> {
        let mut receiver = self.state.subscribe();
        receiver.mark_unchanged();
        Ok(Box::new(DesktopLifecycleChangeStream { receiver }))
    }
}

struct DesktopLifecycleChangeStream {
    receiver: watch::Receiver<LifecycleState>,
}

#[async_trait]
impl LifecycleChangeStream for DesktopLifecycleChangeStream {
    async fn next(&mut self) -> Option<LifecycleState> {
        self.receiver.changed().await.ok()?;
        let state = *self.receiver.borrow_and_update();
        Some(state)
    }
}

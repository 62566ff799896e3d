use core_async::sync::oneshot;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::{Result, SessionError};

/// Pending result of a public client operation.
///
/// The work is queued when the operation is called, not when this future is
/// first polled, so dropping it does not withdraw the work.
#[must_use = "the operation is already queued; await the call to observe its result"]
pub struct QueuedCall<T> {
    state: CallState<T>,
}

enum CallState<T> {
    Ready(Option<Result<T>>),
    Waiting(oneshot::Receiver<Result<T>>),
}

impl<T> QueuedCall<T> {
    /// A call that failed before anything was queued.
    pub fn failed(error: SessionError) -> Self {
        Self {
            state: CallState::Ready(Some(Err(error))),
        }
    }

    pub(crate) fn waiting(receiver: oneshot::Receiver<Result<T>>) -> Self {
        Self {
            state: CallState::Waiting(receiver),
        }
    }
}

// No field is ever pinned structurally.
impl<T> Unpin for QueuedCall<T> {}

impl<T> Future for QueuedCall<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            CallState::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(SessionError::TaskAbandoned)))
            }
            CallState::Waiting(receiver) => Pin::new(receiver)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(SessionError::TaskAbandoned))),
        }
    }
}

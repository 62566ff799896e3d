//! # Serial Task Queue
//!
//! FIFO gate that lets exactly one task body run at a time. A task holds a
//! [`Done`] token and leaves the queue when it calls [`Done::done`] or drops
//! the token; the next task is started at that point.
//!
//! There is no queue-level timeout or cancellation. A task that never
//! finishes keeps every later task waiting.
//!
//! Tasks are spawned on the `core-async` runtime, so [`SerialQueue::enqueue`]
//! must be called from within it.

use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Job = Box<dyn FnOnce(Done) -> BoxFuture<'static, ()> + Send>;

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Job>,
    running: bool,
}

#[derive(Clone, Default)]
pub struct SerialQueue {
    state: Arc<Mutex<QueueState>>,
}

impl SerialQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a task. It starts immediately when the queue is idle.
    pub fn enqueue<F>(&self, job: F)
    where
        F: FnOnce(Done) -> BoxFuture<'static, ()> + Send + 'static,
    {
        let start = {
            let mut state = self.lock();
            if state.running {
                state.pending.push_back(Box::new(job));
                None
            } else {
                state.running = true;
                Some(Box::new(job) as Job)
            }
        };

        if let Some(job) = start {
            self.start(job);
        }
    }

    fn start(&self, job: Job) {
        let done = Done {
            queue: Some(self.clone()),
        };
        core_async::spawn(job(done));
    }

    fn advance(&self) {
        let next = {
            let mut state = self.lock();
            let next = state.pending.pop_front();
            if next.is_none() {
                state.running = false;
            }
            next
        };

        if let Some(job) = next {
            self.start(job);
        }
    }

    /// Running plus waiting tasks.
    pub fn len(&self) -> usize {
        let state = self.lock();
        state.pending.len() + usize::from(state.running)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_idle(&self) -> bool {
        !self.lock().running
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SerialQueue")
            .field("running", &state.running)
            .field("pending", &state.pending.len())
            .finish()
    }
}

/// Completion token handed to every task.
pub struct Done {
    queue: Option<SerialQueue>,
}

impl Done {
    /// Remove the current task and start the next one.
    pub fn done(mut self) {
        if let Some(queue) = self.queue.take() {
            queue.advance();
        }
    }
}

impl Drop for Done {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.take() {
            queue.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_async::sync::oneshot;
    use core_async::time::{sleep, Duration};
    use futures::FutureExt;
    use std::sync::Mutex as StdMutex;

    #[tokio::test(start_paused = true)]
    async fn test_tasks_run_in_submission_order_without_overlap() {
        let queue = SerialQueue::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let (tx, rx) = oneshot::channel();

        // Later tasks are faster; order must still hold.
        for i in 0..3u64 {
            let log = log.clone();
            queue.enqueue(move |done| {
                async move {
                    log.lock().unwrap().push(format!("start {}", i));
                    sleep(Duration::from_millis(30 - i * 10)).await;
                    log.lock().unwrap().push(format!("end {}", i));
                    done.done();
                }
                .boxed()
            });
        }
        queue.enqueue(move |done| {
            async move {
                let _ = tx.send(());
                done.done();
            }
            .boxed()
        });

        assert_eq!(queue.len(), 4);
        rx.await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["start 0", "end 0", "start 1", "end 1", "start 2", "end 2"]
        );
    }

    #[tokio::test]
    async fn test_dropped_token_releases_queue() {
        let queue = SerialQueue::new();
        let (tx, rx) = oneshot::channel();

        queue.enqueue(|done| {
            drop(done);
            async {}.boxed()
        });
        queue.enqueue(move |done| {
            async move {
                let _ = tx.send(42);
                done.done();
            }
            .boxed()
        });

        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_queue_returns_to_idle() {
        let queue = SerialQueue::new();
        assert!(queue.is_idle());
        assert!(queue.is_empty());

        let (tx, rx) = oneshot::channel();
        queue.enqueue(move |done| {
            async move {
                done.done();
                let _ = tx.send(());
            }
            .boxed()
        });
        rx.await.unwrap();

        assert!(queue.is_idle());
        assert_eq!(queue.len(), 0);
    }
}

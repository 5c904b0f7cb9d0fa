//! Execution contexts
//!
//! - [`Dispatcher`]: spawns background work on a tokio runtime
//! - [`SerialQueue`]: runs jobs one at a time in submission order, the stand-in
//!   for a main-thread context
//! - [`PendingTasks`]: tracks fire-and-forget work so it can be awaited

use crate::error::EventError;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Handle for spawning work on a runtime
#[derive(Debug, Clone)]
pub struct Dispatcher {
    handle: Handle,
}

impl Dispatcher {
    /// Dispatcher for the runtime of the calling context
    ///
    /// # Errors
    /// [`EventError::NoRuntime`] outside of a tokio runtime
    pub fn current() -> Result<Self, EventError> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|err| EventError::NoRuntime(err.to_string()))
    }

    /// Dispatcher for an explicit runtime handle
    #[inline]
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawn `future` in the background
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

type Job = Box<dyn FnOnce() + Send>;

/// Ordered single-consumer job queue
#[derive(Clone)]
pub struct SerialQueue {
    label: Arc<str>,
    sender: mpsc::UnboundedSender<Job>,
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("label", &self.label)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl SerialQueue {
    /// Start a queue whose consumer runs on `dispatcher`
    #[must_use]
    pub fn spawn(label: impl Into<Arc<str>>, dispatcher: &Dispatcher) -> Self {
        let label = label.into();
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let consumer_label = Arc::clone(&label);
        dispatcher.spawn(async move {
            while let Some(job) = receiver.recv().await {
                job();
            }
            tracing::debug!(queue = %consumer_label, "serial queue stopped");
        });
        Self { label, sender }
    }

    /// Diagnostic label
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Enqueue `job` behind every previously dispatched job
    ///
    /// # Errors
    /// [`EventError::QueueClosed`] once the consumer has stopped
    pub fn dispatch<F>(&self, job: F) -> Result<(), EventError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .send(Box::new(job))
            .map_err(|_| EventError::QueueClosed(self.label.to_string()))
    }

    /// Wait until every job dispatched before this call has run
    ///
    /// # Errors
    /// [`EventError::QueueClosed`] once the consumer has stopped
    pub async fn flush(&self) -> Result<(), EventError> {
        let (done, finished) = oneshot::channel();
        self.dispatch(move || {
            let _ = done.send(());
        })?;
        finished
            .await
            .map_err(|_| EventError::QueueClosed(self.label.to_string()))
    }
}

/// Fire-and-forget tasks that can still be awaited
#[derive(Debug, Default)]
pub struct PendingTasks {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl PendingTasks {
    /// Create empty tracker
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `handle`
    pub fn push(&self, handle: JoinHandle<()>) {
        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }

    /// Number of tracked tasks not yet finished
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Await every tracked task, including tasks pushed while waiting
    pub async fn settle(&self) {
        loop {
            let batch = std::mem::take(&mut *self.handles.lock());
            if batch.is_empty() {
                return;
            }
            for handle in batch {
                if let Err(err) = handle.await {
                    tracing::warn!(error = %err, "pending task did not complete");
                }
            }
        }
    }
}

//! Serialization gate for the worker's shared inference resource.
//!
//! Two locks, two jobs. An init cell guarantees the expensive backend
//! handle is constructed exactly once no matter how many connection
//! handlers race to use it first; a separate call lock guarantees at most
//! one inference runs at a time, because the backing model is neither safe
//! nor useful to drive concurrently.
//!
//! The gate owns the resource outright - handlers reach it through shared
//! ownership of the gate, not through global state.

use crate::Result;
use std::future::Future;
use tokio::sync::{Mutex, OnceCell};

/// Init-once cell plus call-serializing lock around a resource of type `T`.
pub struct InferenceGate<T> {
    resource: OnceCell<T>,
    call_lock: Mutex<()>,
}

impl<T> InferenceGate<T> {
    pub fn new() -> Self {
        Self {
            resource: OnceCell::new(),
            call_lock: Mutex::new(()),
        }
    }

    /// Get the resource, constructing it with `init` if this is the first
    /// caller. Concurrent callers that race into construction wait for the
    /// winner; `init` runs at most once unless it fails, in which case the
    /// next caller retries.
    pub async fn get_or_init<F, Fut>(&self, init: F) -> Result<&T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.resource.get_or_try_init(init).await
    }

    /// Whether the resource has been constructed.
    pub fn initialized(&self) -> bool {
        self.resource.initialized()
    }

    /// Run one inference call while holding the call lock. Concurrent
    /// callers queue here; the lock spans the whole call.
    pub async fn serialized<F, Fut, R>(&self, call: F) -> R
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        let _guard = self.call_lock.lock().await;
        call().await
    }
}

impl<T> Default for InferenceGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

//! Handle table: owns every context and its executor task.
//!
//! The registry is plain owned state inside the service, not a global. It
//! exclusively owns each [`RequestContext`] together with the `JoinHandle`
//! of its executor; the destroy paths cancel and then await the executor
//! before an entry is dropped, so no background task ever outlives its
//! context or the service instance.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, warn};
use tokio::task::JoinHandle;

use crate::adapter::HttpClientAdapter;
use crate::context::{ContextHandle, RequestContext};
use crate::error::ServiceError;
use crate::executor;

/// First handle value handed out by a fresh (or cleared) registry.
const FIRST_HANDLE: u32 = 0;

struct ContextEntry {
    context: Arc<RequestContext>,
    /// Executor task for this context; present from start until the entry is
    /// destroyed. At most one executor is ever associated with a context.
    task: Option<JoinHandle<()>>,
}

/// Table of live request contexts, keyed by handle.
pub(crate) struct ContextRegistry {
    contexts: HashMap<ContextHandle, ContextEntry>,
    next_handle: u32,
}

impl ContextRegistry {
    pub fn new() -> Self {
        ContextRegistry {
            contexts: HashMap::new(),
            next_handle: FIRST_HANDLE,
        }
    }

    /// Allocates a fresh context. Handles are monotonic; the counter only
    /// rewinds when [`clear_all`](ContextRegistry::clear_all) empties the
    /// table.
    pub fn create(&mut self) -> Result<ContextHandle, ServiceError> {
        let handle = ContextHandle(self.next_handle);
        self.next_handle = self
            .next_handle
            .checked_add(1)
            .ok_or(ServiceError::ResourceExhausted)?;
        self.contexts.insert(
            handle,
            ContextEntry {
                context: Arc::new(RequestContext::new()),
                task: None,
            },
        );
        debug!("created context {handle}");
        Ok(handle)
    }

    /// Looks up a live context.
    pub fn get(&self, handle: ContextHandle) -> Result<&Arc<RequestContext>, ServiceError> {
        self.contexts
            .get(&handle)
            .map(|entry| &entry.context)
            .ok_or(ServiceError::InvalidHandle(handle))
    }

    /// Starts the request: snapshots the configuration, transitions the
    /// context to `InProgress`, and spawns its executor task.
    pub fn start(
        &mut self,
        handle: ContextHandle,
        adapter: HttpClientAdapter,
    ) -> Result<(), ServiceError> {
        let entry = self
            .contexts
            .get_mut(&handle)
            .ok_or(ServiceError::InvalidHandle(handle))?;
        let config = entry.context.begin()?;
        let context = Arc::clone(&entry.context);
        entry.task = Some(tokio::spawn(executor::run_request(context, adapter, config)));
        debug!("started request on context {handle}");
        Ok(())
    }

    /// Cancels, joins, and removes one context.
    ///
    /// Returns only after the executor (if any) has fully exited, so the
    /// context memory is never released under a running executor.
    pub async fn destroy(&mut self, handle: ContextHandle) -> Result<(), ServiceError> {
        let mut entry = self
            .contexts
            .remove(&handle)
            .ok_or(ServiceError::InvalidHandle(handle))?;
        entry.context.request_cancel();
        if let Some(task) = entry.task.take() {
            join_executor(handle, task).await;
        }
        debug!("destroyed context {handle}");
        Ok(())
    }

    /// Cancels every live context, joins every executor, then empties the
    /// table and resets handle allocation.
    ///
    /// Used at service shutdown and re-initialization (guest software
    /// restart) so that no background task outlives the service instance.
    /// Cancellation is raised on all contexts before the first join, letting
    /// the executors wind down in parallel.
    pub async fn clear_all(&mut self) {
        for entry in self.contexts.values() {
            entry.context.request_cancel();
        }

        let joins: Vec<_> = self
            .contexts
            .iter_mut()
            .filter_map(|(handle, entry)| {
                entry.task.take().map(|task| join_executor(*handle, task))
            })
            .collect();
        let joined = joins.len();
        join_all(joins).await;

        debug!("cleared {} contexts ({} executors joined)", self.contexts.len(), joined);
        self.contexts.clear();
        self.next_handle = FIRST_HANDLE;
    }
}

/// Awaits one executor. A panicked executor must not take the destroy path
/// down with it, so join errors are logged and swallowed.
async fn join_executor(handle: ContextHandle, task: JoinHandle<()>) {
    if let Err(err) = task.await {
        warn!("executor for context {handle} terminated abnormally: {err}");
    }
}

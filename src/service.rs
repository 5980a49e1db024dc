//! Guest-facing service facade.
//!
//! [`HttpService`] is the operation contract the syscall decoding layer
//! calls into: everything it does maps one-to-one onto a guest HTTP system
//! call. One instance exists per emulated service session; it owns the
//! context registry and the shared host HTTP client, and tearing it down
//! tears down every background executor with it.

use std::sync::Arc;

use log::info;
use reqwest::Client;

use crate::adapter::HttpClientAdapter;
use crate::context::{ContextHandle, ContextSnapshot, RequestMethod, RequestStatus};
use crate::error::ServiceError;
use crate::registry::ContextRegistry;

/// The HTTP request service behind the guest's system call interface.
///
/// All operations return without blocking on the network. The only awaits
/// are in [`destroy_context`](HttpService::destroy_context) and
/// [`shutdown`](HttpService::shutdown), which wait for background executors
/// to exit before releasing their contexts.
pub struct HttpService {
    registry: ContextRegistry,
    adapter: HttpClientAdapter,
}

impl HttpService {
    /// Creates the service with a freshly built host HTTP client.
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(Arc::new(init_client()?)))
    }

    /// Creates the service around an existing host HTTP client.
    pub fn with_client(client: Arc<Client>) -> Self {
        HttpService {
            registry: ContextRegistry::new(),
            adapter: HttpClientAdapter::new(client),
        }
    }

    /// Allocates a fresh request context and returns its handle.
    pub fn create_context(&mut self) -> Result<ContextHandle, ServiceError> {
        self.registry.create()
    }

    /// Sets a context's method, URL, and request headers.
    ///
    /// May be called repeatedly while the request has not started; fails
    /// with `InvalidState` afterwards.
    pub fn configure_context(
        &self,
        handle: ContextHandle,
        method: RequestMethod,
        url: &str,
        headers: Vec<(String, String)>,
    ) -> Result<(), ServiceError> {
        self.registry.get(handle)?.configure(method, url, headers)
    }

    /// Spawns the background executor for a configured context.
    ///
    /// Transitions the context `NotStarted -> InProgress`; fails with
    /// `InvalidState` if the request already started or was never
    /// configured.
    pub fn start_request(&mut self, handle: ContextHandle) -> Result<(), ServiceError> {
        self.registry.start(handle, self.adapter.clone())
    }

    /// Polls a context's lifecycle state and progress counters.
    pub fn get_state(&self, handle: ContextHandle) -> Result<RequestStatus, ServiceError> {
        Ok(self.registry.get(handle)?.status())
    }

    /// Full copy of a context's observable state, buffers included.
    ///
    /// Unlike the read operations this is valid in any lifecycle state; it
    /// reflects whatever has been published so far.
    pub fn snapshot_context(&self, handle: ContextHandle) -> Result<ContextSnapshot, ServiceError> {
        Ok(self.registry.get(handle)?.snapshot())
    }

    /// Raw response header bytes. `NotReady` until the state is terminal.
    pub fn read_response_headers(&self, handle: ContextHandle) -> Result<Vec<u8>, ServiceError> {
        self.registry.get(handle)?.response_headers()
    }

    /// Response body bytes. `NotReady` until the state is terminal.
    pub fn read_response_body(&self, handle: ContextHandle) -> Result<Vec<u8>, ServiceError> {
        self.registry.get(handle)?.response_body()
    }

    /// Requests cancellation of a context's request.
    ///
    /// Idempotent and state-agnostic: a running executor observes the flag
    /// within one poll interval and exits without finalizing; a request that
    /// never starts is simply never run.
    pub fn cancel_request(&self, handle: ContextHandle) -> Result<(), ServiceError> {
        self.registry.get(handle)?.request_cancel();
        Ok(())
    }

    /// Destroys a context, cancelling and joining its executor first.
    pub async fn destroy_context(&mut self, handle: ContextHandle) -> Result<(), ServiceError> {
        self.registry.destroy(handle).await
    }

    /// Tears the service down: cancels every in-flight request, waits for
    /// all executors to exit, empties the registry, and resets handle
    /// allocation. The shared client is released when the service drops.
    ///
    /// Also safe to call for re-initialization (guest software restart); the
    /// service is usable again afterwards.
    pub async fn shutdown(&mut self) {
        info!("http service shutting down");
        self.registry.clear_all().await;
    }
}

/// Builds the shared host HTTP client.
///
/// No overall request timeout is configured: the service contract has no
/// wall-clock deadline, and a request against an unresponsive peer runs
/// until it is explicitly cancelled.
pub fn init_client() -> Result<Client, reqwest::Error> {
    Client::builder().build()
}

//! Per-request state and its lock discipline.
//!
//! A [`RequestContext`] holds everything one guest HTTP request needs: the
//! configuration written by the guest before the request starts, and the
//! runtime state the executor publishes while driving it. All of it sits
//! behind a single mutex. Critical sections are kept short and the lock is
//! never held across an await point or any I/O, which is what lets the
//! guest-facing thread poll freely while an executor is mid-flight.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use log::warn;

use crate::error::ServiceError;

/// Opaque identifier for one request context, allocated by the registry.
///
/// Handles are monotonically allocated per service instance; a value is only
/// reused after the service has been cleared and the allocator reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub(crate) u32);

impl ContextHandle {
    /// Reconstructs a handle from its guest wire value.
    ///
    /// The syscall layer round-trips handles through guest memory; a stale or
    /// forged value simply fails lookup with
    /// [`ServiceError::InvalidHandle`](crate::ServiceError::InvalidHandle).
    pub fn from_raw(raw: u32) -> Self {
        ContextHandle(raw)
    }

    /// The guest wire value of this handle.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// HTTP operation performed by a request.
///
/// Discriminants are the guest API wire values. `PostAlt` and `PutAlt` are
/// distinct guest entry points that map onto the same wire methods as `Post`
/// and `Put`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    /// GET request.
    Get = 1,
    /// POST request.
    Post = 2,
    /// HEAD request.
    Head = 3,
    /// PUT request.
    Put = 4,
    /// DELETE request.
    Delete = 5,
    /// Alternate guest entry point for POST.
    PostAlt = 6,
    /// Alternate guest entry point for PUT.
    PutAlt = 7,
}

impl RequestMethod {
    /// Decodes a guest wire value into a method, if it names one.
    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            1 => Some(RequestMethod::Get),
            2 => Some(RequestMethod::Post),
            3 => Some(RequestMethod::Head),
            4 => Some(RequestMethod::Put),
            5 => Some(RequestMethod::Delete),
            6 => Some(RequestMethod::PostAlt),
            7 => Some(RequestMethod::PutAlt),
            _ => None,
        }
    }

    /// The guest wire value of this method.
    pub fn wire_value(self) -> u32 {
        self as u32
    }
}

/// Lifecycle state of a request.
///
/// Discriminants are the guest API wire values. Transitions are totally
/// ordered per context: `NotStarted` precedes `InProgress` precedes exactly
/// one terminal state, and only the executor performs the last transition.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Created, possibly configured, not yet started.
    NotStarted = 1,
    /// An executor task is (or was) driving the request.
    InProgress = 5,
    /// The request completed; status code and buffers are readable.
    Ready = 8,
    /// The request timed out.
    Timeout = 10,
}

impl RequestState {
    /// Terminal states admit no further automatic transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Ready | RequestState::Timeout)
    }

    /// The guest wire value of this state.
    pub fn wire_value(self) -> u32 {
        self as u32
    }
}

/// Configuration snapshot handed to the executor when a request starts.
///
/// Taken under the context lock at the `NotStarted -> InProgress` transition
/// and owned by the executor from then on, so no lock is needed during
/// network activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestConfig {
    pub url: String,
    pub method: RequestMethod,
    pub headers: Vec<(String, String)>,
}

/// Point-in-time view of a context's poll state, without buffer contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestStatus {
    /// Current lifecycle state.
    pub state: RequestState,
    /// Status code reported by the server; 0 if no response was received.
    pub status_code: u32,
    /// Content length reported by the server; -1 when the server did not
    /// report one.
    pub content_length: i64,
    /// Response body bytes received.
    pub downloaded_size: u64,
}

/// Full copy of a context's observable state, buffers included.
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    /// Lifecycle state and progress counters.
    pub status: RequestStatus,
    /// Whether cancellation has been requested.
    pub cancel_requested: bool,
    /// Raw response header bytes accumulated so far.
    pub response_headers: Vec<u8>,
    /// Response body bytes accumulated so far.
    pub response_body: Vec<u8>,
}

struct ContextInner {
    state: RequestState,
    cancel_requested: bool,
    method: Option<RequestMethod>,
    url: String,
    request_headers: Vec<(String, String)>,
    status_code: u32,
    content_length: i64,
    downloaded_size: u64,
    response_headers: Vec<u8>,
    response_body: Vec<u8>,
}

/// State for one in-flight or completed request.
///
/// The registry exclusively owns each context; the executor holds a second
/// reference for the duration of one run. Every field is guarded by the
/// context's mutex.
pub(crate) struct RequestContext {
    inner: Mutex<ContextInner>,
}

impl RequestContext {
    pub fn new() -> Self {
        RequestContext {
            inner: Mutex::new(ContextInner {
                state: RequestState::NotStarted,
                cancel_requested: false,
                method: None,
                url: String::new(),
                request_headers: Vec::new(),
                status_code: 0,
                content_length: 0,
                downloaded_size: 0,
                response_headers: Vec::new(),
                response_body: Vec::new(),
            }),
        }
    }

    /// A poisoned lock means a writer panicked mid-section; the fields are
    /// still structurally valid, so recover the guard rather than propagate
    /// the panic into destroy/shutdown paths that must not fail.
    fn lock(&self) -> MutexGuard<'_, ContextInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sets the request line and headers. Replaces any prior configuration.
    ///
    /// Fails with `InvalidState` once the context has left `NotStarted`.
    pub fn configure(
        &self,
        method: RequestMethod,
        url: &str,
        headers: Vec<(String, String)>,
    ) -> Result<(), ServiceError> {
        let mut inner = self.lock();
        if inner.state != RequestState::NotStarted {
            return Err(ServiceError::InvalidState(inner.state));
        }
        inner.method = Some(method);
        inner.url = url.to_string();
        inner.request_headers = headers;
        Ok(())
    }

    /// Transitions `NotStarted -> InProgress` and returns the configuration
    /// snapshot the executor will run with.
    ///
    /// Fails with `InvalidState` if the request has already started or was
    /// never configured with a method.
    pub fn begin(&self) -> Result<RequestConfig, ServiceError> {
        let mut inner = self.lock();
        if inner.state != RequestState::NotStarted {
            return Err(ServiceError::InvalidState(inner.state));
        }
        let Some(method) = inner.method else {
            return Err(ServiceError::InvalidState(inner.state));
        };
        inner.state = RequestState::InProgress;
        Ok(RequestConfig {
            url: inner.url.clone(),
            method,
            headers: inner.request_headers.clone(),
        })
    }

    /// Current lifecycle state and progress counters, without buffer clones.
    pub fn status(&self) -> RequestStatus {
        let inner = self.lock();
        RequestStatus {
            state: inner.state,
            status_code: inner.status_code,
            content_length: inner.content_length,
            downloaded_size: inner.downloaded_size,
        }
    }

    /// Full immutable copy of the observable state, buffers included.
    pub fn snapshot(&self) -> ContextSnapshot {
        let inner = self.lock();
        ContextSnapshot {
            status: RequestStatus {
                state: inner.state,
                status_code: inner.status_code,
                content_length: inner.content_length,
                downloaded_size: inner.downloaded_size,
            },
            cancel_requested: inner.cancel_requested,
            response_headers: inner.response_headers.clone(),
            response_body: inner.response_body.clone(),
        }
    }

    /// Raw response header bytes; `NotReady` until the state is terminal.
    pub fn response_headers(&self) -> Result<Vec<u8>, ServiceError> {
        let inner = self.lock();
        if !inner.state.is_terminal() {
            return Err(ServiceError::NotReady(inner.state));
        }
        Ok(inner.response_headers.clone())
    }

    /// Response body bytes; `NotReady` until the state is terminal.
    pub fn response_body(&self) -> Result<Vec<u8>, ServiceError> {
        let inner = self.lock();
        if !inner.state.is_terminal() {
            return Err(ServiceError::NotReady(inner.state));
        }
        Ok(inner.response_body.clone())
    }

    /// Raises the cancellation flag. Idempotent; this only signals the
    /// executor, which observes the flag once per poll iteration.
    pub fn request_cancel(&self) {
        self.lock().cancel_requested = true;
    }

    /// Whether cancellation has been requested.
    pub fn cancel_requested(&self) -> bool {
        self.lock().cancel_requested
    }

    /// Publishes the completed response and transitions to `Ready`.
    ///
    /// Executor-only. A call in any state other than `InProgress` is a
    /// contract violation and is ignored so a terminal state is never
    /// overwritten.
    pub fn mark_ready(
        &self,
        status_code: u32,
        content_length: i64,
        downloaded_size: u64,
        response_headers: Vec<u8>,
        response_body: Vec<u8>,
    ) {
        let mut inner = self.lock();
        if inner.state != RequestState::InProgress {
            warn!(
                "ignoring ready transition in state {:?} (status {})",
                inner.state, status_code
            );
            return;
        }
        inner.status_code = status_code;
        inner.content_length = content_length;
        inner.downloaded_size = downloaded_size;
        inner.response_headers = response_headers;
        inner.response_body = response_body;
        inner.state = RequestState::Ready;
    }

    /// Transitions to `Timeout` without touching the response fields.
    ///
    /// Executor-only; same exactly-once rules as [`mark_ready`].
    ///
    /// [`mark_ready`]: RequestContext::mark_ready
    pub fn mark_timeout(&self) {
        let mut inner = self.lock();
        if inner.state != RequestState::InProgress {
            warn!("ignoring timeout transition in state {:?}", inner.state);
            return;
        }
        inner.state = RequestState::Timeout;
    }
}

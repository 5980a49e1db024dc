//! Service error taxonomy.
//!
//! These are the only failures the service surfaces to the guest syscall
//! layer. Network-level failures (DNS, refused connections, TLS, mid-body
//! I/O errors) are deliberately *not* represented here: they finalize the
//! request as `Ready` with a zero or server-reported status code, and the
//! caller distinguishes outcomes by status code and buffer contents.

use thiserror::Error;

use crate::context::{ContextHandle, RequestState};

/// Errors surfaced across the service boundary.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceError {
    /// The handle does not name a live context (never allocated, or already
    /// destroyed). Caller bug; never retried.
    #[error("invalid context handle {0}")]
    InvalidHandle(ContextHandle),

    /// The operation is not permitted in the context's current lifecycle
    /// state, e.g. configuring a request that has already started.
    #[error("operation not permitted in request state {0:?}")]
    InvalidState(RequestState),

    /// Response data was requested before the request reached a terminal
    /// state. The caller is expected to keep polling.
    #[error("response not ready (request state {0:?})")]
    NotReady(RequestState),

    /// The handle counter is exhausted. New contexts cannot be created until
    /// the service is cleared; existing ones are unaffected.
    #[error("context handle space exhausted")]
    ResourceExhausted,
}

//! Asynchronous HTTP request service for an emulated console's system call
//! layer.
//!
//! Guest software running under the emulator talks to its HTTP service
//! through a handle-based system call interface: create a request context,
//! configure it, start it, poll it, read the response back, destroy it. This
//! crate implements the host side of that contract. Every started request
//! runs on its own background task against the host HTTP client, while the
//! guest-facing thread only ever takes short, non-blocking peeks at shared
//! state, so the cooperative single-threaded guest simulation never stalls
//! on host network I/O.
//!
//! # Example
//!
//! ```no_run
//! use hle_http::{HttpService, RequestMethod};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut service = HttpService::new()?;
//!
//! let handle = service.create_context()?;
//! service.configure_context(handle, RequestMethod::Get, "http://example.com/", Vec::new())?;
//! service.start_request(handle)?;
//!
//! loop {
//!     let status = service.get_state(handle)?;
//!     if status.state.is_terminal() {
//!         println!("status {} ({} bytes)", status.status_code, status.downloaded_size);
//!         break;
//!     }
//!     tokio::time::sleep(std::time::Duration::from_millis(50)).await;
//! }
//!
//! let body = service.read_response_body(handle)?;
//! println!("{}", String::from_utf8_lossy(&body));
//! service.destroy_context(handle).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime: `start_request` spawns the request
//! executor onto it, and `destroy_context`/`shutdown` await executor exit.

#![warn(missing_docs)]

mod adapter;
pub mod config;
mod context;
mod error;
mod executor;
mod registry;
mod service;

// Re-export public API
pub use context::{ContextHandle, ContextSnapshot, RequestMethod, RequestState, RequestStatus};
pub use error::ServiceError;
pub use service::{init_client, HttpService};

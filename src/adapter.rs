//! Host HTTP capability behind the request service.
//!
//! The adapter owns nothing but a shared [`reqwest::Client`]. It turns a
//! configuration snapshot into an outbound request and serializes a received
//! response head back into the raw byte blob the guest API exposes. Driving
//! the exchange (send, chunked body reads, backoff) is the executor's job;
//! keeping the steps separate is what lets the executor bound every wait.

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, Version};

use crate::context::{RequestConfig, RequestMethod};

/// Adapter over the shared host HTTP client.
///
/// Cheap to clone; one clone travels with each executor task.
#[derive(Clone)]
pub(crate) struct HttpClientAdapter {
    client: Arc<Client>,
}

impl HttpClientAdapter {
    pub fn new(client: Arc<Client>) -> Self {
        HttpClientAdapter { client }
    }

    /// Builds the outbound request for `config`.
    ///
    /// Header pairs are applied in guest order. An invalid URL or header is
    /// not rejected here: it surfaces as an error when the request is sent,
    /// which the executor folds into a completed zero-status response.
    pub fn build(&self, config: &RequestConfig) -> RequestBuilder {
        let mut request = self
            .client
            .request(wire_method(config.method), config.url.as_str());
        for (name, value) in &config.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request
    }
}

/// Maps a guest method onto the wire method. The `_ALT` guest entry points
/// share a wire method with their plain counterparts.
fn wire_method(method: RequestMethod) -> Method {
    match method {
        RequestMethod::Get => Method::GET,
        RequestMethod::Post | RequestMethod::PostAlt => Method::POST,
        RequestMethod::Head => Method::HEAD,
        RequestMethod::Put | RequestMethod::PutAlt => Method::PUT,
        RequestMethod::Delete => Method::DELETE,
    }
}

/// Serializes the response status line and headers into the raw header blob
/// the guest reads back: status line, one `name: value` line per header, and
/// a blank-line terminator.
pub(crate) fn header_bytes(response: &Response) -> Vec<u8> {
    let version = match response.version() {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/1.1",
    };
    let status = response.status();

    let mut out = Vec::new();
    out.extend_from_slice(version.as_bytes());
    out.push(b' ');
    out.extend_from_slice(status.as_str().as_bytes());
    if let Some(reason) = status.canonical_reason() {
        out.push(b' ');
        out.extend_from_slice(reason.as_bytes());
    }
    out.extend_from_slice(b"\r\n");

    for (name, value) in response.headers() {
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out
}

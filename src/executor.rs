//! Background executor: drives one request to a terminal state.
//!
//! One executor task runs per started request. It never takes the context
//! lock across a network wait; every wait is bounded by
//! [`POLL_WAIT_TIMEOUT`] so the cancellation flag is observed at least once
//! per interval, and idle waits back off per the policy in [`crate::config`]
//! instead of spinning on a stalled peer.

use std::sync::Arc;

use log::{debug, warn};
use tokio::time::{sleep, timeout};

use crate::adapter::{header_bytes, HttpClientAdapter};
use crate::config::{IDLE_FREE_RETRIES, IDLE_RETRY_SLEEP, POLL_WAIT_TIMEOUT};
use crate::context::{RequestConfig, RequestContext};

/// Runs one request to completion.
///
/// Never panics past its boundary and never returns an error: network
/// failures finalize the context as `Ready` with whatever status and buffers
/// were observed (status 0 if no response ever arrived), and cancellation
/// exits without finalizing at all. Adapter resources (the in-flight
/// request/response) are dropped before the task ends on every path.
pub(crate) async fn run_request(
    context: Arc<RequestContext>,
    adapter: HttpClientAdapter,
    config: RequestConfig,
) {
    debug!("executor started: {:?} {}", config.method, config.url);

    let send = adapter.build(&config).send();
    tokio::pin!(send);

    let mut idle_waits = 0u32;

    // Send phase. Connection establishment and the response head are driven
    // in bounded slices so cancellation stays prompt even while the peer is
    // unreachable or silent.
    let response = loop {
        if context.cancel_requested() {
            debug!("request to {} cancelled before a response arrived", config.url);
            return;
        }
        match timeout(POLL_WAIT_TIMEOUT, &mut send).await {
            Ok(Ok(response)) => break response,
            Ok(Err(err)) => {
                // Not a distinct error kind at this layer: the context
                // completes with status 0 and empty buffers, and the caller
                // reads the outcome off the status code.
                warn!("request to {} failed before a response: {}", config.url, err);
                context.mark_ready(0, 0, 0, Vec::new(), Vec::new());
                return;
            }
            Err(_) => idle_backoff(&mut idle_waits).await,
        }
    };

    let status_code = u32::from(response.status().as_u16());
    let content_length = response.content_length().map_or(-1, |len| len as i64);
    let response_headers = header_bytes(&response);

    let mut body = response;
    let mut response_body: Vec<u8> = Vec::new();
    idle_waits = 0;

    // Body phase: one bounded chunk read per iteration. Received bytes reset
    // the idle counter; an elapsed wait escalates the backoff.
    loop {
        if context.cancel_requested() {
            debug!("request to {} cancelled mid-body", config.url);
            return;
        }
        match timeout(POLL_WAIT_TIMEOUT, body.chunk()).await {
            Ok(Ok(Some(chunk))) => {
                idle_waits = 0;
                response_body.extend_from_slice(&chunk);
            }
            Ok(Ok(None)) => break,
            Ok(Err(err)) => {
                // Mid-body failure: finalize with what was received so far.
                warn!("response body for {} ended early: {}", config.url, err);
                break;
            }
            Err(_) => idle_backoff(&mut idle_waits).await,
        }
    }

    let downloaded_size = response_body.len() as u64;
    debug!(
        "request to {} completed: status {}, {} bytes",
        config.url, status_code, downloaded_size
    );
    context.mark_ready(
        status_code,
        content_length,
        downloaded_size,
        response_headers,
        response_body,
    );
}

/// Escalating idle policy for a wait that saw no activity: the first idle
/// wait earns an immediate retry, every one after that sleeps first.
async fn idle_backoff(idle_waits: &mut u32) {
    if *idle_waits >= IDLE_FREE_RETRIES {
        sleep(IDLE_RETRY_SLEEP).await;
    }
    *idle_waits = idle_waits.saturating_add(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn idle_backoff_first_retry_is_free() {
        let start = Instant::now();
        let mut idle_waits = 0u32;

        idle_backoff(&mut idle_waits).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        idle_backoff(&mut idle_waits).await;
        assert_eq!(start.elapsed(), IDLE_RETRY_SLEEP);

        idle_backoff(&mut idle_waits).await;
        assert_eq!(start.elapsed(), IDLE_RETRY_SLEEP * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_backoff_resets_with_counter() {
        let start = Instant::now();
        let mut idle_waits = 0u32;

        idle_backoff(&mut idle_waits).await;
        idle_backoff(&mut idle_waits).await;
        assert_eq!(start.elapsed(), IDLE_RETRY_SLEEP);

        // Activity observed: the executor zeroes the counter, restoring the
        // free retry.
        idle_waits = 0;
        idle_backoff(&mut idle_waits).await;
        assert_eq!(start.elapsed(), IDLE_RETRY_SLEEP);
    }
}

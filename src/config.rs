//! Operational constants for the request executor.
//!
//! These three values define the guest-visible polling behavior: how long a
//! single wait for network activity may last, and how quickly an idle
//! connection backs off. They are deliberately conservative so a stalled
//! server costs one wakeup per sleep interval instead of a spinning core.

use std::time::Duration;

/// Upper bound on one wait for network activity inside the executor's poll
/// loop. The cancellation flag is re-checked between waits, so this is also
/// the worst-case added latency before a cancel takes effect.
pub const POLL_WAIT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Number of consecutive no-activity waits that retry immediately before the
/// executor starts sleeping between retries.
pub const IDLE_FREE_RETRIES: u32 = 1;

/// Sleep applied before each retry once the free-retry allowance is spent.
pub const IDLE_RETRY_SLEEP: Duration = Duration::from_millis(100);

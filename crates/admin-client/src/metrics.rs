//! Client-side counters
//!
//! Emitted through the `metrics` facade; with no recorder installed every call
//! is a no-op. The console installs a Prometheus recorder when asked to print
//! them.
//!
//! - `admin_api_requests_total` (counter): label `status`
//! - `admin_token_refresh_total` (counter): label `outcome`
//! - `admin_session_ended_total` (counter)

/// Record one completed API round trip. `status` is the HTTP status, or
/// `"transport"` when no response arrived.
pub fn record_request(status: &str) {
    metrics::counter!("admin_api_requests_total", "status" => status.to_string()).increment(1);
}

/// Record the settlement of one refresh episode (`"success"`, `"failure"`,
/// `"missing_refresh_token"`, `"aborted"`).
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("admin_token_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_session_ended() {
    metrics::counter!("admin_session_ended_total").increment(1);
}

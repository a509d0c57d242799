//! Shared HTTP Client Module
//!
//! Provides global, lazy-initialized HTTP clients with connection pooling so
//! repeated calls to the detection API reuse TLS sessions and TCP connections.

use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

use crate::error::Result;

const USER_AGENT: &str = concat!("solar-detect/", env!("CARGO_PKG_VERSION"));

/// Global HTTP client for auth and profile calls
///
/// - 30s timeout, these calls are small
/// - 5 idle connections per host
pub static API_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(5)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .expect("Failed to create API HTTP client")
});

/// Global HTTP client for prediction calls
///
/// Model inference plus satellite imagery download can take well over
/// a minute, so the timeout is much longer.
pub static PREDICT_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(5)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .expect("Failed to create prediction HTTP client")
});

/// Get the global API HTTP client
#[inline]
pub fn api_client() -> &'static Client {
    &API_CLIENT
}

/// Get the global prediction HTTP client
#[inline]
pub fn predict_client() -> &'static Client {
    &PREDICT_CLIENT
}

/// Build a dedicated client when the configured timeout differs from the
/// shared ones.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .pool_max_idle_per_host(5)
        .build()?)
}

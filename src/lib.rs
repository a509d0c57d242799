//! Client library for the solar panel detection service.
//!
//! Validates Brazilian document numbers and form input, manages the login
//! session, calls the prediction API, and checks returned images for the
//! magenta detection overlay.

pub mod api;
pub mod auth;
pub mod config;
pub mod detection;
mod error;
pub mod quota;
pub mod validation;

pub use api::{Prediction, SolarDetectClient};
pub use config::Config;
pub use detection::{MaskDetector, MaskParams, MaskVerdict};
pub use error::{Result, SolarDetectError};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG`; otherwise `default_filter` is used, e.g.
/// `"warn,solar_detect_lib=info"`. Calling it twice is harmless.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

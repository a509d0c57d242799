//! Runtime configuration from the environment (and `.env`).

use std::time::Duration;

use crate::detection::{MaskParams, DEFAULT_MIN_HITS, DEFAULT_STRIDE_PIXELS};
use crate::error::{Result, SolarDetectError};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PREDICT_TIMEOUT_SECS: u64 = 120;

/// Client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the detection API, without a trailing slash
    pub api_url: String,
    /// Timeout for auth and profile calls
    pub timeout: Duration,
    /// Timeout for prediction calls (model inference is slow)
    pub predict_timeout: Duration,
    pub mask: MaskParams,
    /// Refresh the token when fewer than this many seconds remain
    pub refresh_window_secs: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            predict_timeout: Duration::from_secs(DEFAULT_PREDICT_TIMEOUT_SECS),
            mask: MaskParams::default(),
            refresh_window_secs: crate::auth::token::DEFAULT_REFRESH_WINDOW_SECS,
        }
    }
}

/// Load `.env` from the working directory, falling back to the parent.
pub fn load_env() {
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path("../.env");
    }
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary lookup, so tests need not touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = normalize_api_url(
            lookup("SOLAR_DETECT_API_URL")
                .as_deref()
                .unwrap_or(DEFAULT_API_URL),
        )?;

        let timeout = parse_or(&lookup, "SOLAR_DETECT_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let predict_timeout = parse_or(
            &lookup,
            "SOLAR_DETECT_PREDICT_TIMEOUT_SECS",
            DEFAULT_PREDICT_TIMEOUT_SECS,
        )?;
        let stride_pixels = parse_or(
            &lookup,
            "SOLAR_DETECT_MASK_STRIDE_PIXELS",
            DEFAULT_STRIDE_PIXELS,
        )?;
        let min_hits = parse_or(&lookup, "SOLAR_DETECT_MASK_MIN_HITS", DEFAULT_MIN_HITS)?;
        let refresh_window_secs = parse_or(
            &lookup,
            "SOLAR_DETECT_REFRESH_WINDOW_SECS",
            crate::auth::token::DEFAULT_REFRESH_WINDOW_SECS,
        )?;

        if stride_pixels == 0 {
            return Err(SolarDetectError::Config(
                "SOLAR_DETECT_MASK_STRIDE_PIXELS must be > 0".to_string(),
            ));
        }

        Ok(Self {
            api_url,
            timeout: Duration::from_secs(timeout),
            predict_timeout: Duration::from_secs(predict_timeout),
            mask: MaskParams {
                stride_pixels,
                min_hits,
            },
            refresh_window_secs,
        })
    }

    /// Join an API path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }
}

fn normalize_api_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(SolarDetectError::Config(format!(
            "SOLAR_DETECT_API_URL must be an http(s) URL, got '{}'",
            raw
        )));
    }
    Ok(trimmed.to_string())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| SolarDetectError::Config(format!("{}='{}': {}", key, raw, e))),
        _ => Ok(default),
    }
}

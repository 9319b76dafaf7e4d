//! Client configuration
//!
//! Holds the backend origin and the timing knobs for both components.
//! The base URL is the only required value; everything else has defaults
//! matching the platform's deployed behavior.

use crate::error::{AppError, Result};
use std::time::Duration;
use url::Url;

/// Environment variable consulted by [`ApiConfig::from_env`]
pub const BASE_URL_ENV: &str = "SCALPER_API_BASE";

/// Client configuration shared by both components
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Backend origin, e.g. `https://api.example.com/`
    pub base_url: Url,
    /// Transport-level timeout for every HTTP call
    pub http_timeout: Duration,
    /// Quiet period before a search lookup fires
    pub search_debounce: Duration,
    /// Minimum trimmed query length that triggers a lookup
    pub min_query_len: usize,
    /// Maximum result rows kept for the overlay
    pub max_results: usize,
    /// Interval between alert feed polls
    pub alert_poll_interval: Duration,
    /// `limit` query parameter for the alerts endpoint
    pub alert_limit: usize,
    /// Retry an alerts fetch once without the bearer header after a 401.
    /// Matches the backend's current posture of unprotected read routes;
    /// turn off once those routes require auth.
    pub retry_unauthenticated: bool,
}

impl ApiConfig {
    /// Create a configuration with platform defaults for the given origin
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            http_timeout: Duration::from_secs(30),
            search_debounce: Duration::from_millis(300),
            min_query_len: 2,
            max_results: 8,
            alert_poll_interval: Duration::from_secs(120),
            alert_limit: 20,
            retry_unauthenticated: true,
        }
    }

    /// Resolve the backend origin from the process environment
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var(BASE_URL_ENV)
            .map_err(|_| AppError::Config(format!("{} is not set", BASE_URL_ENV)))?;
        let base_url = Url::parse(&raw)?;
        Ok(Self::new(base_url))
    }
}

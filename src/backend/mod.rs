//! Backend seam
//!
//! Both components talk to the platform backend through [`TradingBackend`].
//! The production implementation is [`http::HttpBackend`]; tests substitute
//! in-process fakes at the same seam.

pub mod http;

use crate::error::Result;
use crate::models::{AlertRecord, SearchResult};
use async_trait::async_trait;

pub use http::HttpBackend;

/// Remote endpoints consumed by the client core
#[async_trait]
pub trait TradingBackend: Send + Sync {
    /// `GET /api/stocks/search?query=<text>` — unauthenticated symbol lookup.
    /// Results arrive in server relevance order.
    async fn search_symbols(&self, query: &str) -> Result<Vec<SearchResult>>;

    /// `GET /api/news-alerts?limit=<n>` — alert list, most recent first.
    /// The bearer token is optional to support the 401 retry policy.
    async fn fetch_alerts(&self, limit: usize, token: Option<&str>) -> Result<Vec<AlertRecord>>;

    /// `PUT /api/news-alerts/{id}/read` — persist a read mark.
    /// Only the status code is relied upon; any response body is ignored.
    async fn mark_alert_read(&self, id: &str, token: &str) -> Result<()>;
}

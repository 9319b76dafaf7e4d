//! HTTP backend adapter

use crate::backend::TradingBackend;
use crate::config::ApiConfig;
use crate::error::{AppError, Result};
use crate::models::{AlertRecord, SearchResult};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use url::Url;

/// `reqwest`-based implementation of [`TradingBackend`]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(AppError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Map non-success statuses to the error taxonomy
    fn check_status(response: Response) -> Result<Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => Err(AppError::Unauthorized),
            status => Err(AppError::Upstream(status.as_u16())),
        }
    }
}

/// Alerts endpoint envelope. A missing array field decodes as empty
/// rather than failing the fetch.
#[derive(Debug, Deserialize)]
struct AlertsEnvelope {
    #[serde(default)]
    alerts: Vec<AlertRecord>,
}

#[async_trait]
impl TradingBackend for HttpBackend {
    async fn search_symbols(&self, query: &str) -> Result<Vec<SearchResult>> {
        let url = self.endpoint("api/stocks/search")?;
        let response = self
            .client
            .get(url)
            .query(&[("query", query)])
            .send()
            .await?;

        let response = Self::check_status(response)?;
        let results: Vec<SearchResult> = response.json().await?;
        Ok(results)
    }

    async fn fetch_alerts(&self, limit: usize, token: Option<&str>) -> Result<Vec<AlertRecord>> {
        let url = self.endpoint("api/news-alerts")?;
        let mut request = self.client.get(url).query(&[("limit", &limit.to_string())]);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = Self::check_status(request.send().await?)?;
        let envelope: AlertsEnvelope = response.json().await?;
        Ok(envelope.alerts)
    }

    async fn mark_alert_read(&self, id: &str, token: &str) -> Result<()> {
        let path = format!("api/news-alerts/{}/read", urlencoding::encode(id));
        let url = self.endpoint(&path)?;
        let response = self.client.put(url).bearer_auth(token).send().await?;
        Self::check_status(response)?;
        Ok(())
    }
}

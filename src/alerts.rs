//! Alert feed component
//!
//! Polls the news-alerts endpoint on a fixed interval, tracks read/unread
//! state, and surfaces at most one interruptive popup for high-severity
//! unread items. Read marks are applied optimistically and are monotonic:
//! once an alert is read locally it never flips back to unread, even when a
//! stale in-flight fetch reports it unread.

use crate::auth::CredentialStore;
use crate::backend::TradingBackend;
use crate::config::ApiConfig;
use crate::error::{AppError, Result};
use crate::models::AlertRecord;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Known alerts plus the currently displayed popup
#[derive(Debug, Clone, Default)]
pub struct AlertFeedState {
    /// Full known alert set in fetched (most recent first) order
    pub alerts: Vec<AlertRecord>,
    /// Id of the alert shown as the interruptive popup, if any
    pub popup: Option<String>,
}

/// Polling alert feed with optimistic read tracking
pub struct AlertFeed {
    inner: Arc<AlertInner>,
    poll: Mutex<Option<JoinHandle<()>>>,
}

struct AlertInner {
    backend: Arc<dyn TradingBackend>,
    credentials: Arc<dyn CredentialStore>,
    poll_interval: Duration,
    alert_limit: usize,
    retry_unauthenticated: bool,
    state: RwLock<AlertFeedState>,
    /// Ids known read locally. Entries are only ever added, which is what
    /// keeps the read flag monotonic across merges.
    read_ids: DashMap<String, ()>,
}

impl AlertFeed {
    pub fn new(
        backend: Arc<dyn TradingBackend>,
        credentials: Arc<dyn CredentialStore>,
        config: &ApiConfig,
    ) -> Self {
        Self {
            inner: Arc::new(AlertInner {
                backend,
                credentials,
                poll_interval: config.alert_poll_interval,
                alert_limit: config.alert_limit,
                retry_unauthenticated: config.retry_unauthenticated,
                state: RwLock::new(AlertFeedState::default()),
                read_ids: DashMap::new(),
            }),
            poll: Mutex::new(None),
        }
    }

    /// Begin polling: one immediate fetch, then one per interval for as long
    /// as this handle lives. Dropping the feed cancels the loop.
    pub fn start(&self) {
        let weak = Arc::downgrade(&self.inner);
        let interval = self.inner.poll_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                inner.refresh_once().await;
            }
        });
        if let Some(old) = self.poll.lock().replace(handle) {
            old.abort();
        }
    }

    /// Fetch outside the poll cadence (host refresh button)
    pub async fn refresh(&self) {
        self.inner.refresh_once().await;
    }

    /// Known alerts, fetched order preserved
    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.inner.state.read().alerts.clone()
    }

    /// Count of alerts not yet read
    pub fn unread_count(&self) -> usize {
        self.inner
            .state
            .read()
            .alerts
            .iter()
            .filter(|a| !a.read)
            .count()
    }

    /// The alert currently displayed as the popup, if any
    pub fn popup(&self) -> Option<AlertRecord> {
        let state = self.inner.state.read();
        let id = state.popup.as_deref()?;
        state.alerts.iter().find(|a| a.id == id).cloned()
    }

    /// Force-display a known alert as the popup regardless of polling state.
    /// Returns false when the id is not in the known set.
    pub fn show_popup(&self, id: &str) -> bool {
        let mut state = self.inner.state.write();
        if state.alerts.iter().any(|a| a.id == id) {
            state.popup = Some(id.to_string());
            true
        } else {
            debug!("Ignoring popup request for unknown alert {}", id);
            false
        }
    }

    /// Mark one alert read. Applied locally before the write resolves; the
    /// local mark is never rolled back on failure.
    pub async fn mark_read(&self, id: &str) {
        self.inner.mark_read(id).await;
    }

    /// Dismiss the popup. The popup clears synchronously; persisting the
    /// read mark happens afterwards and its outcome does not affect display.
    pub async fn dismiss_popup(&self) {
        let dismissed = self.inner.state.write().popup.take();
        if let Some(id) = dismissed {
            self.inner.mark_read(&id).await;
        }
    }

    /// Snapshot of the feed state
    pub fn state(&self) -> AlertFeedState {
        self.inner.state.read().clone()
    }
}

impl Drop for AlertFeed {
    fn drop(&mut self) {
        if let Some(handle) = self.poll.lock().take() {
            handle.abort();
        }
    }
}

impl AlertInner {
    async fn refresh_once(&self) {
        if let Err(e) = self.try_refresh().await {
            // Silent to the user: last-known-good state is retained
            warn!("Alert fetch failed: {}", e);
        }
    }

    async fn try_refresh(&self) -> Result<()> {
        let Some(token) = self.credentials.token() else {
            debug!("No credential available, skipping alert fetch");
            return Ok(());
        };

        let fetched = match self.backend.fetch_alerts(self.alert_limit, Some(&token)).await {
            Ok(fetched) => fetched,
            Err(AppError::Unauthorized) if self.retry_unauthenticated => {
                // The platform's read routes are currently unprotected, so a
                // 401 gets one retry without the bearer header
                debug!("Alerts fetch returned 401, retrying unauthenticated");
                self.backend.fetch_alerts(self.alert_limit, None).await?
            }
            Err(AppError::Unauthorized) => {
                self.credentials.on_auth_failure(401);
                return Err(AppError::Unauthorized);
            }
            Err(e) => return Err(e),
        };

        self.merge_fetched(fetched);
        Ok(())
    }

    /// Full-replace merge with one exception: per alert id, the read flag is
    /// the logical OR of local and incoming. Fresher content wins for every
    /// other field.
    fn merge_fetched(&self, mut fetched: Vec<AlertRecord>) {
        for alert in fetched.iter_mut() {
            if alert.read {
                self.read_ids.insert(alert.id.clone(), ());
            } else if self.read_ids.contains_key(&alert.id) {
                alert.read = true;
            }
        }

        let mut state = self.state.write();
        state.alerts = fetched;

        // The popup must reference an alert in the known set
        if let Some(id) = state.popup.as_deref() {
            if !state.alerts.iter().any(|a| a.id == id) {
                state.popup = None;
            }
        }

        // At most one popup; first fetched high-severity unread wins, later
        // arrivals wait until the current one is dismissed
        if state.popup.is_none() {
            if let Some(first) = state.alerts.iter().find(|a| a.is_interruptive()) {
                state.popup = Some(first.id.clone());
            }
        }
    }

    async fn mark_read(&self, id: &str) {
        self.read_ids.insert(id.to_string(), ());
        {
            let mut state = self.state.write();
            if let Some(alert) = state.alerts.iter_mut().find(|a| a.id == id) {
                alert.read = true;
            }
        }

        let Some(token) = self.credentials.token() else {
            debug!("No credential available, read mark for {} kept local", id);
            return;
        };

        match self.backend.mark_alert_read(id, &token).await {
            Ok(()) => {}
            Err(AppError::Unauthorized) => {
                // The optimistic local mark is intentionally kept
                self.credentials.on_auth_failure(401);
            }
            Err(e) => warn!("Failed to persist read mark for {}: {}", id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryCredentialStore;
    use crate::models::{SearchResult, Severity};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use url::Url;

    enum FetchOutcome {
        Page(Vec<AlertRecord>),
        Status(u16),
    }

    /// In-process alerts backend with a scripted sequence of fetch outcomes
    #[derive(Default)]
    struct FakeBackend {
        fetches: Mutex<VecDeque<FetchOutcome>>,
        /// Token presence per fetch call
        fetch_tokens: Mutex<Vec<Option<String>>>,
        read_calls: Mutex<Vec<String>>,
        read_status: Mutex<Option<u16>>,
    }

    impl FakeBackend {
        fn queue_page(&self, alerts: Vec<AlertRecord>) {
            self.fetches.lock().push_back(FetchOutcome::Page(alerts));
        }

        fn queue_status(&self, status: u16) {
            self.fetches.lock().push_back(FetchOutcome::Status(status));
        }
    }

    #[async_trait]
    impl TradingBackend for FakeBackend {
        async fn search_symbols(&self, _: &str) -> Result<Vec<SearchResult>> {
            Ok(vec![])
        }

        async fn fetch_alerts(&self, _: usize, token: Option<&str>) -> Result<Vec<AlertRecord>> {
            self.fetch_tokens.lock().push(token.map(str::to_string));
            match self.fetches.lock().pop_front() {
                Some(FetchOutcome::Page(alerts)) => Ok(alerts),
                Some(FetchOutcome::Status(401)) => Err(AppError::Unauthorized),
                Some(FetchOutcome::Status(code)) => Err(AppError::Upstream(code)),
                None => Ok(vec![]),
            }
        }

        async fn mark_alert_read(&self, id: &str, _: &str) -> Result<()> {
            self.read_calls.lock().push(id.to_string());
            match *self.read_status.lock() {
                Some(401) => Err(AppError::Unauthorized),
                Some(code) => Err(AppError::Upstream(code)),
                None => Ok(()),
            }
        }
    }

    fn alert(id: &str, severity: Severity, read: bool) -> AlertRecord {
        AlertRecord {
            id: id.to_string(),
            symbol: "AAPL".to_string(),
            title: format!("alert {}", id),
            severity,
            read,
            ..Default::default()
        }
    }

    fn test_config() -> ApiConfig {
        ApiConfig::new(Url::parse("http://localhost:8000/").unwrap())
    }

    fn harness(token: Option<&str>) -> (AlertFeed, Arc<FakeBackend>, Arc<MemoryCredentialStore>) {
        let backend = Arc::new(FakeBackend::default());
        let store = MemoryCredentialStore::new(token.map(str::to_string));
        let feed = AlertFeed::new(backend.clone(), store.clone(), &test_config());
        (feed, backend, store)
    }

    #[tokio::test]
    async fn test_read_flag_is_monotonic_across_merges() {
        let (feed, backend, _) = harness(Some("tok"));

        backend.queue_page(vec![alert("1", Severity::Low, false)]);
        feed.refresh().await;
        feed.mark_read("1").await;

        // A stale fetch reports the alert unread with fresher content
        let mut stale = alert("1", Severity::Low, false);
        stale.title = "updated".to_string();
        backend.queue_page(vec![stale]);
        feed.refresh().await;

        let alerts = feed.alerts();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].read);
        assert_eq!(alerts[0].title, "updated");
    }

    #[tokio::test]
    async fn test_popup_single_flight_first_wins() {
        let (feed, backend, _) = harness(Some("tok"));
        let page = vec![
            alert("1", Severity::High, false),
            alert("2", Severity::High, false),
        ];
        backend.queue_page(page.clone());
        feed.refresh().await;
        assert_eq!(feed.popup().unwrap().id, "1");

        // A later fetch with the same alerts does not replace the popup
        backend.queue_page(page);
        feed.refresh().await;
        assert_eq!(feed.popup().unwrap().id, "1");
    }

    #[tokio::test]
    async fn test_unread_count() {
        let (feed, backend, _) = harness(Some("tok"));
        backend.queue_page(vec![
            alert("1", Severity::Low, true),
            alert("2", Severity::Low, false),
            alert("3", Severity::Medium, false),
        ]);
        feed.refresh().await;
        assert_eq!(feed.unread_count(), 2);
    }

    #[tokio::test]
    async fn test_popup_dismiss_end_to_end() {
        let (feed, backend, _) = harness(Some("tok"));
        backend.queue_page(vec![alert("x", Severity::High, false)]);
        feed.refresh().await;

        assert_eq!(feed.popup().unwrap().id, "x");

        feed.dismiss_popup().await;
        assert!(feed.popup().is_none());
        assert_eq!(backend.read_calls.lock().clone(), vec!["x"]);
        assert_eq!(feed.unread_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_skipped_without_credential() {
        let (feed, backend, _) = harness(None);
        backend.queue_page(vec![alert("1", Severity::High, false)]);
        feed.refresh().await;

        assert!(backend.fetch_tokens.lock().is_empty());
        assert!(feed.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_retries_unauthenticated_on_401() {
        let (feed, backend, store) = harness(Some("tok"));
        backend.queue_status(401);
        backend.queue_page(vec![alert("1", Severity::Low, false)]);
        feed.refresh().await;

        let tokens = backend.fetch_tokens.lock().clone();
        assert_eq!(tokens, vec![Some("tok".to_string()), None]);
        assert_eq!(feed.alerts().len(), 1);
        // lenient path does not clear the credential
        assert!(store.token().is_some());
    }

    #[tokio::test]
    async fn test_fetch_401_without_retry_clears_credential() {
        let backend = Arc::new(FakeBackend::default());
        let store = MemoryCredentialStore::new(Some("tok".to_string()));
        let mut config = test_config();
        config.retry_unauthenticated = false;
        let feed = AlertFeed::new(backend.clone(), store.clone(), &config);

        backend.queue_status(401);
        feed.refresh().await;

        assert!(store.token().is_none());
        assert!(feed.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_retains_state() {
        let (feed, backend, _) = harness(Some("tok"));
        backend.queue_page(vec![alert("1", Severity::Low, false)]);
        feed.refresh().await;
        assert_eq!(feed.alerts().len(), 1);

        backend.queue_status(503);
        feed.refresh().await;
        assert_eq!(feed.alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_without_credential_stays_local() {
        let (feed, backend, store) = harness(Some("tok"));
        backend.queue_page(vec![alert("1", Severity::Low, false)]);
        feed.refresh().await;

        store.set_token(None);
        feed.mark_read("1").await;

        assert!(backend.read_calls.lock().is_empty());
        assert_eq!(feed.unread_count(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_401_delegates_and_keeps_local_mark() {
        let (feed, backend, store) = harness(Some("tok"));
        backend.queue_page(vec![alert("1", Severity::Low, false)]);
        feed.refresh().await;

        *backend.read_status.lock() = Some(401);
        feed.mark_read("1").await;

        assert!(store.token().is_none());
        assert!(feed.alerts()[0].read);
    }

    #[tokio::test]
    async fn test_popup_cleared_when_alert_leaves_the_set() {
        let (feed, backend, _) = harness(Some("tok"));
        backend.queue_page(vec![alert("1", Severity::High, false)]);
        feed.refresh().await;
        assert!(feed.popup().is_some());

        backend.queue_page(vec![]);
        feed.refresh().await;
        assert!(feed.popup().is_none());
    }

    #[tokio::test]
    async fn test_show_popup_forces_known_alert() {
        let (feed, backend, _) = harness(Some("tok"));
        backend.queue_page(vec![alert("1", Severity::Medium, false)]);
        feed.refresh().await;

        assert!(feed.show_popup("1"));
        assert_eq!(feed.popup().unwrap().id, "1");
        assert!(!feed.show_popup("missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_loop_cadence_and_cancellation() {
        let (feed, backend, _) = harness(Some("tok"));
        feed.start();

        // immediate first fetch
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.fetch_tokens.lock().len(), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(backend.fetch_tokens.lock().len(), 2);

        drop(feed);
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(backend.fetch_tokens.lock().len(), 2);
    }
}

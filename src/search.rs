//! Symbol search component
//!
//! Debounced search-as-you-type against the symbol lookup endpoint, with a
//! positioned overlay for the result list. Every keystroke updates the query
//! text immediately; the network lookup fires only after the input has been
//! stable for the configured quiet period. Lookups are tagged with a
//! monotonically increasing sequence number so that only the most recently
//! issued request may mutate visible state (last-query-wins).

use crate::backend::TradingBackend;
use crate::config::ApiConfig;
use crate::error::Result;
use crate::models::SearchResult;
use crate::viewport::{OverlayRect, Viewport, ViewportListener, ViewportSubscription};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Callback invoked exactly once per confirmed selection, with the chosen
/// ticker symbol
pub type SelectCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Ephemeral UI state owned by the component
#[derive(Debug, Clone, Default)]
pub struct SearchQueryState {
    /// Raw input text, updated synchronously on every keystroke
    pub query: String,
    /// Latest delivered result set, server relevance order preserved
    pub results: Vec<SearchResult>,
    /// Overlay visible only when `results` is non-empty and the triggering
    /// trimmed query had at least the minimum length
    pub overlay_visible: bool,
    /// Where the overlay renders; recomputed on show and on every viewport
    /// scroll/resize while visible
    pub overlay_rect: Option<OverlayRect>,
}

/// Debounced symbol search with a viewport-tracked overlay
pub struct SymbolSearch {
    inner: Arc<SearchInner>,
}

struct SearchInner {
    backend: Arc<dyn TradingBackend>,
    viewport: Arc<dyn Viewport>,
    debounce: Duration,
    min_query_len: usize,
    max_results: usize,
    on_select: SelectCallback,
    state: RwLock<SearchQueryState>,
    /// Sequence number of the newest issued lookup; stale responses compare
    /// against this and are discarded
    seq: AtomicU64,
    pending: Mutex<Option<JoinHandle<()>>>,
    subscription: Mutex<Option<ViewportSubscription>>,
}

impl SymbolSearch {
    pub fn new(
        backend: Arc<dyn TradingBackend>,
        viewport: Arc<dyn Viewport>,
        config: &ApiConfig,
        on_select: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(SearchInner {
                backend,
                viewport,
                debounce: config.search_debounce,
                min_query_len: config.min_query_len,
                max_results: config.max_results,
                on_select: Box::new(on_select),
                state: RwLock::new(SearchQueryState::default()),
                seq: AtomicU64::new(0),
                pending: Mutex::new(None),
                subscription: Mutex::new(None),
            }),
        }
    }

    /// Handle a keystroke. The query text updates immediately; a lookup is
    /// scheduled after the quiet period for queries at or above the minimum
    /// length. Shorter queries never hit the network and clear any pending
    /// overlay.
    pub fn input(&self, text: &str) {
        // Every keystroke supersedes whatever lookup was outstanding
        let seq = self.inner.seq.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(handle) = self.inner.pending.lock().take() {
            handle.abort();
        }

        self.inner.state.write().query = text.to_string();

        let trimmed = text.trim().to_string();
        if trimmed.chars().count() < self.inner.min_query_len {
            self.inner.clear_results();
            self.inner.hide_overlay();
            return;
        }

        let backend = Arc::clone(&self.inner.backend);
        let weak = Arc::downgrade(&self.inner);
        let debounce = self.inner.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            match weak.upgrade() {
                Some(inner) if inner.seq.load(Ordering::SeqCst) == seq => {}
                _ => return,
            }

            let outcome = backend.search_symbols(&trimmed).await;

            // Re-check after the await: the component may be gone or the
            // query superseded while the request was in flight
            let Some(inner) = weak.upgrade() else { return };
            if inner.seq.load(Ordering::SeqCst) != seq {
                debug!("Discarding stale lookup result for '{}'", trimmed);
                return;
            }
            SearchInner::apply_outcome(&inner, &trimmed, outcome);
        });
        *self.inner.pending.lock() = Some(handle);
    }

    /// Confirm the result at `index` (pointer or keyboard activation).
    /// Clears the input, clears the results, hides the overlay, then invokes
    /// the selection callback, in that order. Returns false when no such
    /// result exists.
    pub fn select(&self, index: usize) -> bool {
        let symbol = {
            let mut state = self.inner.state.write();
            let Some(result) = state.results.get(index) else {
                return false;
            };
            let symbol = result.symbol.clone();
            if symbol.is_empty() {
                return false;
            }
            state.query.clear();
            state.results.clear();
            state.overlay_visible = false;
            state.overlay_rect = None;
            symbol
        };
        self.inner.release_subscription();

        // A lookup scheduled for the now-cleared query must not resurface
        self.inner.seq.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.inner.pending.lock().take() {
            handle.abort();
        }

        (self.inner.on_select)(&symbol);
        true
    }

    /// Focus left the anchor input. Hides the overlay only; a selection that
    /// already ran has cleared everything and this becomes a no-op.
    pub fn blur(&self) {
        self.dismiss_overlay();
    }

    /// Pointer activity outside the anchor input. Hides the overlay without
    /// touching the typed query.
    pub fn dismiss_overlay(&self) {
        self.inner.hide_overlay();
    }

    /// Re-read the anchor rectangle from the viewport
    pub fn reposition(&self) {
        self.inner.reposition();
    }

    /// Snapshot of the current component state
    pub fn state(&self) -> SearchQueryState {
        self.inner.state.read().clone()
    }
}

impl Drop for SymbolSearch {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.pending.lock().take() {
            handle.abort();
        }
        self.inner.release_subscription();
    }
}

impl SearchInner {
    fn apply_outcome(inner: &Arc<Self>, query: &str, outcome: Result<Vec<SearchResult>>) {
        match outcome {
            Ok(mut results) => {
                results.truncate(inner.max_results);
                let visible = !results.is_empty();
                {
                    let mut state = inner.state.write();
                    state.results = results;
                    state.overlay_visible = visible;
                    if !visible {
                        state.overlay_rect = None;
                    }
                }
                if visible {
                    Self::ensure_subscription(inner);
                    inner.reposition();
                } else {
                    inner.release_subscription();
                }
            }
            Err(e) => {
                // Non-fatal: degrade silently, the host never sees an error
                warn!("Symbol lookup failed for '{}': {}", query, e);
                inner.clear_results();
                inner.hide_overlay();
            }
        }
    }

    /// Acquire the viewport subscription for as long as the overlay is shown
    fn ensure_subscription(inner: &Arc<Self>) {
        let mut slot = inner.subscription.lock();
        if slot.is_some() {
            return;
        }
        let weak = Arc::downgrade(inner);
        let listener: ViewportListener = Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.reposition();
            }
        });
        *slot = Some(inner.viewport.subscribe(listener));
    }

    fn reposition(&self) {
        let rect = self.viewport.anchor_rect();
        let mut state = self.state.write();
        if state.overlay_visible {
            state.overlay_rect = Some(rect);
        }
    }

    fn clear_results(&self) {
        let mut state = self.state.write();
        state.results.clear();
        state.overlay_rect = None;
    }

    fn hide_overlay(&self) {
        self.state.write().overlay_visible = false;
        self.release_subscription();
    }

    fn release_subscription(&self) {
        self.subscription.lock().take();
    }
}

//! Viewport events seam
//!
//! The search overlay renders outside the host's layout flow, so it cannot
//! rely on flow-based positioning. Instead it reads the anchor input's
//! on-screen rectangle through this trait and subscribes to scroll/resize
//! notifications while visible. Subscriptions are scoped: dropping the
//! handle unregisters the listener.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Where the overlay must render, in host viewport coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverlayRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
}

/// Callback fired on every viewport scroll or resize
pub type ViewportListener = Arc<dyn Fn() + Send + Sync>;

/// Host-owned viewport geometry and event source
pub trait Viewport: Send + Sync {
    /// Current on-screen rectangle of the search anchor input
    fn anchor_rect(&self) -> OverlayRect;

    /// Register a scroll/resize listener for as long as the returned
    /// subscription is held
    fn subscribe(&self, listener: ViewportListener) -> ViewportSubscription;
}

/// Scoped listener registration; unregisters on drop
pub struct ViewportSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl ViewportSubscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for ViewportSubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Reference [`Viewport`] implementation driven by the host shell.
///
/// The host pushes anchor geometry with [`HostViewport::set_anchor_rect`] and
/// forwards scroll/resize events with [`HostViewport::fire`].
#[derive(Default)]
pub struct HostViewport {
    rect: RwLock<OverlayRect>,
    listeners: Arc<Mutex<HashMap<u64, ViewportListener>>>,
    next_id: AtomicU64,
}

impl HostViewport {
    pub fn new(rect: OverlayRect) -> Arc<Self> {
        Arc::new(Self {
            rect: RwLock::new(rect),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        })
    }

    /// Update the anchor rectangle and notify subscribers
    pub fn set_anchor_rect(&self, rect: OverlayRect) {
        *self.rect.write() = rect;
        self.fire();
    }

    /// Notify subscribers of a scroll/resize without a geometry change
    pub fn fire(&self) {
        let listeners: Vec<ViewportListener> = self.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener();
        }
    }

    /// Number of live subscriptions
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl Viewport for HostViewport {
    fn anchor_rect(&self) -> OverlayRect {
        *self.rect.read()
    }

    fn subscribe(&self, listener: ViewportListener) -> ViewportSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().insert(id, listener);

        let listeners = Arc::clone(&self.listeners);
        ViewportSubscription::new(move || {
            listeners.lock().remove(&id);
        })
    }
}

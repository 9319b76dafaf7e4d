//! Scalper Desk client core
//!
//! Client-side core of a stock-trading analytics platform: a debounced
//! symbol search component with a viewport-tracked overlay, and a polling
//! alert feed with optimistic read tracking and an interruptive popup for
//! high-severity items. The host shell supplies rendering, routing, and
//! credential storage; this crate owns the state machines and the backend
//! plumbing.

pub mod alerts;
pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod search;
pub mod viewport;

pub use alerts::{AlertFeed, AlertFeedState};
pub use auth::{CredentialStore, MemoryCredentialStore};
pub use backend::{HttpBackend, TradingBackend};
pub use config::ApiConfig;
pub use error::{AppError, Result};
pub use models::{AlertRecord, SearchResult, Severity};
pub use search::{SearchQueryState, SymbolSearch};
pub use viewport::{HostViewport, OverlayRect, Viewport, ViewportSubscription};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for hosts without their own subscriber
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scalper_desk=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

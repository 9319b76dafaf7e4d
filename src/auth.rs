//! Credential store seam
//!
//! Neither component owns credential lifecycle. They read the bearer token
//! through this trait and delegate 401 handling back to the host, which
//! typically clears the stored credential and navigates to a login view.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Host-owned credential storage
pub trait CredentialStore: Send + Sync {
    /// Current bearer token, if any. Absence means "skip authorized calls",
    /// never "use a fallback token".
    fn token(&self) -> Option<String>;

    /// Shared auth-failure handling for the given HTTP status
    fn on_auth_failure(&self, status: u16);
}

/// In-memory credential store for hosts without their own storage and for tests
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new(token: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            token: RwLock::new(token),
        })
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn on_auth_failure(&self, status: u16) {
        info!("Auth failure (status {}), clearing stored credential", status);
        *self.token.write() = None;
    }
}

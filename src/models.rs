//! Shared data model for search results and news alerts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One match returned by the symbol lookup endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub symbol: String,
    pub name: String,
    /// Instrument classification as reported by the backend (e.g. "EQUITY")
    #[serde(rename = "type")]
    pub asset_type: String,
    pub exchange: String,
}

/// Alert urgency, ordered Low < Medium < High
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

// The backend sends severity as a free-form string. Unknown values decode
// as Low rather than failing the whole payload.
impl From<String> for Severity {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
        }
    }
}

/// One news alert item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertRecord {
    pub id: String,
    pub symbol: String,
    pub title: String,
    pub summary: String,
    pub link: String,
    pub impact: String,
    pub severity: Severity,
    pub sentiment_impact: String,
    pub sentiment_score: f64,
    pub keywords: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub read: bool,
}

impl AlertRecord {
    /// High severity and not yet read, i.e. eligible for the popup
    pub fn is_interruptive(&self) -> bool {
        self.severity == Severity::High && !self.read
    }
}

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Broad classification of an error's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Client,
    Server,
    Network,
    Validation,
    NotFound,
    Unauthorized,
    Timeout,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Client,
        Category::Server,
        Category::Network,
        Category::Validation,
        Category::NotFound,
        Category::Unauthorized,
        Category::Timeout,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Category::Client => "client",
            Category::Server => "server",
            Category::Network => "network",
            Category::Validation => "validation",
            Category::NotFound => "not_found",
            Category::Unauthorized => "unauthorized",
            Category::Timeout => "timeout",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Returned by `Category::from_str` for unrecognised names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown error category {:?}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

/// Metadata attached to an error.
///
/// Zero values mean unset: empty strings and collections, `None`,
/// `false`, `0`, and `Duration::zero()`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Metadata {
    // ── Classification ────────────────────────────────────────
    pub code:           String,
    pub category:       Option<Category>,
    pub context:        BTreeMap<String, Value>,

    // ── Retry ─────────────────────────────────────────────────
    pub retryable:      bool,
    /// Never negative.
    pub retry_after:    Duration,
    pub max_retries:    u32,

    // ── Protocol status ───────────────────────────────────────
    pub http_status:    u16,
    pub mcp_code:       i32,

    // ── Identifiers ───────────────────────────────────────────
    pub correlation_id: String,
    pub request_id:     String,
    pub user_id:        String,
    pub session_id:     String,

    // ── Guidance ──────────────────────────────────────────────
    pub help:           String,
    pub suggestion:     String,
    pub docs_url:       String,

    // ── Grouping ──────────────────────────────────────────────
    pub tags:           Vec<String>,
    pub labels:         BTreeMap<String, String>,

    // ── Timing ────────────────────────────────────────────────
    pub timestamp:      Option<DateTime<Utc>>,
    /// May be negative.
    pub duration:       Duration,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            code:           String::new(),
            category:       None,
            context:        BTreeMap::new(),
            retryable:      false,
            retry_after:    Duration::zero(),
            max_retries:    0,
            http_status:    0,
            mcp_code:       0,
            correlation_id: String::new(),
            request_id:     String::new(),
            user_id:        String::new(),
            session_id:     String::new(),
            help:           String::new(),
            suggestion:     String::new(),
            docs_url:       String::new(),
            tags:           Vec::new(),
            labels:         BTreeMap::new(),
            timestamp:      None,
            duration:       Duration::zero(),
        }
    }
}

/// Set `slot` unless `value` is empty.
pub(crate) fn set_nonempty(slot: &mut String, value: &str) {
    if !value.is_empty() {
        *slot = value.to_string();
    }
}

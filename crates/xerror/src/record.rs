//! The structured form of an `XError`, used for JSON and compact output.

use std::collections::BTreeMap;

use chrono::{Duration, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{self, RenderSettings, Visibility};
use crate::context::Category;
use crate::error::XError;
use crate::render;

/// A flat, serialisable snapshot of an `XError`.
///
/// Unset fields are omitted from JSON entirely. Durations are rendered as
/// text such as `"1.5s"`, timestamps as RFC 3339.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub error: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub retry_after: String,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub max_retries: u32,
    #[serde(default, skip_serializing_if = "is_zero_u16")]
    pub http_status: u16,
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub mcp_code: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docs_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub duration: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub caller: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wrapped: Vec<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero_u32(n: &u32) -> bool {
    *n == 0
}

fn is_zero_u16(n: &u16) -> bool {
    *n == 0
}

fn is_zero_i32(n: &i32) -> bool {
    *n == 0
}

impl ErrorRecord {
    /// Every populated field of `err`.
    pub fn from_error(err: &XError) -> Self {
        Self::filtered(err, &Visibility::for_verbosity(crate::config::Verbosity::Full))
    }

    /// Populated fields of `err` that `visibility` lets through. Nested
    /// errors are rendered with the configured caller position and layout.
    pub fn filtered(err: &XError, visibility: &Visibility) -> Self {
        let settings = RenderSettings {
            visibility: *visibility,
            ..config::render_settings()
        };
        Self::snapshot(err, &settings)
    }

    /// Like [`filtered`](Self::filtered), with every render setting taken
    /// from one copy.
    pub(crate) fn snapshot(err: &XError, settings: &RenderSettings) -> Self {
        let visibility = &settings.visibility;
        let m = err.metadata();
        let mut r = ErrorRecord {
            error: err.message(),
            wrapped: err.wrapped().map(|w| render::wrapped_text(w, settings)).collect(),
            ..ErrorRecord::default()
        };

        if visibility.code {
            r.code = m.code.clone();
        }
        if visibility.category {
            r.category = m.category;
        }
        if visibility.context {
            r.context = m.context.clone();
        }
        if visibility.retry {
            r.retryable = m.retryable;
            r.retry_after = format_nonzero(m.retry_after);
            r.max_retries = m.max_retries;
        }
        if visibility.http_status {
            r.http_status = m.http_status;
        }
        if visibility.mcp {
            r.mcp_code = m.mcp_code;
        }
        if visibility.identifiers {
            r.correlation_id = m.correlation_id.clone();
            r.request_id = m.request_id.clone();
            r.user_id = m.user_id.clone();
            r.session_id = m.session_id.clone();
        }
        if visibility.help {
            r.help = m.help.clone();
            r.suggestion = m.suggestion.clone();
            r.docs_url = m.docs_url.clone();
        }
        if visibility.tags {
            r.tags = m.tags.clone();
        }
        if visibility.labels {
            r.labels = m.labels.clone();
        }
        if visibility.timestamps {
            r.timestamp = m
                .timestamp
                .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
                .unwrap_or_default();
            r.duration = format_nonzero(m.duration);
        }
        if visibility.caller {
            r.caller = err.caller().to_string();
            r.stack = err.stack().to_vec();
        }
        r
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Populated fields as `(key, text)` pairs in serialisation order.
    /// Context and label entries are keyed `context.<k>` and `labels.<k>`.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Vec::new();
        let mut push = |key: &str, value: String| {
            if !value.is_empty() {
                out.push((key.to_string(), value));
            }
        };

        push("error", self.error.clone());
        push("code", self.code.clone());
        push("category", self.category.map(|c| c.to_string()).unwrap_or_default());
        for (k, v) in &self.context {
            push(&format!("context.{}", k), value_text(v));
        }
        if self.retryable {
            push("retryable", "true".to_string());
        }
        push("retry_after", self.retry_after.clone());
        push("max_retries", nonzero(self.max_retries));
        push("http_status", nonzero(self.http_status));
        push("mcp_code", nonzero(self.mcp_code));
        push("correlation_id", self.correlation_id.clone());
        push("request_id", self.request_id.clone());
        push("user_id", self.user_id.clone());
        push("session_id", self.session_id.clone());
        push("help", self.help.clone());
        push("suggestion", self.suggestion.clone());
        push("docs_url", self.docs_url.clone());
        push("tags", self.tags.join(","));
        for (k, v) in &self.labels {
            push(&format!("labels.{}", k), v.clone());
        }
        push("timestamp", self.timestamp.clone());
        push("duration", self.duration.clone());
        push("caller", self.caller.clone());
        push("stack", self.stack.join(","));
        push("wrapped", self.wrapped.join("; "));
        out
    }
}

fn nonzero<N: PartialEq + Default + ToString>(n: N) -> String {
    if n == N::default() {
        String::new()
    } else {
        n.to_string()
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn format_nonzero(d: Duration) -> String {
    if d.is_zero() {
        String::new()
    } else {
        format_duration(d)
    }
}

// ── Duration text ─────────────────────────────────────────────────

const NANOS_PER_MICRO:  u128 = 1_000;
const NANOS_PER_MILLI:  u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR:   u128 = 60 * NANOS_PER_MINUTE;

/// Render `d` as `"1h2m3.5s"`, `"250ms"`, `"-5s"` or `"0s"`.
///
/// Below one second the largest fitting unit of `ms`, `µs` and `ns` is
/// used. Fractions drop trailing zeros.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.num_seconds() as i128 * NANOS_PER_SECOND as i128 + d.subsec_nanos() as i128;
    if nanos == 0 {
        return "0s".to_string();
    }
    let sign = if nanos < 0 { "-" } else { "" };
    let n = nanos.unsigned_abs();

    let body = if n < NANOS_PER_MICRO {
        format!("{}ns", n)
    } else if n < NANOS_PER_MILLI {
        format!("{}µs", decimal(n, NANOS_PER_MICRO, 3))
    } else if n < NANOS_PER_SECOND {
        format!("{}ms", decimal(n, NANOS_PER_MILLI, 6))
    } else {
        let hours = n / NANOS_PER_HOUR;
        let minutes = (n % NANOS_PER_HOUR) / NANOS_PER_MINUTE;
        let seconds = decimal(n % NANOS_PER_MINUTE, NANOS_PER_SECOND, 9);
        if hours > 0 {
            format!("{}h{}m{}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m{}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    };
    format!("{}{}", sign, body)
}

/// `value / unit` with up to `digits` fractional digits, trailing zeros cut.
fn decimal(value: u128, unit: u128, digits: usize) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = digits);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

//! Field lookups over arbitrary errors.
//!
//! Each function finds the first [`XError`] reachable from `err` and returns
//! one of its fields. `None` input, or a chain without an `XError`, yields
//! the field's zero value. These never panic.
//!
//! ```
//! use xerror::{extract, Sentinel};
//!
//! static ERR_AUTH: Sentinel = Sentinel::new("unauthorized");
//!
//! let err = ERR_AUTH.err().with_http_status(401);
//! assert_eq!(extract::http_status(Some(&err)), 401);
//! assert_eq!(extract::http_status(None), 0);
//!
//! let io = std::io::Error::new(std::io::ErrorKind::Other, "plain");
//! assert_eq!(extract::code(Some(&io)), "");
//! ```

use std::collections::BTreeMap;
use std::error::Error;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::chain;
use crate::context::Category;
use crate::error::XError;

/// The first `XError` reachable from `err`.
pub fn annotated<'a>(err: Option<&'a (dyn Error + 'static)>) -> Option<&'a XError> {
    err.and_then(chain::find::<XError>)
}

fn string_field(err: Option<&(dyn Error + 'static)>, get: fn(&XError) -> &str) -> String {
    annotated(err).map(|x| get(x).to_string()).unwrap_or_default()
}

pub fn code(err: Option<&(dyn Error + 'static)>) -> String {
    string_field(err, XError::code)
}

pub fn category(err: Option<&(dyn Error + 'static)>) -> Option<Category> {
    annotated(err).and_then(XError::category)
}

pub fn context(err: Option<&(dyn Error + 'static)>) -> BTreeMap<String, Value> {
    annotated(err).map(|x| x.context().clone()).unwrap_or_default()
}

pub fn retryable(err: Option<&(dyn Error + 'static)>) -> bool {
    annotated(err).map_or(false, XError::retryable)
}

pub fn retry_after(err: Option<&(dyn Error + 'static)>) -> Duration {
    annotated(err).map_or_else(Duration::zero, XError::retry_after)
}

pub fn max_retries(err: Option<&(dyn Error + 'static)>) -> u32 {
    annotated(err).map_or(0, XError::max_retries)
}

pub fn http_status(err: Option<&(dyn Error + 'static)>) -> u16 {
    annotated(err).map_or(0, XError::http_status)
}

pub fn mcp_code(err: Option<&(dyn Error + 'static)>) -> i32 {
    annotated(err).map_or(0, XError::mcp_code)
}

pub fn correlation_id(err: Option<&(dyn Error + 'static)>) -> String {
    string_field(err, XError::correlation_id)
}

pub fn request_id(err: Option<&(dyn Error + 'static)>) -> String {
    string_field(err, XError::request_id)
}

pub fn user_id(err: Option<&(dyn Error + 'static)>) -> String {
    string_field(err, XError::user_id)
}

pub fn session_id(err: Option<&(dyn Error + 'static)>) -> String {
    string_field(err, XError::session_id)
}

pub fn help(err: Option<&(dyn Error + 'static)>) -> String {
    string_field(err, XError::help)
}

pub fn suggestion(err: Option<&(dyn Error + 'static)>) -> String {
    string_field(err, XError::suggestion)
}

pub fn docs_url(err: Option<&(dyn Error + 'static)>) -> String {
    string_field(err, XError::docs_url)
}

pub fn tags(err: Option<&(dyn Error + 'static)>) -> Vec<String> {
    annotated(err).map(|x| x.tags().to_vec()).unwrap_or_default()
}

pub fn labels(err: Option<&(dyn Error + 'static)>) -> BTreeMap<String, String> {
    annotated(err).map(|x| x.labels().clone()).unwrap_or_default()
}

pub fn timestamp(err: Option<&(dyn Error + 'static)>) -> Option<DateTime<Utc>> {
    annotated(err).and_then(XError::timestamp)
}

pub fn duration(err: Option<&(dyn Error + 'static)>) -> Duration {
    annotated(err).map_or_else(Duration::zero, XError::duration)
}

pub fn caller(err: Option<&(dyn Error + 'static)>) -> String {
    string_field(err, XError::caller)
}

pub fn stack(err: Option<&(dyn Error + 'static)>) -> Vec<String> {
    annotated(err).map(|x| x.stack().to_vec()).unwrap_or_default()
}

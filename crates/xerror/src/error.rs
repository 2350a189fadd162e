use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::codes;
use crate::config;
use crate::context::{set_nonempty, Category, Metadata};
use crate::sentinel::Sentinel;
use crate::site::{self, Site};

/// A shared, type-erased error in an `XError`'s chain.
pub(crate) type Cause = Arc<dyn Error + Send + Sync + 'static>;

pub(crate) fn cause<E>(error: E) -> Cause
where
    E: Error + Send + Sync + 'static,
{
    Arc::new(error)
}

/// A formatted message standing in as a primary or wrapped error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Message(pub String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for Message {}

/// An annotated error value.
///
/// `XError` is a cheap handle to an immutable record. Every `with_*`
/// method consumes the handle and returns a new one; the record is copied
/// first whenever another clone still shares it, so no clone ever observes
/// another's changes. Once built, an `XError` can be read from any number of
/// threads without synchronisation.
///
/// Three groups of errors hang off a value:
///
/// - **primary**: rendered first, the sentinel or a formatted message.
/// - **wrapped**: rendered after the primary, one per line or inline.
/// - **absorbed**: never rendered, still matched by [`XError::is`].
///
/// ```
/// use xerror::{Category, Sentinel};
///
/// static ERR_QUERY: Sentinel = Sentinel::new("database query failed");
///
/// let err = ERR_QUERY
///     .err()
///     .with_code("DB001")
///     .with_category(Category::Server)
///     .with_retryable(true);
///
/// assert_eq!(err.code(), "DB001");
/// assert!(err.is(&ERR_QUERY));
/// ```
#[derive(Clone)]
pub struct XError {
    inner: Arc<Inner>,
}

#[derive(Clone)]
struct Inner {
    primary:  Cause,
    wrapped:  Vec<Cause>,
    absorbed: Vec<Cause>,
    caller:   String,
    stack:    Vec<String>,
    meta:     Metadata,
}

// ── Constructors ──────────────────────────────────────────────────

impl XError {
    /// Annotate an arbitrary error. It becomes the primary cause.
    #[track_caller]
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::build(cause(error), Vec::new(), Vec::new(), Site::here())
    }

    #[doc(hidden)]
    pub fn __new_at<E>(error: E, site: Site) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::build(cause(error), Vec::new(), Vec::new(), site)
    }

    pub(crate) fn from_sentinel(sentinel: Sentinel, wrapped: Vec<Cause>, site: Site) -> Self {
        Self::build(cause(sentinel), wrapped, Vec::new(), site)
    }

    pub(crate) fn formatted_from_sentinel(sentinel: Sentinel, message: String, site: Site) -> Self {
        Self::build(cause(Message(message)), Vec::new(), vec![cause(sentinel)], site)
    }

    fn build(primary: Cause, wrapped: Vec<Cause>, absorbed: Vec<Cause>, site: Site) -> Self {
        let settings = config::capture_settings();
        let inherited = if settings.stack {
            inherited_stack(std::iter::once(&primary).chain(wrapped.iter()))
        } else {
            None
        };
        let captured = site::capture(&site, &settings, inherited.as_deref());
        Self {
            inner: Arc::new(Inner {
                primary,
                wrapped,
                absorbed,
                caller: captured.caller,
                stack: captured.stack,
                meta: Metadata::default(),
            }),
        }
    }

    fn edit(mut self, f: impl FnOnce(&mut Inner)) -> Self {
        f(Arc::make_mut(&mut self.inner));
        self
    }
}

/// First non-empty stack carried by an `XError` in any of `causes`' chains.
fn inherited_stack<'a, I>(causes: I) -> Option<Vec<String>>
where
    I: IntoIterator<Item = &'a Cause>,
{
    causes.into_iter().find_map(|c| {
        crate::chain::walk(c.as_ref())
            .filter_map(|e| e.downcast_ref::<XError>())
            .find(|x| !x.inner.stack.is_empty())
            .map(|x| x.inner.stack.clone())
    })
}

// ── Composition ───────────────────────────────────────────────────

impl XError {
    /// Append `": suffix"` to the primary message. The previous primary is
    /// kept for matching but no longer rendered on its own.
    pub fn wrapf(self, suffix: impl fmt::Display) -> Self {
        self.edit(|inner| {
            let message = format!("{}: {}", inner.primary, suffix);
            let previous = std::mem::replace(&mut inner.primary, cause(Message(message)));
            inner.absorbed.push(previous);
        })
    }

    /// Add a formatted error rendered after the primary message.
    pub fn attachf(self, message: impl fmt::Display) -> Self {
        self.edit(|inner| inner.wrapped.push(cause(Message(message.to_string()))))
    }

    /// Add errors rendered after the primary message.
    pub fn join<I, E>(self, errors: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Error + Send + Sync + 'static,
    {
        self.edit(|inner| inner.wrapped.extend(errors.into_iter().map(cause)))
    }
}

// ── Metadata setters ──────────────────────────────────────────────

impl XError {
    pub fn with_code(self, code: &str) -> Self {
        self.set_string(code, |m| &mut m.code)
    }

    pub fn with_category(self, category: Category) -> Self {
        self.edit(|inner| inner.meta.category = Some(category))
    }

    /// Attach one context entry. An empty key is ignored.
    pub fn with_context(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key.is_empty() {
            return self;
        }
        let value = value.into();
        self.edit(|inner| {
            inner.meta.context.insert(key, value);
        })
    }

    /// Merge context entries. Empty keys are ignored.
    pub fn with_context_map<I, K, V>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let entries: Vec<(String, Value)> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        if entries.is_empty() {
            return self;
        }
        self.edit(|inner| inner.meta.context.extend(entries))
    }

    pub fn with_retryable(self, retryable: bool) -> Self {
        self.edit(|inner| inner.meta.retryable = retryable)
    }

    /// Negative delays are stored as zero.
    pub fn with_retry_after(self, delay: Duration) -> Self {
        let delay = delay.max(Duration::zero());
        self.edit(|inner| inner.meta.retry_after = delay)
    }

    /// Negative counts are stored as zero.
    pub fn with_max_retries(self, max: i32) -> Self {
        let max = max.max(0) as u32;
        self.edit(|inner| inner.meta.max_retries = max)
    }

    /// # Panics
    ///
    /// If `status` is neither `0` nor within `100..=599`.
    #[track_caller]
    pub fn with_http_status(self, status: i32) -> Self {
        codes::check_http_status(status);
        self.edit(|inner| inner.meta.http_status = status as u16)
    }

    /// # Panics
    ///
    /// If `code` is neither `0` nor within the JSON-RPC 2.0 reserved range
    /// `-32768..=-32000`.
    #[track_caller]
    pub fn with_mcp_code(self, code: i32) -> Self {
        codes::check_mcp_code(code);
        self.edit(|inner| inner.meta.mcp_code = code)
    }

    pub fn with_correlation_id(self, id: &str) -> Self {
        self.set_string(id, |m| &mut m.correlation_id)
    }

    pub fn with_request_id(self, id: &str) -> Self {
        self.set_string(id, |m| &mut m.request_id)
    }

    pub fn with_user_id(self, id: &str) -> Self {
        self.set_string(id, |m| &mut m.user_id)
    }

    pub fn with_session_id(self, id: &str) -> Self {
        self.set_string(id, |m| &mut m.session_id)
    }

    pub fn with_help(self, help: &str) -> Self {
        self.set_string(help, |m| &mut m.help)
    }

    pub fn with_suggestion(self, suggestion: &str) -> Self {
        self.set_string(suggestion, |m| &mut m.suggestion)
    }

    pub fn with_docs_url(self, url: &str) -> Self {
        self.set_string(url, |m| &mut m.docs_url)
    }

    /// Append tags. Duplicates are kept; empty tags are skipped.
    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).filter(|t| !t.is_empty()).collect();
        if tags.is_empty() {
            return self;
        }
        self.edit(|inner| inner.meta.tags.extend(tags))
    }

    /// Set one label, replacing any previous value for `key`.
    pub fn with_label(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_labels([(key.into(), value.into())])
    }

    /// Merge labels into the existing set; later values win.
    pub fn with_labels<I, K, V>(self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let labels: Vec<(String, String)> = labels
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        if labels.is_empty() {
            return self;
        }
        self.edit(|inner| inner.meta.labels.extend(labels))
    }

    pub fn with_timestamp(self, at: DateTime<Utc>) -> Self {
        self.edit(|inner| inner.meta.timestamp = Some(at))
    }

    /// Stored as given; negative durations are kept.
    pub fn with_duration(self, duration: Duration) -> Self {
        self.edit(|inner| inner.meta.duration = duration)
    }

    fn set_string(self, value: &str, slot: fn(&mut Metadata) -> &mut String) -> Self {
        if value.is_empty() {
            return self;
        }
        self.edit(|inner| set_nonempty(slot(&mut inner.meta), value))
    }
}

// ── Accessors ─────────────────────────────────────────────────────

impl XError {
    /// Primary message without caller, wrapped errors or stack.
    pub fn message(&self) -> String {
        self.inner.primary.to_string()
    }

    pub fn primary(&self) -> &(dyn Error + 'static) {
        self.inner.primary.as_ref()
    }

    /// Errors rendered after the primary message, in order.
    pub fn wrapped(&self) -> impl Iterator<Item = &(dyn Error + 'static)> + '_ {
        self.inner.wrapped.iter().map(|c| c.as_ref() as &(dyn Error + 'static))
    }

    /// `"file:line.function"` captured at construction, possibly empty.
    pub fn caller(&self) -> &str {
        &self.inner.caller
    }

    /// Formatted parent frames, empty unless stack capture was enabled
    /// when this error was built.
    pub fn stack(&self) -> &[String] {
        &self.inner.stack
    }

    pub fn code(&self) -> &str {
        &self.inner.meta.code
    }

    pub fn category(&self) -> Option<Category> {
        self.inner.meta.category
    }

    pub fn context(&self) -> &BTreeMap<String, Value> {
        &self.inner.meta.context
    }

    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.inner.meta.context.get(key)
    }

    pub fn retryable(&self) -> bool {
        self.inner.meta.retryable
    }

    pub fn retry_after(&self) -> Duration {
        self.inner.meta.retry_after
    }

    pub fn max_retries(&self) -> u32 {
        self.inner.meta.max_retries
    }

    pub fn http_status(&self) -> u16 {
        self.inner.meta.http_status
    }

    pub fn mcp_code(&self) -> i32 {
        self.inner.meta.mcp_code
    }

    pub fn correlation_id(&self) -> &str {
        &self.inner.meta.correlation_id
    }

    pub fn request_id(&self) -> &str {
        &self.inner.meta.request_id
    }

    pub fn user_id(&self) -> &str {
        &self.inner.meta.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.inner.meta.session_id
    }

    pub fn help(&self) -> &str {
        &self.inner.meta.help
    }

    pub fn suggestion(&self) -> &str {
        &self.inner.meta.suggestion
    }

    pub fn docs_url(&self) -> &str {
        &self.inner.meta.docs_url
    }

    pub fn tags(&self) -> &[String] {
        &self.inner.meta.tags
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.inner.meta.labels
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.inner.meta.timestamp
    }

    pub fn duration(&self) -> Duration {
        self.inner.meta.duration
    }

    pub(crate) fn metadata(&self) -> &Metadata {
        &self.inner.meta
    }

    pub(crate) fn primary_cause(&self) -> &Cause {
        &self.inner.primary
    }

    pub(crate) fn wrapped_causes(&self) -> &[Cause] {
        &self.inner.wrapped
    }

    pub(crate) fn absorbed_causes(&self) -> &[Cause] {
        &self.inner.absorbed
    }

    /// `true` if both handles share one record.
    pub fn ptr_eq(&self, other: &XError) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ── std::error::Error ─────────────────────────────────────────────

impl Error for XError {
    /// The first entry of [`XError::causes`].
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.causes().next()
    }
}

impl fmt::Display for XError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::render::render(self, f)
    }
}

impl fmt::Debug for XError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &self.inner;
        let mut d = f.debug_struct("XError");
        d.field("primary", &inner.primary.to_string());
        if !inner.wrapped.is_empty() {
            let wrapped: Vec<String> = inner.wrapped.iter().map(|c| c.to_string()).collect();
            d.field("wrapped", &wrapped);
        }
        if !inner.absorbed.is_empty() {
            d.field("absorbed", &inner.absorbed.len());
        }
        if !inner.caller.is_empty() {
            d.field("caller", &inner.caller);
        }
        if !inner.stack.is_empty() {
            d.field("stack", &inner.stack);
        }
        if inner.meta != Metadata::default() {
            d.field("metadata", &inner.meta);
        }
        d.finish()
    }
}

impl From<Sentinel> for XError {
    #[track_caller]
    fn from(sentinel: Sentinel) -> Self {
        XError::from_sentinel(sentinel, Vec::new(), Site::here())
    }
}

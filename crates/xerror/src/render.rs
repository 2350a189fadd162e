//! Text rendering of `XError`.
//!
//! `Display` dispatches on the configured [`OutputFormat`]. Caller
//! position, layout, format and field visibility are read from the
//! configuration on every render; the caller and stack strings themselves
//! were fixed when the error was built.

use std::error::Error;
use std::fmt;

use crate::config::{self, CallerPosition, Layout, OutputFormat, RenderSettings};
use crate::error::XError;
use crate::record::ErrorRecord;

/// Separator between wrapped errors in [`Layout::Inline`].
pub const INLINE_SEPARATOR: &str = " | ";

pub(crate) fn render(err: &XError, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let settings = config::render_settings();
    f.write_str(&render_with(err, &settings, settings.format))
}

fn render_with(err: &XError, settings: &RenderSettings, format: OutputFormat) -> String {
    match format {
        OutputFormat::Pretty => pretty(err, settings.position, settings.layout),
        OutputFormat::Json => {
            let record = ErrorRecord::snapshot(err, settings);
            record
                .to_json()
                .unwrap_or_else(|_| pretty(err, settings.position, settings.layout))
        }
        OutputFormat::JsonIndent => {
            let record = ErrorRecord::snapshot(err, settings);
            record
                .to_json_pretty()
                .unwrap_or_else(|_| pretty(err, settings.position, settings.layout))
        }
        OutputFormat::Compact => compact(&ErrorRecord::snapshot(err, settings)),
    }
}

impl XError {
    /// Render in `format` regardless of the configured output format. The
    /// rest of the configuration still applies.
    pub fn render(&self, format: OutputFormat) -> String {
        render_with(self, &config::render_settings(), format)
    }

    /// The [`ErrorRecord`] under the current field visibility.
    pub fn to_record(&self) -> ErrorRecord {
        ErrorRecord::snapshot(self, &config::render_settings())
    }
}

// ── Pretty ────────────────────────────────────────────────────────

fn pretty(err: &XError, position: CallerPosition, layout: Layout) -> String {
    let message = err.message();
    let caller = err.caller();

    let mut out = match position {
        _ if caller.is_empty() => message,
        CallerPosition::Disabled => message,
        CallerPosition::Prefix => format!("[{}] {}", caller, message),
        CallerPosition::Suffix => format!("{} [{}]", message, caller),
    };

    for wrapped in err.wrapped() {
        let text = match wrapped.downcast_ref::<XError>() {
            Some(inner) => pretty(inner, position, layout),
            None => wrapped.to_string(),
        };
        match layout {
            Layout::Newline => out.push('\n'),
            Layout::Inline => out.push_str(INLINE_SEPARATOR),
        }
        out.push_str(&text);
    }

    let stack = stack_block(err.stack());
    if !stack.is_empty() {
        out = out.replace(&stack, "");
        out.push_str(&stack);
    }
    out
}

/// Each frame on its own tab-indented line.
fn stack_block(stack: &[String]) -> String {
    stack.iter().map(|frame| format!("\n\t{}", frame)).collect()
}

/// Text used for one wrapped entry in structured output. Nested `XError`s
/// are rendered pretty so JSON is never embedded in JSON.
pub(crate) fn wrapped_text(err: &(dyn Error + 'static), settings: &RenderSettings) -> String {
    match err.downcast_ref::<XError>() {
        Some(inner) => pretty(inner, settings.position, settings.layout),
        None => err.to_string(),
    }
}

// ── Compact ───────────────────────────────────────────────────────

fn compact(record: &ErrorRecord) -> String {
    record
        .pairs()
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, quote(&value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(value: &str) -> String {
    if value.chars().any(|c| c.is_whitespace() || c == '=' || c == '"') {
        format!("{:?}", value)
    } else {
        value.to_string()
    }
}

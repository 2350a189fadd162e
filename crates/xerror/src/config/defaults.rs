//! Hardcoded defaults. Every `configure` call starts from these values.

use super::{CallerPosition, Layout, OutputFormat, Verbosity};

pub const CALLER_POSITION: CallerPosition = CallerPosition::Suffix;
pub const LAYOUT:          Layout         = Layout::Newline;
pub const STACK:           bool           = false;
pub const TRIM_CWD:        bool           = false;
pub const FORMAT:          OutputFormat   = OutputFormat::Pretty;
pub const VERBOSITY:       Verbosity      = Verbosity::Full;

/// Visibility of the fields verbosity does not govern.
pub const SHOW_IDENTIFIERS: bool = true;
pub const SHOW_HELP:        bool = true;
pub const SHOW_CALLER:      bool = true;

//! Process-wide rendering configuration.
//!
//! One global [`Config`] governs how every [`XError`](crate::XError) is
//! captured and rendered. [`configure`] always rebuilds the whole
//! configuration from [`defaults`], applying the supplied options left to
//! right, and swaps it in under a write lock. Readers take the read lock only
//! long enough to copy out the settings they need.
//!
//! Two groups of settings are resolved at different times:
//!
//! | Setting                         | Resolved at      |
//! |---------------------------------|------------------|
//! | caller position, layout, format, visibility | render time |
//! | stack capture, path trimming    | construction time|
//!
//! ```
//! use xerror::config::{self, CallerPosition, ConfigOption, Layout};
//!
//! config::configure([
//!     ConfigOption::CallerPosition(CallerPosition::Prefix),
//!     ConfigOption::Layout(Layout::Inline),
//! ]);
//! assert_eq!(config::config().caller_position, CallerPosition::Prefix);
//! config::reset();
//! ```

pub mod defaults;

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::site::TrimRules;

// ── Option enums ──────────────────────────────────────────────────

/// Where the captured caller is placed relative to the primary message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallerPosition {
    /// `message [caller]`
    Suffix,
    /// `[caller] message`
    Prefix,
    /// caller omitted
    Disabled,
}

/// How wrapped (auxiliary) errors are laid out after the primary message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// One wrapped error per line.
    Newline,
    /// Wrapped errors joined on the same line with a separator.
    Inline,
}

/// Output produced by `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Pretty,
    Json,
    JsonIndent,
    Compact,
}

/// Preset for the nine verbosity-governed field flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verbosity {
    /// All nine off.
    Minimal,
    /// Code, category and context on.
    Standard,
    /// All nine on.
    Full,
    /// Flags were set individually.
    Custom,
}

/// A field group whose presence in structured output can be toggled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Code,
    Category,
    Context,
    HttpStatus,
    /// `retryable`, `retry_after`, `max_retries`
    Retry,
    /// `mcp_code`
    Mcp,
    Tags,
    Labels,
    /// `timestamp`, `duration`
    Timestamps,
    /// correlation, request, user and session ids
    Identifiers,
    /// `help`, `suggestion`, `docs_url`
    Help,
    /// `caller`, `stack`
    Caller,
}

impl Field {
    /// Every field, verbosity-governed ones first.
    pub const ALL: [Field; 12] = [
        Field::Code,
        Field::Category,
        Field::Context,
        Field::HttpStatus,
        Field::Retry,
        Field::Mcp,
        Field::Tags,
        Field::Labels,
        Field::Timestamps,
        Field::Identifiers,
        Field::Help,
        Field::Caller,
    ];
}

/// One configuration option. Pass any number of these to [`configure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOption {
    CallerPosition(CallerPosition),
    Layout(Layout),
    /// Capture a filtered call stack at construction time.
    Stack(bool),
    /// Path prefixes stripped from captured file paths. Appends.
    TrimPaths(Vec<String>),
    /// Also strip the current working directory.
    TrimCwd(bool),
    Format(OutputFormat),
    Verbosity(Verbosity),
    /// Toggle one field; switches verbosity to [`Verbosity::Custom`].
    Show(Field, bool),
}

// ── Visibility ────────────────────────────────────────────────────

/// Which field groups appear in JSON and compact output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub code:        bool,
    pub category:    bool,
    pub context:     bool,
    pub http_status: bool,
    pub retry:       bool,
    pub mcp:         bool,
    pub tags:        bool,
    pub labels:      bool,
    pub timestamps:  bool,
    pub identifiers: bool,
    pub help:        bool,
    pub caller:      bool,
}

impl Visibility {
    /// Flags for `verbosity`, with the ungoverned fields at their defaults.
    pub fn for_verbosity(verbosity: Verbosity) -> Self {
        let mut v = Self {
            code:        false,
            category:    false,
            context:     false,
            http_status: false,
            retry:       false,
            mcp:         false,
            tags:        false,
            labels:      false,
            timestamps:  false,
            identifiers: defaults::SHOW_IDENTIFIERS,
            help:        defaults::SHOW_HELP,
            caller:      defaults::SHOW_CALLER,
        };
        v.apply_verbosity(verbosity);
        v
    }

    /// Overwrite the nine verbosity-governed flags. `Custom` leaves them.
    fn apply_verbosity(&mut self, verbosity: Verbosity) {
        let (basic, rest) = match verbosity {
            Verbosity::Minimal => (false, false),
            Verbosity::Standard => (true, false),
            Verbosity::Full => (true, true),
            Verbosity::Custom => return,
        };
        self.code = basic;
        self.category = basic;
        self.context = basic;
        self.http_status = rest;
        self.retry = rest;
        self.mcp = rest;
        self.tags = rest;
        self.labels = rest;
        self.timestamps = rest;
    }

    pub fn shows(&self, field: Field) -> bool {
        match field {
            Field::Code => self.code,
            Field::Category => self.category,
            Field::Context => self.context,
            Field::HttpStatus => self.http_status,
            Field::Retry => self.retry,
            Field::Mcp => self.mcp,
            Field::Tags => self.tags,
            Field::Labels => self.labels,
            Field::Timestamps => self.timestamps,
            Field::Identifiers => self.identifiers,
            Field::Help => self.help,
            Field::Caller => self.caller,
        }
    }

    fn set(&mut self, field: Field, on: bool) {
        let flag = match field {
            Field::Code => &mut self.code,
            Field::Category => &mut self.category,
            Field::Context => &mut self.context,
            Field::HttpStatus => &mut self.http_status,
            Field::Retry => &mut self.retry,
            Field::Mcp => &mut self.mcp,
            Field::Tags => &mut self.tags,
            Field::Labels => &mut self.labels,
            Field::Timestamps => &mut self.timestamps,
            Field::Identifiers => &mut self.identifiers,
            Field::Help => &mut self.help,
            Field::Caller => &mut self.caller,
        };
        *flag = on;
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::for_verbosity(defaults::VERBOSITY)
    }
}

// ── Config ────────────────────────────────────────────────────────

/// The complete process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub caller_position: CallerPosition,
    pub layout:          Layout,
    pub stack:           bool,
    pub trim_paths:      Vec<String>,
    /// Stays `false` when the working directory could not be resolved.
    pub trim_cwd:        bool,
    /// Resolved working directory, set only while `trim_cwd` is on.
    pub cwd:             Option<String>,
    pub format:          OutputFormat,
    pub verbosity:       Verbosity,
    pub visibility:      Visibility,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Hardcoded defaults.
    pub fn new() -> Self {
        Self {
            caller_position: defaults::CALLER_POSITION,
            layout:          defaults::LAYOUT,
            stack:           defaults::STACK,
            trim_paths:      Vec::new(),
            trim_cwd:        defaults::TRIM_CWD,
            cwd:             None,
            format:          defaults::FORMAT,
            verbosity:       defaults::VERBOSITY,
            visibility:      Visibility::for_verbosity(defaults::VERBOSITY),
        }
    }

    /// Defaults with `options` applied in order.
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = ConfigOption>,
    {
        let mut config = Self::new();
        for option in options {
            config.apply(option);
        }
        if config.trim_cwd {
            match std::env::current_dir() {
                Ok(dir) => config.cwd = Some(dir.to_string_lossy().into_owned()),
                Err(e) => {
                    warn!(error = %e, "cannot resolve working directory, cwd trimming disabled");
                    config.trim_cwd = false;
                }
            }
        }
        config
    }

    fn apply(&mut self, option: ConfigOption) {
        match option {
            ConfigOption::CallerPosition(p) => self.caller_position = p,
            ConfigOption::Layout(l) => self.layout = l,
            ConfigOption::Stack(on) => self.stack = on,
            ConfigOption::TrimPaths(paths) => {
                self.trim_paths.extend(paths.into_iter().filter(|p| !p.is_empty()));
            }
            ConfigOption::TrimCwd(on) => self.trim_cwd = on,
            ConfigOption::Format(f) => self.format = f,
            ConfigOption::Verbosity(v) => {
                self.verbosity = v;
                self.visibility.apply_verbosity(v);
            }
            ConfigOption::Show(field, on) => {
                self.visibility.set(field, on);
                self.verbosity = Verbosity::Custom;
            }
        }
    }

    fn trim_rules(&self) -> TrimRules {
        let mut prefixes = self.trim_paths.clone();
        if let Some(cwd) = &self.cwd {
            prefixes.push(cwd.clone());
        }
        TrimRules::new(prefixes)
    }
}

// ── Snapshots handed to readers ───────────────────────────────────

/// Settings read on every render.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RenderSettings {
    pub position:   CallerPosition,
    pub layout:     Layout,
    pub format:     OutputFormat,
    pub visibility: Visibility,
}

/// Settings read on every construction.
#[derive(Debug, Clone)]
pub(crate) struct CaptureSettings {
    pub stack: bool,
    pub trim:  Arc<TrimRules>,
}

struct Store {
    config:  Config,
    render:  RenderSettings,
    capture: CaptureSettings,
}

impl Store {
    fn build(config: Config) -> Self {
        let render = RenderSettings {
            position:   config.caller_position,
            layout:     config.layout,
            format:     config.format,
            visibility: config.visibility,
        };
        let capture = CaptureSettings {
            stack: config.stack,
            trim:  Arc::new(config.trim_rules()),
        };
        Self { config, render, capture }
    }
}

static STORE: Lazy<RwLock<Store>> = Lazy::new(|| RwLock::new(Store::build(Config::new())));

// ── Public entry points ───────────────────────────────────────────

/// Replace the whole configuration.
///
/// Starts from [`defaults`]; nothing from the previous configuration is kept.
pub fn configure<I>(options: I)
where
    I: IntoIterator<Item = ConfigOption>,
{
    let store = Store::build(Config::from_options(options));
    debug!(
        caller_position = ?store.config.caller_position,
        layout = ?store.config.layout,
        stack = store.config.stack,
        trim_paths = store.config.trim_paths.len(),
        trim_cwd = store.config.trim_cwd,
        format = ?store.config.format,
        verbosity = ?store.config.verbosity,
        "xerror configuration replaced"
    );
    *STORE.write() = store;
}

/// Restore the hardcoded defaults.
pub fn reset() {
    configure(std::iter::empty());
}

/// Snapshot of the current configuration.
pub fn config() -> Config {
    STORE.read().config.clone()
}

pub(crate) fn render_settings() -> RenderSettings {
    STORE.read().render
}

pub(crate) fn capture_settings() -> CaptureSettings {
    STORE.read().capture.clone()
}

// ── Test serialisation ────────────────────────────────────────────

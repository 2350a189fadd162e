//! Caller and stack capture.
//!
//! Every `XError` records the site that built it as a preformatted
//! `"file:line.function"` string. When stack capture is enabled the parent
//! frames are captured too, one string per frame:
//!
//! ```text
//! Site (#[track_caller] location, optional fn name)
//!       │
//!       ▼  FrameSource::resolve
//! caller Frame + parent Frames
//!       │
//!       ▼  drop runtime / test-harness frames, trim paths
//! Captured { caller: String, stack: Vec<String> }
//! ```
//!
//! Path trimming applies, in order: the longest registered trim prefix
//! (the working directory counts as one when cwd trimming is on), the
//! toolchain's source root, and this crate's own root.
//!
//! The resolver is pluggable through [`FrameSource`] so tests can inject a
//! fixed set of frames with [`FixedFrames`].

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::config::CaptureSettings;

// ── Site ──────────────────────────────────────────────────────────

/// The source position an error is being constructed at.
#[derive(Debug, Clone, Copy)]
pub struct Site {
    location: &'static Location<'static>,
    function: Option<&'static str>,
}

impl Site {
    /// The position of the nearest non-`#[track_caller]` caller.
    #[track_caller]
    #[inline]
    pub fn here() -> Self {
        Self {
            location: Location::caller(),
            function: None,
        }
    }

    /// Attach the enclosing function's path, as produced by the
    /// crate's macros.
    pub fn with_function(mut self, function: &'static str) -> Self {
        self.function = Some(function);
        self
    }

    pub fn file(&self) -> &'static str {
        self.location.file()
    }

    pub fn line(&self) -> u32 {
        self.location.line()
    }

    pub fn function(&self) -> Option<&'static str> {
        self.function
    }

    fn key(&self) -> SiteKey {
        (self.location.file(), self.location.line(), self.location.column())
    }
}

// ── Frames ────────────────────────────────────────────────────────

/// One resolved stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub file:     String,
    pub line:     u32,
    /// Fully qualified function path, possibly empty.
    pub function: String,
}

impl Frame {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
        }
    }
}

/// Frames resolved for one construction site.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    pub caller: Option<Frame>,
    /// Parent frames, innermost first.
    pub stack:  Vec<Frame>,
}

/// Resolves the current call site and, on request, its parent frames.
pub trait FrameSource: Send + Sync {
    fn resolve(&self, site: &Site, want_stack: bool) -> Resolved;
}

/// Frames from `#[track_caller]` locations and `std::backtrace`.
///
/// The enclosing function is read from the backtrace frame matching the
/// site, unless a macro already supplied it. The resolved caller is cached
/// per site, so only stack capture walks the stack every time. Without
/// debug info no frame matches, and the caller falls back to `file:line`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuntimeFrames;

type SiteKey = (&'static str, u32, u32);

static CALLERS: Lazy<RwLock<HashMap<SiteKey, Frame>>> = Lazy::new(|| RwLock::new(HashMap::new()));

impl FrameSource for RuntimeFrames {
    fn resolve(&self, site: &Site, want_stack: bool) -> Resolved {
        let located = Frame::new(
            site.file(),
            site.line(),
            site.function().unwrap_or_default(),
        );
        if !want_stack {
            if site.function().is_some() {
                return Resolved {
                    caller: Some(located),
                    stack: Vec::new(),
                };
            }
            if let Some(caller) = CALLERS.read().get(&site.key()).cloned() {
                return Resolved {
                    caller: Some(caller),
                    stack: Vec::new(),
                };
            }
        }

        let mut frames = parse_backtrace(&Backtrace::force_capture().to_string());
        let Some(idx) = locate(&frames, site) else {
            CALLERS.write().insert(site.key(), located.clone());
            let stack = if want_stack {
                frames
                    .into_iter()
                    .skip_while(|f| is_runtime_frame(f) || is_own_frame(&f.function))
                    .skip(1)
                    .collect()
            } else {
                Vec::new()
            };
            return Resolved {
                caller: Some(located),
                stack,
            };
        };

        let stack = if want_stack { frames.split_off(idx + 1) } else { Vec::new() };
        let mut caller = frames.swap_remove(idx);
        CALLERS.write().insert(site.key(), caller.clone());
        if let Some(function) = site.function() {
            caller.function = function.to_string();
        }
        Resolved {
            caller: Some(caller),
            stack,
        }
    }
}

/// Index of the backtrace frame for `site`: same file and line, or failing
/// that the frame in the same file with the closest line.
fn locate(frames: &[Frame], site: &Site) -> Option<usize> {
    let in_file = |f: &Frame| same_file(&f.file, site.file());
    frames
        .iter()
        .position(|f| f.line == site.line() && in_file(f))
        .or_else(|| {
            frames
                .iter()
                .enumerate()
                .filter(|(_, f)| in_file(f))
                .min_by_key(|(_, f)| f.line.abs_diff(site.line()))
                .map(|(idx, _)| idx)
        })
}

/// Backtrace paths are relative to the working directory, `Location` paths
/// to the workspace root; either may be a suffix of the other.
fn same_file(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    let (a, b) = (strip_dot(&a), strip_dot(&b));
    a == b || ends_with_path(a, b) || ends_with_path(b, a)
}

fn ends_with_path(path: &str, tail: &str) -> bool {
    path.len() > tail.len()
        && path.ends_with(tail)
        && path.as_bytes()[path.len() - tail.len() - 1] == b'/'
}

fn strip_dot(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}

/// A fixed frame list: the first frame is the caller, the rest its parents.
#[derive(Debug, Clone, Default)]
pub struct FixedFrames {
    frames: Vec<Frame>,
}

impl FixedFrames {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

impl FrameSource for FixedFrames {
    fn resolve(&self, _site: &Site, want_stack: bool) -> Resolved {
        let mut frames = self.frames.iter().cloned();
        let caller = frames.next();
        let stack = if want_stack { frames.collect() } else { Vec::new() };
        Resolved { caller, stack }
    }
}

static FRAME_SOURCE: Lazy<RwLock<Arc<dyn FrameSource>>> =
    Lazy::new(|| RwLock::new(Arc::new(RuntimeFrames)));

/// Replace the process-wide frame resolver.
pub fn install_frame_source(source: Arc<dyn FrameSource>) {
    *FRAME_SOURCE.write() = source;
}

/// Go back to [`RuntimeFrames`].
pub fn reset_frame_source() {
    install_frame_source(Arc::new(RuntimeFrames));
}

fn frame_source() -> Arc<dyn FrameSource> {
    FRAME_SOURCE.read().clone()
}

// ── Capture ───────────────────────────────────────────────────────

/// Caller and stack strings baked into an error at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Captured {
    pub caller: String,
    pub stack:  Vec<String>,
}

/// Capture `site`. A non-empty `inherited` stack from a wrapped error is
/// reused verbatim instead of walking the stack again.
pub(crate) fn capture(site: &Site, settings: &CaptureSettings, inherited: Option<&[String]>) -> Captured {
    let inherited = inherited.filter(|s| !s.is_empty());
    let want_stack = settings.stack && inherited.is_none();
    let resolved = frame_source().resolve(site, want_stack);

    let caller = resolved
        .caller
        .map(|f| format_frame(&f, &settings.trim))
        .unwrap_or_default();

    let stack = match (settings.stack, inherited) {
        (false, _) => Vec::new(),
        (true, Some(stack)) => stack.to_vec(),
        (true, None) => filter_frames(resolved.stack)
            .iter()
            .map(|f| format_frame(f, &settings.trim))
            .collect(),
    };

    Captured { caller, stack }
}

fn format_frame(frame: &Frame, trim: &TrimRules) -> String {
    let file = trim.trim(&frame.file);
    let function = short_function(&frame.function);
    if function.is_empty() {
        format!("{}:{}", file, frame.line)
    } else {
        format!("{}:{}.{}", file, frame.line, function)
    }
}

/// Drop runtime frames and the test harness entry closure.
fn filter_frames(frames: Vec<Frame>) -> Vec<Frame> {
    let last_user = frames
        .iter()
        .rposition(|f| !f.function.is_empty() && !is_runtime_frame(f));
    let mut kept = Vec::with_capacity(frames.len());
    for (i, frame) in frames.iter().enumerate() {
        if frame.function.is_empty() || is_runtime_frame(frame) {
            continue;
        }
        let harness_entry = Some(i) == last_user
            && strip_closure(&frame.function).is_some()
            && frames
                .get(i + 1)
                .map_or(false, |next| is_runtime_frame(next) && next.function.contains("call_once"));
        if harness_entry {
            continue;
        }
        kept.push(frame.clone());
    }
    kept
}

const RUNTIME_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "test::",
    "<std::",
    "<core::",
    "<alloc::",
    "__rust",
    "rust_begin_unwind",
];

/// libc entry points, present when the system libc ships debug info.
const NATIVE_ENTRIES: &[&str] = &[
    "_start",
    "__libc_start_main",
    "__libc_start_call_main",
    "start_thread",
    "clone",
    "clone3",
];

/// Frames whose source lives in the toolchain, or whose symbol belongs to
/// the standard library.
fn is_runtime_frame(frame: &Frame) -> bool {
    let file = normalize(&frame.file);
    RUNTIME_ROOTS.iter().any(|root| file.contains(root))
        || RUNTIME_PREFIXES.iter().any(|p| frame.function.starts_with(p))
        || NATIVE_ENTRIES.contains(&frame.function.as_str())
}

fn is_own_frame(function: &str) -> bool {
    function.starts_with("xerror::")
        || function.starts_with("<xerror::")
        || function.contains(" as xerror::")
}

/// `a::b::{{closure}}` or `a::b::{closure#0}` → `a::b`.
fn strip_closure(name: &str) -> Option<&str> {
    if let Some(head) = name.strip_suffix("::{{closure}}") {
        return Some(head);
    }
    let (head, tail) = name.rsplit_once("::{closure#")?;
    let n = tail.strip_suffix('}')?;
    (!n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())).then_some(head)
}

/// Shorten `a::b::handler::{{closure}}` to `handler`.
fn short_function(function: &str) -> &str {
    let mut name = function;
    while let Some(stripped) = strip_closure(name) {
        name = stripped;
    }
    match name.rfind("::") {
        Some(idx) => &name[idx + 2..],
        None => name,
    }
}

/// Parse the text form of a `std::backtrace::Backtrace`.
///
/// Frames look like `  4: my_crate::handler` followed by
/// `at ./src/lib.rs:10:5`. Inlined symbols may appear without an index.
/// Frames without a location are dropped.
fn parse_backtrace(text: &str) -> Vec<Frame> {
    let mut frames = Vec::new();
    let mut pending: Option<&str> = None;
    for line in text.lines() {
        let line = line.trim();
        if let Some(location) = line.strip_prefix("at ") {
            if let (Some(function), Some((file, line_no))) = (pending.take(), split_location(location)) {
                frames.push(Frame::new(file, line_no, function));
            }
        } else if !line.is_empty() {
            pending = Some(symbol_name(line));
        }
    }
    frames
}

/// `4: my_crate::handler` → `my_crate::handler`.
fn symbol_name(line: &str) -> &str {
    match line.split_once(": ") {
        Some((idx, name)) if !idx.is_empty() && idx.bytes().all(|b| b.is_ascii_digit()) => name.trim(),
        _ => line,
    }
}

/// `path:line:col` → `(path, line)`.
fn split_location(location: &str) -> Option<(&str, u32)> {
    let (rest, _col) = location.rsplit_once(':')?;
    let (file, line) = rest.rsplit_once(':')?;
    Some((file, line.parse().ok()?))
}

// ── Path trimming ─────────────────────────────────────────────────

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        fn normalize(path: &str) -> Cow<'_, str> {
            Cow::Owned(path.replace('\\', "/"))
        }
    } else {
        fn normalize(path: &str) -> Cow<'_, str> {
            Cow::Borrowed(path)
        }
    }
}

/// Markers after which a toolchain source path becomes crate-relative.
const RUNTIME_ROOTS: &[&str] = &["/rustc/", "/lib/rustlib/src/rust/"];

/// Prefix rules baked into captured paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TrimRules {
    prefixes: Vec<String>,
}

impl TrimRules {
    pub(crate) fn new(prefixes: Vec<String>) -> Self {
        let prefixes = prefixes
            .into_iter()
            .map(|p| normalize(&p).into_owned())
            .filter(|p| !p.is_empty())
            .collect();
        Self { prefixes }
    }

    pub(crate) fn trim(&self, path: &str) -> String {
        let path = normalize(path);
        let mut out: &str = strip_dot(&path);

        if let Some(prefix) = self
            .prefixes
            .iter()
            .filter(|p| out.starts_with(p.as_str()))
            .max_by_key(|p| p.len())
        {
            out = out[prefix.len()..].trim_start_matches('/');
        }

        out = strip_runtime_root(out);

        let own_root = normalize(env!("CARGO_MANIFEST_DIR"));
        if let Some(rest) = out.strip_prefix(own_root.as_ref()) {
            out = rest.trim_start_matches('/');
        }

        out.to_string()
    }
}

/// `/rustc/<hash>/library/std/src/rt.rs` → `library/std/src/rt.rs`.
fn strip_runtime_root(path: &str) -> &str {
    for marker in RUNTIME_ROOTS {
        if let Some(idx) = path.find(marker) {
            let rest = &path[idx + marker.len()..];
            if *marker == "/rustc/" {
                // skip the commit hash segment
                return rest.split_once('/').map_or(rest, |(_, tail)| tail);
            }
            return rest;
        }
    }
    path
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let function = short_function(&self.function);
        if function.is_empty() {
            write!(f, "{}:{}", self.file, self.line)
        } else {
            write!(f, "{}:{}.{}", self.file, self.line, function)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(stack: bool, prefixes: &[&str]) -> CaptureSettings {
        CaptureSettings {
            stack,
            trim: Arc::new(TrimRules::new(prefixes.iter().map(|s| s.to_string()).collect())),
        }
    }

    fn fixed() -> Arc<dyn FrameSource> {
        Arc::new(FixedFrames::new(vec![
            Frame::new("/home/dev/app/src/db.rs", 42, "app::db::query"),
            Frame::new("/home/dev/app/src/service.rs", 10, "app::service::load::{{closure}}"),
            Frame::new("/rustc/abc123/library/core/src/ops/function.rs", 250, "core::ops::function::FnOnce::call_once"),
            Frame::new("/home/dev/app/src/main.rs", 3, "app::main"),
            Frame::new("/rustc/abc123/library/std/src/rt.rs", 166, "std::rt::lang_start::{{closure}}"),
        ]))
    }

    fn frame(file: &str, line: u32, function: &str) -> Frame {
        Frame::new(file, line, function)
    }

    #[test]
    fn longest_prefix_wins() {
        let rules = TrimRules::new(vec!["/home".into(), "/home/dev/app".into()]);
        assert_eq!(rules.trim("/home/dev/app/src/db.rs"), "src/db.rs");
    }

    #[test]
    fn runtime_root_is_stripped() {
        let rules = TrimRules::default();
        assert_eq!(
            rules.trim("/rustc/90b35a6239c3d8bd/library/std/src/rt.rs"),
            "library/std/src/rt.rs"
        );
    }

    #[test]
    fn own_root_is_stripped() {
        let rules = TrimRules::default();
        let path = format!("{}/src/error.rs", env!("CARGO_MANIFEST_DIR"));
        assert_eq!(rules.trim(&path), "src/error.rs");
    }

    #[test]
    fn short_function_names() {
        assert_eq!(short_function("app::db::query"), "query");
        assert_eq!(short_function("app::load::{{closure}}::{{closure}}"), "load");
        assert_eq!(short_function("app::load::{closure#0}::{closure#12}"), "load");
        assert_eq!(short_function("app::load::{closure#x}"), "{closure#x}");
        assert_eq!(short_function("main"), "main");
        assert_eq!(short_function(""), "");
    }

    #[test]
    fn caller_only_without_stack() {
        let _g = crate::config::testing::lock();
        install_frame_source(fixed());
        let c = capture(&Site::here(), &settings(false, &["/home/dev/app"]), None);
        assert_eq!(c.caller, "src/db.rs:42.query");
        assert!(c.stack.is_empty());
    }

    #[test]
    fn stack_drops_runtime_and_harness_frames() {
        let _g = crate::config::testing::lock();
        install_frame_source(fixed());
        let c = capture(&Site::here(), &settings(true, &["/home/dev/app"]), None);
        assert_eq!(c.stack, vec!["src/service.rs:10.load".to_string(), "src/main.rs:3.main".to_string()]);
    }

    #[test]
    fn runtime_frames_are_classified_by_path() {
        let trait_impl = frame(
            "/rustc/abc123/library/core/src/ops/function.rs",
            250,
            "<fn() -> core::result::Result<(), alloc::string::String> as core::ops::function::FnOnce<()>>::call_once",
        );
        assert!(is_runtime_frame(&trait_impl));
        let toolchain = frame("/home/dev/.rustup/toolchains/stable/lib/rustlib/src/rust/library/std/src/rt.rs", 1, "main");
        assert!(is_runtime_frame(&toolchain));
        assert!(is_runtime_frame(&frame("./nptl/pthread_create.c", 442, "start_thread")));
        assert!(!is_runtime_frame(&frame("./src/main.rs", 3, "app::main")));
        assert!(!is_runtime_frame(&frame("./src/main.rs", 9, "app::start_threads")));
    }

    #[test]
    fn harness_entry_closure_is_dropped() {
        for closure in ["app::tests::loads::{{closure}}", "app::tests::loads::{closure#0}"] {
            let frames = vec![
                frame("./src/service.rs", 10, "app::service::load"),
                frame("./src/lib.rs", 40, "app::tests::loads"),
                frame("./src/lib.rs", 38, closure),
                frame(
                    "/rustc/abc123/library/core/src/ops/function.rs",
                    250,
                    "<fn() -> core::result::Result<(), alloc::string::String> as core::ops::function::FnOnce<()>>::call_once",
                ),
                frame("/rustc/abc123/library/test/src/lib.rs", 600, "test::__rust_begin_short_backtrace"),
            ];
            let names: Vec<String> = filter_frames(frames).into_iter().map(|f| f.function).collect();
            assert_eq!(names, vec!["app::service::load", "app::tests::loads"], "closure: {}", closure);
        }
    }

    #[test]
    fn closure_called_by_std_is_kept() {
        let frames = vec![
            frame("./src/service.rs", 12, "app::service::load_all::{{closure}}"),
            frame("/rustc/abc123/library/core/src/ops/function.rs", 305, "core::ops::function::impls::<impl core::ops::function::FnOnce<A> for &mut F>::call_once"),
            frame("./src/service.rs", 11, "app::service::load_all"),
        ];
        assert_eq!(filter_frames(frames).len(), 2);
    }

    #[test]
    fn paths_match_across_bases() {
        assert!(same_file("./tests/caller.rs", "crates/xerror/tests/caller.rs"));
        assert!(same_file("crates/xerror/src/lib.rs", "/work/crates/xerror/src/lib.rs"));
        assert!(same_file("src/lib.rs", "src/lib.rs"));
        assert!(!same_file("./tests/caller.rs", "crates/xerror/tests/other_caller.rs"));
        assert!(!same_file("./src/lib.rs", "crates/xerror/mysrc/lib.rs"));
    }

    #[test]
    fn locate_prefers_exact_line_then_nearest() {
        let site = Site::here();
        let frames = vec![
            frame("/work/src/error.rs", 120, "xerror::error::XError::build"),
            frame("./src/site.rs", site.line() + 40, "xerror::site::tests::other"),
            frame("./src/site.rs", site.line() + 2, "xerror::site::tests::nearest"),
        ];
        assert_eq!(locate(&frames, &site), Some(2));
        let mut exact = frames.clone();
        exact.push(frame("./src/site.rs", site.line(), "xerror::site::tests::exact"));
        assert_eq!(locate(&exact, &site), Some(3));
        assert_eq!(locate(&frames[..1], &site), None);
    }

    #[test]
    fn relative_paths_lose_leading_dot() {
        assert_eq!(TrimRules::default().trim("./tests/caller.rs"), "tests/caller.rs");
    }

    #[test]
    fn runtime_caller_resolves_function() {
        let _g = crate::config::testing::lock();
        let c = capture(&Site::here(), &settings(true, &[]), None);
        assert!(c.caller.ends_with(".runtime_caller_resolves_function"), "caller: {}", c.caller);
        assert!(c.caller.starts_with("src/site.rs:"), "caller: {}", c.caller);
        assert!(c.stack.iter().all(|f| !f.starts_with("library/")), "stack: {:?}", c.stack);
    }

    #[test]
    fn inherited_stack_is_reused() {
        let _g = crate::config::testing::lock();
        install_frame_source(fixed());
        let inherited = vec!["inner.rs:1.inner".to_string()];
        let c = capture(&Site::here(), &settings(true, &[]), Some(&inherited));
        assert_eq!(c.stack, inherited);
        assert!(c.caller.ends_with("db.rs:42.query"));
    }

    #[test]
    fn empty_source_yields_empty_capture() {
        let _g = crate::config::testing::lock();
        install_frame_source(Arc::new(FixedFrames::default()));
        let c = capture(&Site::here(), &settings(true, &[]), None);
        assert_eq!(c, Captured::default());
    }

    #[test]
    fn runtime_caller_points_here() {
        let _g = crate::config::testing::lock();
        let line = line!() + 1;
        let c = capture(&Site::here(), &settings(false, &[]), None);
        assert!(c.caller.contains("site.rs"), "caller: {}", c.caller);
        assert!(c.caller.contains(&format!(":{}", line)), "caller: {}", c.caller);
    }

    #[test]
    fn parse_backtrace_text() {
        let text = "   0: std::backtrace::Backtrace::force_capture\n\
                    \x20            at /rustc/abc/library/std/src/backtrace.rs:312:13\n\
                    \x20  1: app::handler\n\
                    \x20            at ./src/lib.rs:10:5\n\
                    \x20  2: <unknown>\n";
        let frames = parse_backtrace(text);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], Frame::new("./src/lib.rs", 10, "app::handler"));
    }

    #[test]
    fn parse_backtrace_inlined_symbols() {
        let text = "   4: app::helper\n\
                    \x20            at ./src/lib.rs:20:9\n\
                    \x20     app::tests::loads\n\
                    \x20            at ./src/lib.rs:31:17\n";
        let frames = parse_backtrace(text);
        assert_eq!(
            frames,
            vec![
                Frame::new("./src/lib.rs", 20, "app::helper"),
                Frame::new("./src/lib.rs", 31, "app::tests::loads"),
            ]
        );
    }

    #[test]
    fn frame_display() {
        let f = Frame::new("src/a.rs", 7, "x::y");
        assert_eq!(f.to_string(), "src/a.rs:7.y");
        assert_eq!(Frame::new("src/a.rs", 7, "").to_string(), "src/a.rs:7");
    }
}

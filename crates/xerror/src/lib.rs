//! # xerror: annotated errors
//!
//! Wrap any error with caller information, structured context and
//! retry / HTTP / JSON-RPC classification, and render it as text, JSON or
//! compact `key=value` output.
//!
//! ## Design
//!
//! - **Sentinels** are `static` error identities declared by the
//!   application. Every error built from one still matches it through the
//!   chain, however deeply it is wrapped later.
//!
//! - **`XError`** is an immutable, cheaply clonable value. `with_*` setters
//!   return a new value and never touch other clones, so an error can be
//!   shared across threads as soon as it is built.
//!
//! - **Configuration** is process-wide ([`config::configure`]). Caller
//!   position, layout, output format and field visibility apply at render
//!   time; stack capture and path trimming apply at construction time.
//!
//! ## Quick Start
//!
//! ```rust
//! use xerror::{errorf, Category, Sentinel, XResult};
//!
//! static ERR_NOT_FOUND: Sentinel = Sentinel::new("user {} not found");
//!
//! fn load_user(id: u64) -> XResult<String> {
//!     Err(errorf!(ERR_NOT_FOUND, id)
//!         .with_code("USR404")
//!         .with_category(Category::NotFound)
//!         .with_http_status(404))
//! }
//!
//! let err = load_user(7).unwrap_err();
//! assert!(err.is(&ERR_NOT_FOUND));
//! assert_eq!(err.message(), "user 7 not found");
//! assert_eq!(xerror::extract::http_status(Some(&err)), 404);
//! assert_eq!(err.to_wire().code, xerror::codes::INTERNAL_ERROR);
//! ```
//!
//! ## Output Formats
//!
//! | Format       | `Display` output |
//! |--------------|------------------|
//! | `Pretty`     | `message [file:line.function]`, wrapped errors, stack |
//! | `Json`       | one-line JSON object, unset fields omitted |
//! | `JsonIndent` | indented JSON object |
//! | `Compact`    | `error="..." code=X http_status=404 ...` |

mod context;
mod error;
mod sentinel;
mod render;
#[macro_use]
mod macros;
mod convert;

pub mod chain;
pub mod codes;
pub mod config;
pub mod extract;
pub mod record;
pub mod report;
pub mod site;
pub mod wire;

// ── Public API ────────────────────────────────────────────────────

pub use context::{Category, UnknownCategory};
pub use error::XError;
pub use sentinel::Sentinel;
pub use site::Site;
pub use render::INLINE_SEPARATOR;
pub use record::{format_duration, ErrorRecord};
pub use wire::WireError;
pub use convert::ResultExt;
pub use config::{configure, CallerPosition, ConfigOption, Field, Layout, OutputFormat, Verbosity};

/// Convenience Result alias.
pub type XResult<T> = Result<T, XError>;

use std::error::Error;
use std::io;

use crate::context::Category;
use crate::error::{cause, XError};
use crate::sentinel::Sentinel;
use crate::site::Site;
use crate::XResult;

// ── io::ErrorKind classification ──────────────────────────────────

/// Category implied by an `io::ErrorKind`, if any.
fn io_category(kind: io::ErrorKind) -> Option<Category> {
    match kind {
        io::ErrorKind::NotFound          => Some(Category::NotFound),
        io::ErrorKind::PermissionDenied  => Some(Category::Unauthorized),
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::BrokenPipe      => Some(Category::Network),
        io::ErrorKind::InvalidInput
        | io::ErrorKind::InvalidData     => Some(Category::Validation),
        io::ErrorKind::TimedOut          => Some(Category::Timeout),
        _                                => None,
    }
}

/// Transient kinds worth retrying.
fn io_retryable(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
    )
}

// ── From<io::Error> ───────────────────────────────────────────────

impl From<io::Error> for XError {
    /// Annotate an `io::Error`, classifying it by kind.
    #[track_caller]
    fn from(err: io::Error) -> Self {
        let kind = err.kind();
        let x = XError::__new_at(err, Site::here()).with_retryable(io_retryable(kind));
        match io_category(kind) {
            Some(category) => x.with_category(category),
            None => x,
        }
    }
}

// ── Into<io::Error> ───────────────────────────────────────────────

impl From<XError> for io::Error {
    /// Wrap as `ErrorKind::Other`; the `XError` stays reachable through
    /// `get_ref` and the source chain.
    fn from(err: XError) -> Self {
        io::Error::new(io::ErrorKind::Other, err)
    }
}

// ── ResultExt ─────────────────────────────────────────────────────

/// Annotate the error side of any `Result` with a sentinel.
///
/// ```
/// use xerror::{ResultExt, Sentinel};
///
/// static ERR_CONFIG: Sentinel = Sentinel::new("reading config");
///
/// let res = std::fs::read("/definitely/missing.toml").annotate(&ERR_CONFIG);
/// let err = res.unwrap_err();
/// assert!(err.is(&ERR_CONFIG));
/// assert_eq!(err.wrapped().count(), 1);
/// ```
pub trait ResultExt<T> {
    /// Primary becomes `sentinel`; the original error is rendered after it.
    fn annotate(self, sentinel: &Sentinel) -> XResult<T>;

    /// Like [`annotate`](Self::annotate), then applies `f` to the new error.
    fn annotate_with<F>(self, sentinel: &Sentinel, f: F) -> XResult<T>
    where
        F: FnOnce(XError) -> XError;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    #[track_caller]
    fn annotate(self, sentinel: &Sentinel) -> XResult<T> {
        let site = Site::here();
        self.map_err(|e| XError::from_sentinel(*sentinel, vec![cause(e)], site))
    }

    #[track_caller]
    fn annotate_with<F>(self, sentinel: &Sentinel, f: F) -> XResult<T>
    where
        F: FnOnce(XError) -> XError,
    {
        let site = Site::here();
        self.map_err(|e| f(XError::from_sentinel(*sentinel, vec![cause(e)], site)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::testing;

    static ERR_READ: Sentinel = Sentinel::new("read failed");

    fn failing() -> io::Result<u32> {
        Err(io::Error::new(io::ErrorKind::TimedOut, "deadline"))
    }

    #[test]
    fn io_error_is_classified() {
        let _g = testing::lock();
        let x: XError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(x.category(), Some(Category::NotFound));
        assert!(!x.retryable());
        assert_eq!(x.message(), "gone");

        let x: XError = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        assert_eq!(x.category(), Some(Category::Timeout));
        assert!(x.retryable());

        let x: XError = io::Error::new(io::ErrorKind::Other, "misc").into();
        assert_eq!(x.category(), None);
    }

    #[test]
    fn question_mark_converts_io() {
        let _g = testing::lock();
        fn run() -> XResult<u32> {
            let n = failing()?;
            Ok(n)
        }
        let err = run().unwrap_err();
        assert!(err.find::<io::Error>().is_some());
        assert!(err.caller().contains("convert.rs"), "caller: {}", err.caller());
    }

    #[test]
    fn into_io_error_keeps_xerror() {
        let _g = testing::lock();
        let io_err: io::Error = ERR_READ.err().with_code("R1").into();
        assert_eq!(io_err.kind(), io::ErrorKind::Other);
        let inner = io_err.get_ref().and_then(|e| e.downcast_ref::<XError>());
        assert_eq!(inner.map(|x| x.code()), Some("R1"));
    }

    #[test]
    fn annotate_wraps_original() {
        let _g = testing::lock();
        let err = failing().annotate(&ERR_READ).unwrap_err();
        assert!(err.is(&ERR_READ));
        assert_eq!(err.message(), "read failed");
        let wrapped: Vec<String> = err.wrapped().map(|w| w.to_string()).collect();
        assert_eq!(wrapped, vec!["deadline"]);
        assert!(err.caller().contains("convert.rs"));
        assert!(err.caller().ends_with(".annotate_wraps_original"), "caller: {}", err.caller());
    }

    #[test]
    fn annotate_with_applies_setters() {
        let _g = testing::lock();
        let err = failing()
            .annotate_with(&ERR_READ, |e| e.with_code("R2").with_retryable(true))
            .unwrap_err();
        assert_eq!(err.code(), "R2");
        assert!(err.retryable());
    }

    #[test]
    fn ok_passes_through() {
        let ok: Result<u8, io::Error> = Ok(3);
        assert_eq!(ok.annotate(&ERR_READ).unwrap(), 3);
    }
}

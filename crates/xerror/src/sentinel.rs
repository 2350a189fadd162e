//! Sentinel errors: named, constant identities declared by applications.
//!
//! ```
//! use xerror::Sentinel;
//!
//! static ERR_QUERY: Sentinel = Sentinel::new("database query failed");
//!
//! let err = ERR_QUERY.err().with_code("DB001");
//! assert!(err.is(&ERR_QUERY));
//! ```

use std::error::Error;
use std::fmt;

use crate::error::XError;
use crate::site::Site;

/// A constant error identity. Two sentinels are the same identity when
/// their texts are equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sentinel {
    text: &'static str,
}

impl Sentinel {
    pub const fn new(text: &'static str) -> Self {
        Self { text }
    }

    pub const fn text(&self) -> &'static str {
        self.text
    }

    /// A new error whose primary cause is this sentinel.
    #[track_caller]
    pub fn err(&self) -> XError {
        XError::from_sentinel(*self, Vec::new(), Site::here())
    }

    /// Like [`err`](Self::err), with `errors` rendered after the message.
    /// Each also takes part in chain matching.
    #[track_caller]
    pub fn err_with<I, E>(&self, errors: I) -> XError
    where
        I: IntoIterator<Item = E>,
        E: Error + Send + Sync + 'static,
    {
        let errors = errors.into_iter().map(crate::error::cause).collect();
        XError::from_sentinel(*self, errors, Site::here())
    }

    /// A new error whose message is this sentinel's text used as a
    /// template. The sentinel still matches but is not rendered again.
    ///
    /// ```
    /// use xerror::Sentinel;
    ///
    /// static ERR_USER: Sentinel = Sentinel::new("user {} not found");
    /// let err = ERR_USER.errorf(&[&42]);
    /// assert_eq!(err.message(), "user 42 not found");
    /// assert!(err.is(&ERR_USER));
    /// ```
    #[track_caller]
    pub fn errorf(&self, args: &[&dyn fmt::Display]) -> XError {
        XError::formatted_from_sentinel(*self, fill_template(self.text, args), Site::here())
    }

    #[doc(hidden)]
    pub fn __errorf_at(&self, args: &[&dyn fmt::Display], site: Site) -> XError {
        XError::formatted_from_sentinel(*self, fill_template(self.text, args), site)
    }

    #[doc(hidden)]
    pub fn __err_at(&self, site: Site) -> XError {
        XError::from_sentinel(*self, Vec::new(), site)
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text)
    }
}

impl fmt::Debug for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sentinel({:?})", self.text)
    }
}

impl Error for Sentinel {}

/// Substitute `{}` placeholders in `template` with `args` in order.
///
/// `{{` and `}}` are literal braces. Placeholders without an argument stay
/// as `{}`; arguments without a placeholder are appended space-separated.
pub(crate) fn fill_template(template: &str, args: &[&dyn fmt::Display]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(template.len() + args.len() * 8);
    let mut args = args.iter();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('{', Some('{')) | ('}', Some('}')) => {
                chars.next();
                out.push(c);
            }
            ('{', Some('}')) => {
                chars.next();
                match args.next() {
                    Some(arg) => {
                        let _ = write!(out, "{}", arg);
                    }
                    None => out.push_str("{}"),
                }
            }
            _ => out.push(c),
        }
    }
    for arg in args {
        let _ = write!(out, " {}", arg);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    static ERR_A: Sentinel = Sentinel::new("alpha failed");

    #[test]
    fn identity_by_text() {
        let same = Sentinel::new("alpha failed");
        assert_eq!(ERR_A, same);
        assert_ne!(ERR_A, Sentinel::new("beta failed"));
    }

    #[test]
    fn display_and_debug() {
        assert_eq!(ERR_A.to_string(), "alpha failed");
        assert_eq!(format!("{:?}", ERR_A), "Sentinel(\"alpha failed\")");
    }

    #[test]
    fn template_substitution() {
        assert_eq!(fill_template("user {} in {}", &[&7, &"eu"]), "user 7 in eu");
    }

    #[test]
    fn template_escapes() {
        assert_eq!(fill_template("{{literal}} {}", &[&1]), "{literal} 1");
    }

    #[test]
    fn template_missing_args_stay() {
        assert_eq!(fill_template("a {} b {}", &[&1]), "a 1 b {}");
    }

    #[test]
    fn template_extra_args_appended() {
        assert_eq!(fill_template("plain", &[&1, &"x"]), "plain 1 x");
    }

    #[test]
    fn sentinel_is_an_error() {
        fn takes(_: &dyn Error) {}
        takes(&ERR_A);
        assert!(ERR_A.source().is_none());
    }
}

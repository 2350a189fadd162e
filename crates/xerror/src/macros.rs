/// Path of the enclosing function, e.g. `my_app::db::query`.
#[doc(hidden)]
#[macro_export]
macro_rules! __function {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        name.strip_suffix("::f").unwrap_or(name)
    }};
}

/// The invocation site, with the enclosing function's name.
#[doc(hidden)]
#[macro_export]
macro_rules! __site {
    () => {
        $crate::Site::here().with_function($crate::__function!())
    };
}

/// Build an `XError` from a sentinel, recording the enclosing function in
/// the caller string.
///
/// ```
/// use xerror::{errorf, Sentinel};
///
/// static ERR_USER: Sentinel = Sentinel::new("user {} not found in {}");
///
/// let err = errorf!(ERR_USER, 42, "eu-west");
/// assert_eq!(err.message(), "user 42 not found in eu-west");
/// assert!(err.is(&ERR_USER));
///
/// // Without arguments the sentinel itself is the primary.
/// let plain = errorf!(ERR_USER);
/// assert_eq!(plain.message(), "user {} not found in {}");
/// ```
#[macro_export]
macro_rules! errorf {
    ($sentinel:expr $(,)?) => {
        $sentinel.__err_at($crate::__site!())
    };
    ($sentinel:expr, $($arg:expr),+ $(,)?) => {
        $sentinel.__errorf_at(
            &[$(&$arg as &dyn ::std::fmt::Display),+],
            $crate::__site!(),
        )
    };
}

/// Append a formatted `": suffix"` to an error's primary message.
///
/// ```
/// use xerror::{wrapf, Sentinel};
///
/// static ERR_DB: Sentinel = Sentinel::new("query failed");
///
/// let err = wrapf!(ERR_DB.err(), "table {}", "users");
/// assert_eq!(err.message(), "query failed: table users");
/// ```
#[macro_export]
macro_rules! wrapf {
    ($err:expr, $($fmt:tt)+) => {
        $err.wrapf(::std::format_args!($($fmt)+))
    };
}

/// Add a formatted error rendered after the primary message.
///
/// ```
/// use xerror::{attachf, Sentinel};
///
/// static ERR_DB: Sentinel = Sentinel::new("query failed");
///
/// let err = attachf!(ERR_DB.err(), "attempt {} of {}", 3, 3);
/// assert_eq!(err.wrapped().next().map(|e| e.to_string()).as_deref(), Some("attempt 3 of 3"));
/// ```
#[macro_export]
macro_rules! attachf {
    ($err:expr, $($fmt:tt)+) => {
        $err.attachf(::std::format_args!($($fmt)+))
    };
}

/// Return early with an error built from a sentinel if a condition fails.
///
/// ```
/// use xerror::{ensure, Sentinel, XResult};
///
/// static ERR_RANGE: Sentinel = Sentinel::new("value {} out of range");
///
/// fn check(v: u32) -> XResult<u32> {
///     ensure!(v < 10, ERR_RANGE, v);
///     Ok(v)
/// }
///
/// assert!(check(3).is_ok());
/// assert_eq!(check(12).unwrap_err().message(), "value 12 out of range");
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $sentinel:expr $(,)?) => {
        if !$cond {
            return ::core::result::Result::Err($crate::errorf!($sentinel).into());
        }
    };
    ($cond:expr, $sentinel:expr, $($arg:expr),+ $(,)?) => {
        if !$cond {
            return ::core::result::Result::Err($crate::errorf!($sentinel, $($arg),+).into());
        }
    };
}

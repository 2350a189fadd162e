//! Chain walking and identity matching.
//!
//! An `XError` has several unwrap links (primary, wrapped, absorbed), while
//! `std::error::Error::source` exposes one. The walk here follows all of
//! them: at each step an `XError` contributes its whole unwrap sequence and
//! any other error contributes its `source()`.
//!
//! ```
//! use xerror::{chain, Sentinel};
//!
//! static ERR_IO: Sentinel = Sentinel::new("io failed");
//! static ERR_LOAD: Sentinel = Sentinel::new("load failed");
//!
//! let err = ERR_LOAD.err_with([ERR_IO.err()]);
//! assert!(chain::is(&err, &ERR_IO));
//! assert_eq!(chain::walk(&err).count(), 4);
//! ```

use std::error::Error;

use crate::error::XError;

/// Depth-first iterator over an error and everything reachable from it.
/// The starting error comes first.
pub struct Walk<'a> {
    pending: Vec<&'a (dyn Error + 'static)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a (dyn Error + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        let err = self.pending.pop()?;
        match err.downcast_ref::<XError>() {
            Some(x) => {
                let start = self.pending.len();
                self.pending.extend(x.causes());
                self.pending[start..].reverse();
            }
            None => self.pending.extend(err.source()),
        }
        Some(err)
    }
}

pub fn walk<'a>(err: &'a (dyn Error + 'static)) -> Walk<'a> {
    Walk { pending: vec![err] }
}

/// `true` if an error equal to `target` is reachable from `err`.
pub fn is<T>(err: &(dyn Error + 'static), target: &T) -> bool
where
    T: Error + PartialEq + 'static,
{
    walk(err).any(|e| e.downcast_ref::<T>().map_or(false, |found| found == target))
}

/// The first `T` reachable from `err`.
pub fn find<'a, T>(err: &'a (dyn Error + 'static)) -> Option<&'a T>
where
    T: Error + 'static,
{
    walk(err).find_map(|e| e.downcast_ref::<T>())
}

impl XError {
    /// The unwrap sequence: primary, then wrapped, then absorbed errors.
    pub fn causes(&self) -> impl Iterator<Item = &(dyn Error + 'static)> + '_ {
        std::iter::once(self.primary_cause())
            .chain(self.wrapped_causes())
            .chain(self.absorbed_causes())
            .map(|c| c.as_ref() as &(dyn Error + 'static))
    }

    /// See [`chain::is`](is).
    pub fn is<T>(&self, target: &T) -> bool
    where
        T: Error + PartialEq + 'static,
    {
        is(self, target)
    }

    /// See [`chain::find`](find).
    pub fn find<T>(&self) -> Option<&T>
    where
        T: Error + 'static,
    {
        find(self)
    }
}

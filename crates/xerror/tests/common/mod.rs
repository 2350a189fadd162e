//! Shared helpers for integration tests.

#![allow(dead_code)]

use parking_lot::{const_mutex, Mutex, MutexGuard};

use xerror::config;
use xerror::site;

static LOCK: Mutex<()> = const_mutex(());

/// Serialises tests that touch process-wide state and restores defaults on
/// both ends.
pub struct Guard {
    _lock: MutexGuard<'static, ()>,
}

pub fn lock() -> Guard {
    let lock = LOCK.lock();
    config::reset();
    site::reset_frame_source();
    Guard { _lock: lock }
}

impl Drop for Guard {
    fn drop(&mut self) {
        config::reset();
        site::reset_frame_source();
    }
}

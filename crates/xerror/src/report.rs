//! Emit an `XError` as one `tracing` event.
//!
//! The event carries the error's classification as structured fields so a
//! subscriber can index them without parsing the message:
//!
//! ```text
//! ERROR xerror: database query failed code="DB001" category="server" http_status=503 ...
//! ```

use tracing::Level;

use crate::error::XError;

macro_rules! emit {
    ($level:expr, $err:expr) => {{
        let err = $err;
        tracing::event!(
            $level,
            code = err.code(),
            category = err.category().map(|c| c.as_str()).unwrap_or(""),
            http_status = err.http_status(),
            mcp_code = err.mcp_code(),
            retryable = err.retryable(),
            request_id = err.request_id(),
            correlation_id = err.correlation_id(),
            caller = err.caller(),
            "{}",
            err.message()
        )
    }};
}

/// Log `err` at `ERROR`.
pub fn log_error(err: &XError) {
    log_error_at(Level::ERROR, err);
}

/// Log `err` at `level`.
pub fn log_error_at(level: Level, err: &XError) {
    if level == Level::ERROR {
        emit!(Level::ERROR, err)
    } else if level == Level::WARN {
        emit!(Level::WARN, err)
    } else if level == Level::INFO {
        emit!(Level::INFO, err)
    } else if level == Level::DEBUG {
        emit!(Level::DEBUG, err)
    } else {
        emit!(Level::TRACE, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::testing;
    use crate::context::Category;
    use crate::sentinel::Sentinel;
    use std::io;
    use std::sync::{Arc, Mutex};

    static ERR_DB: Sentinel = Sentinel::new("database query failed");

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(level: Level, f: impl FnOnce()) -> String {
        let buf = Buffer::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buf.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn event_carries_fields() {
        let _g = testing::lock();
        let err = ERR_DB
            .err()
            .with_code("DB001")
            .with_category(Category::Server)
            .with_http_status(503)
            .with_request_id("req-9");
        let out = capture(Level::TRACE, || log_error(&err));
        assert!(out.contains("ERROR"), "{}", out);
        assert!(out.contains("database query failed"), "{}", out);
        assert!(out.contains("code=\"DB001\""), "{}", out);
        assert!(out.contains("category=\"server\""), "{}", out);
        assert!(out.contains("http_status=503"), "{}", out);
        assert!(out.contains("request_id=\"req-9\""), "{}", out);
    }

    #[test]
    fn level_is_respected() {
        let _g = testing::lock();
        let err = ERR_DB.err();
        let out = capture(Level::INFO, || log_error_at(Level::DEBUG, &err));
        assert!(out.is_empty(), "{}", out);
        let out = capture(Level::INFO, || log_error_at(Level::WARN, &err));
        assert!(out.contains("WARN"), "{}", out);
    }
}

//! Standard JSON-RPC 2.0 codes and HTTP status validation.
//!
//! # Code Ranges
//!
//! | Range                | Purpose                                   |
//! |----------------------|-------------------------------------------|
//! | `0`                  | unset                                     |
//! | `-32700`             | parse error                               |
//! | `-32603 ..= -32600` | invalid request / method / params / internal |
//! | `-32099 ..= -32000` | implementation-defined server errors      |
//! | `-32768 ..= -32000` | whole reserved block, accepted by `with_mcp_code` |
//!
//! HTTP status codes are accepted when `0` (unset) or within `100..=599`.

// ── JSON-RPC 2.0 standard codes ───────────────────────────────────

pub const PARSE_ERROR:      i32 = -32700;
pub const INVALID_REQUEST:  i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS:   i32 = -32602;
pub const INTERNAL_ERROR:   i32 = -32603;

// ── Server-defined codes ──────────────────────────────────────────

/// A tool invoked by the server failed.
pub const TOOL_ERROR:       i32 = -32000;

/// Lowest code of the reserved JSON-RPC block.
pub const RESERVED_MIN:     i32 = -32768;
/// Highest code of the reserved JSON-RPC block.
pub const RESERVED_MAX:     i32 = -32000;

// ── HTTP ──────────────────────────────────────────────────────────

pub const HTTP_STATUS_MIN:  i32 = 100;
pub const HTTP_STATUS_MAX:  i32 = 599;

/// The four named JSON-RPC request codes plus the parse error.
pub const STANDARD_CODES: [i32; 5] = [
    PARSE_ERROR,
    INVALID_REQUEST,
    METHOD_NOT_FOUND,
    INVALID_PARAMS,
    INTERNAL_ERROR,
];

/// `true` if `code` may be stored as an MCP code.
#[inline]
pub const fn is_valid_mcp_code(code: i32) -> bool {
    code == 0 || (code >= RESERVED_MIN && code <= RESERVED_MAX)
}

/// `true` if `status` may be stored as an HTTP status.
#[inline]
pub const fn is_valid_http_status(status: i32) -> bool {
    status == 0 || (status >= HTTP_STATUS_MIN && status <= HTTP_STATUS_MAX)
}

/// Panics unless `status` is a storable HTTP status.
#[track_caller]
pub(crate) fn check_http_status(status: i32) {
    if !is_valid_http_status(status) {
        panic!(
            "invalid HTTP status code {}: must be 0 or within {}..={}",
            status, HTTP_STATUS_MIN, HTTP_STATUS_MAX
        );
    }
}

/// Panics unless `code` is a storable MCP code.
#[track_caller]
pub(crate) fn check_mcp_code(code: i32) {
    if !is_valid_mcp_code(code) {
        panic!(
            "invalid MCP code {}: must be 0 or within the JSON-RPC 2.0 reserved range {}..={}",
            code, RESERVED_MIN, RESERVED_MAX
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_codes_are_in_reserved_block() {
        for code in STANDARD_CODES {
            assert!(is_valid_mcp_code(code), "{} should be valid", code);
        }
        assert!(is_valid_mcp_code(TOOL_ERROR));
    }

    #[test]
    fn mcp_range_edges() {
        assert!(is_valid_mcp_code(0));
        assert!(is_valid_mcp_code(-32768));
        assert!(is_valid_mcp_code(-32099));
        assert!(!is_valid_mcp_code(-32769));
        assert!(!is_valid_mcp_code(-31999));
        assert!(!is_valid_mcp_code(1));
        assert!(!is_valid_mcp_code(-1));
    }

    #[test]
    fn http_range_edges() {
        for ok in [0, 100, 200, 404, 500, 599] {
            assert!(is_valid_http_status(ok));
        }
        for bad in [-1, 99, 600, 1000] {
            assert!(!is_valid_http_status(bad));
        }
    }

    #[test]
    #[should_panic(expected = "invalid HTTP status code")]
    fn check_http_panics() {
        check_http_status(600);
    }

    #[test]
    #[should_panic(expected = "JSON-RPC 2.0")]
    fn check_mcp_panics() {
        check_mcp_code(100);
    }
}

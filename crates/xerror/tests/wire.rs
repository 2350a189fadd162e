mod common;

use std::error::Error;

use thiserror::Error;
use xerror::codes::{self, INTERNAL_ERROR, TOOL_ERROR};
use xerror::{ErrorRecord, Sentinel, WireError, XError};

static ERR_TOOL: Sentinel = Sentinel::new("tool failed");

#[derive(Debug, Error)]
#[error("rpc layer: {source}")]
struct RpcError {
    #[source]
    source: XError,
}

#[test]
fn nil_projects_to_zero_value() {
    let w = WireError::from_error(None);
    assert_eq!(w.code, 0);
    assert!(w.message.is_empty());
    assert!(w.data.is_none());
    assert_eq!(serde_json::to_string(&w).unwrap(), r#"{"code":0,"message":""}"#);
}

#[test]
fn generic_error_is_internal_without_data() {
    let err = std::fmt::Error;
    let w = WireError::from_error(Some(&err));
    assert_eq!(w.code, INTERNAL_ERROR);
    assert_eq!(w.message, err.to_string());
    let json = serde_json::to_value(&w).unwrap();
    assert!(json.get("data").is_none());
}

#[test]
fn annotated_without_mcp_code_carries_data() {
    let _g = common::lock();
    let err = ERR_TOOL.err().with_code("T1").with_retryable(true);
    let w = WireError::from_error(Some(&err));
    assert_eq!(w.code, INTERNAL_ERROR);
    assert_eq!(w.message, "tool failed");
    let data = w.data.expect("data present");
    let record: ErrorRecord = serde_json::from_value(data).unwrap();
    assert_eq!(record.error, "tool failed");
    assert_eq!(record.code, "T1");
    assert!(record.retryable);
}

#[test]
fn annotated_with_mcp_code_keeps_it() {
    let _g = common::lock();
    let err = ERR_TOOL.err().with_mcp_code(TOOL_ERROR);
    assert_eq!(err.to_wire().code, -32000);
}

#[test]
fn annotated_behind_foreign_wrapper() {
    let _g = common::lock();
    let rpc = RpcError { source: ERR_TOOL.err().with_mcp_code(codes::INVALID_PARAMS) };
    let dyn_rpc: &(dyn Error + 'static) = &rpc;
    let w = WireError::from_error(Some(dyn_rpc));
    assert_eq!(w.code, codes::INVALID_PARAMS);
    assert_eq!(w.message, "tool failed");
    assert!(w.data.is_some());
}

#[test]
fn data_ignores_visibility_settings() {
    let _g = common::lock();
    xerror::configure([xerror::ConfigOption::Verbosity(xerror::Verbosity::Minimal)]);
    let w = ERR_TOOL.err().with_code("T9").to_wire();
    let data = w.data.expect("data present");
    assert_eq!(data["code"], "T9");
}

#[test]
fn wire_error_decodes() {
    let w: WireError = serde_json::from_str(r#"{"code":-32601,"message":"no such method"}"#).unwrap();
    assert_eq!(w.code, codes::METHOD_NOT_FOUND);
    assert!(w.data.is_none());
}

//! Projection onto the JSON-RPC 2.0 error object.

use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codes::INTERNAL_ERROR;
use crate::error::XError;
use crate::extract;
use crate::record::ErrorRecord;

/// A JSON-RPC error object: `{"code": .., "message": .., "data": ..}`.
///
/// `data` carries the full [`ErrorRecord`] of an annotated error and is
/// omitted for any other error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl WireError {
    /// Project any error.
    ///
    /// - `None` gives the zero value: code `0`, empty message, no data.
    /// - An error with an `XError` in its chain is projected from that
    ///   `XError`.
    /// - Anything else gives [`INTERNAL_ERROR`] with the error's text.
    pub fn from_error(err: Option<&(dyn Error + 'static)>) -> Self {
        let Some(err) = err else {
            return Self::default();
        };
        match extract::annotated(Some(err)) {
            Some(x) => Self::from(x),
            None => Self {
                code: INTERNAL_ERROR,
                message: err.to_string(),
                data: None,
            },
        }
    }
}

impl From<&XError> for WireError {
    fn from(err: &XError) -> Self {
        let code = match err.mcp_code() {
            0 => INTERNAL_ERROR,
            code => code,
        };
        Self {
            code,
            message: err.message(),
            data: ErrorRecord::from_error(err).to_value().ok(),
        }
    }
}

impl From<XError> for WireError {
    fn from(err: XError) -> Self {
        Self::from(&err)
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl XError {
    pub fn to_wire(&self) -> WireError {
        WireError::from(self)
    }
}

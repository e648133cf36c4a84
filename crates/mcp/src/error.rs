//! Protocol errors raised while decoding and dispatching envelopes.

use toolgate_core::{Classify, ErrorClass};

use crate::types::{error_codes, JsonRpcError};

#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Body was not valid JSON.
    #[error("Parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Valid JSON but not a JSON-RPC 2.0 request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or unregistered session identifier.
    #[error("Bad Session")]
    BadSession,

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Convert to a JSON-RPC error object.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let code = match self {
            McpError::JsonParse(_) => error_codes::PARSE_ERROR,
            McpError::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            McpError::BadSession => error_codes::BAD_SESSION,
            McpError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            McpError::Internal(_) => error_codes::INTERNAL_ERROR,
        };
        JsonRpcError {
            code,
            message: self.to_string(),
            data: None,
        }
    }
}

impl Classify for McpError {
    fn class(&self) -> ErrorClass {
        match self {
            McpError::Internal(_) => ErrorClass::Application,
            _ => ErrorClass::Protocol,
        }
    }
}

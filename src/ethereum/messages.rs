//! JSON-RPC message types for Ethereum nodes

use serde::{Deserialize, Serialize};

/// JSON-RPC protocol version sent with every request
pub const JSONRPC_VERSION: &str = "2.0";

/// Block tag used for balance lookups
pub const LATEST_BLOCK: &str = "latest";

/// Outgoing JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Vec<serde_json::Value>,
}

impl RpcRequest {
    /// Build an `eth_getBalance` request for `address` at the latest block
    pub fn get_balance(id: u64, address: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: "eth_getBalance".to_string(),
            params: vec![
                serde_json::Value::String(address.to_string()),
                serde_json::Value::String(LATEST_BLOCK.to_string()),
            ],
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Incoming JSON-RPC response; exactly one of `result`/`error` is set by a
/// well-behaved node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse<T> {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

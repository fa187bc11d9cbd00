//! Upstream node JSON-RPC.
//!
//! Raw transaction submission and retrieval are passed straight through to
//! a bitcoind-style node. The listing engine never calls into this module.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::RpcConfig;
use crate::types::TxId;

/// Node error code for an unknown transaction or address.
pub const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;
/// Node error code for a generic verification failure on submission.
pub const RPC_VERIFY_ERROR: i64 = -25;
/// Node error code for a transaction rejected by mempool policy.
pub const RPC_VERIFY_REJECTED: i64 = -26;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The node answered with a JSON-RPC error object.
    #[error("{message}. Code:{code}")]
    Node { code: i64, message: String },

    #[error("node unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed node response: {0}")]
    Malformed(String),
}

/// Client-facing message for a failed `sendrawtransaction`.
pub fn describe_send_failure(err: &RpcError) -> String {
    match err {
        RpcError::Node { code, message } if *code == RPC_VERIFY_ERROR => {
            format!("Generic error {} (code {})", message, code)
        }
        RpcError::Node { code, message } if *code == RPC_VERIFY_REJECTED => {
            format!(
                "Transaction rejected by network (code {}). Reason: {}",
                code, message
            )
        }
        RpcError::Node { code, message } => format!("{} (code {})", message, code),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// NodeRpc
// ---------------------------------------------------------------------------

/// The node calls the HTTP layer passes through.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// Submits a hex-encoded transaction and returns its id.
    async fn send_raw_transaction(&self, raw_hex: &str) -> Result<TxId, RpcError>;

    /// Hex-encoded transaction, `None` if the node does not know it.
    async fn get_raw_transaction(&self, txid: &str) -> Result<Option<String>, RpcError>;
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// `reqwest` client for a bitcoind-compatible endpoint (JSON-RPC 1.0 with
/// HTTP basic auth).
pub struct NodeRpcClient {
    http: reqwest::Client,
    url: String,
    user: Option<String>,
    password: Option<String>,
    request_id: AtomicU64,
}

impl NodeRpcClient {
    pub fn new(config: &RpcConfig) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            url: config.url.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            request_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<P: Serialize + Send, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "1.0",
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let mut builder = self.http.post(&self.url).json(&request);
        if let Some(user) = &self.user {
            builder = builder.basic_auth(user, self.password.as_ref());
        }

        // bitcoind reports RPC errors with a 500 status and a JSON body, so
        // the body is parsed regardless of the status code.
        let response = builder.send().await?;
        let status = response.status();
        let body: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| RpcError::Malformed(format!("{} (HTTP {})", e, status)))?;

        if let Some(err) = body.error {
            tracing::debug!(method, code = err.code, message = %err.message, "node rpc error");
            return Err(RpcError::Node {
                code: err.code,
                message: err.message,
            });
        }
        body.result
            .ok_or_else(|| RpcError::Malformed(format!("{} returned no result", method)))
    }
}

#[async_trait]
impl NodeRpc for NodeRpcClient {
    async fn send_raw_transaction(&self, raw_hex: &str) -> Result<TxId, RpcError> {
        self.call("sendrawtransaction", [raw_hex]).await
    }

    async fn get_raw_transaction(&self, txid: &str) -> Result<Option<String>, RpcError> {
        match self.call::<_, String>("getrawtransaction", [txid]).await {
            Ok(raw) => Ok(Some(raw)),
            Err(RpcError::Node { code, .. }) if code == RPC_INVALID_ADDRESS_OR_KEY => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(code: i64, message: &str) -> RpcError {
        RpcError::Node {
            code,
            message: message.to_string(),
        }
    }

    #[test]
    fn verify_error_message() {
        assert_eq!(
            describe_send_failure(&node(-25, "Missing inputs")),
            "Generic error Missing inputs (code -25)"
        );
    }

    #[test]
    fn rejection_message_includes_reason() {
        assert_eq!(
            describe_send_failure(&node(-26, "min relay fee not met")),
            "Transaction rejected by network (code -26). Reason: min relay fee not met"
        );
    }

    #[test]
    fn other_codes_are_suffixed() {
        assert_eq!(
            describe_send_failure(&node(-22, "TX decode failed")),
            "TX decode failed (code -22)"
        );
    }

    #[test]
    fn node_error_display_matches_raw_lookup_format() {
        assert_eq!(
            node(-8, "parameter 1 must be hexadecimal").to_string(),
            "parameter 1 must be hexadecimal. Code:-8"
        );
    }

    #[test]
    fn request_shape_is_json_rpc_1() {
        let req = JsonRpcRequest {
            jsonrpc: "1.0",
            id: 7,
            method: "getrawtransaction",
            params: ["ab"],
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({
                "jsonrpc": "1.0",
                "id": 7,
                "method": "getrawtransaction",
                "params": ["ab"]
            })
        );
    }

    #[test]
    fn error_response_parses() {
        let body: JsonRpcResponse<String> = serde_json::from_str(
            r#"{"result":null,"error":{"code":-5,"message":"No such mempool transaction"},"id":1}"#,
        )
        .unwrap();
        assert!(body.result.is_none());
        assert_eq!(body.error.unwrap().code, RPC_INVALID_ADDRESS_OR_KEY);
    }

    #[test]
    fn client_builds_from_default_config() {
        let client = NodeRpcClient::new(&RpcConfig::default()).unwrap();
        assert_eq!(client.url(), crate::config::DEFAULT_RPC_URL);
    }
}

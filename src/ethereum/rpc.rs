//! JSON-RPC balance source for Ethereum-compatible nodes

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};

use super::messages::{RpcRequest, RpcResponse};
use crate::common::errors::{Result, TrackerError};
use crate::common::traits::BalanceSource;

/// Decimal places between wei and ether
pub const WEI_DECIMALS: u32 = 18;

/// Balance source backed by `eth_getBalance`
#[derive(Debug)]
pub struct EthRpcBalanceSource {
    /// HTTP client
    client: Client,
    /// JSON-RPC endpoint
    rpc_url: String,
    /// Request id counter
    next_id: AtomicU64,
}

impl EthRpcBalanceSource {
    /// Create a new balance source with the default 30s timeout
    pub fn new(rpc_url: &str) -> Result<Self> {
        Self::with_timeout(rpc_url, Duration::from_secs(30))
    }

    /// Create a new balance source with custom timeout
    ///
    /// The timeout covers the whole request. A node that never answers
    /// surfaces as an error once it elapses.
    pub fn with_timeout(rpc_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrackerError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            rpc_url: rpc_url.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    /// The JSON-RPC endpoint this source talks to
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Fetch the raw balance of `address` in wei
    #[instrument(skip(self))]
    pub async fn get_balance_wei(&self, address: &str) -> Result<u128> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::get_balance(id, address);
        debug!("Requesting balance from: {}", self.rpc_url);

        let response = self.client.post(&self.rpc_url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::Rpc(format!(
                "Node returned status {}: {}",
                status, body
            )));
        }

        let rpc_response: RpcResponse<String> = response.json().await?;

        if let Some(error) = rpc_response.error {
            return Err(TrackerError::Rpc(format!(
                "eth_getBalance failed ({}): {}",
                error.code, error.message
            )));
        }

        let quantity = rpc_response.result.ok_or_else(|| {
            TrackerError::InvalidResponse("eth_getBalance returned no result".to_string())
        })?;

        parse_quantity(&quantity)
    }
}

#[async_trait]
impl BalanceSource for EthRpcBalanceSource {
    async fn get_balance(&self, address: &str) -> Result<Decimal> {
        let wei = self.get_balance_wei(address).await?;
        wei_to_ether(wei)
    }

    fn source_name(&self) -> &'static str {
        "eth-json-rpc"
    }
}

/// Parse a JSON-RPC hex quantity such as `"0x1bc16d674ec80000"`
pub fn parse_quantity(quantity: &str) -> Result<u128> {
    let digits = quantity
        .strip_prefix("0x")
        .ok_or_else(|| TrackerError::InvalidResponse(format!("Invalid quantity: {}", quantity)))?;

    if digits.is_empty() {
        return Err(TrackerError::InvalidResponse(format!(
            "Invalid quantity: {}",
            quantity
        )));
    }

    u128::from_str_radix(digits, 16)
        .map_err(|e| TrackerError::InvalidResponse(format!("Invalid quantity {}: {}", quantity, e)))
}

/// Convert wei to ether, dropping trailing zeros
pub fn wei_to_ether(wei: u128) -> Result<Decimal> {
    let wei = i128::try_from(wei)
        .map_err(|_| TrackerError::InvalidResponse(format!("Balance out of range: {}", wei)))?;

    Decimal::try_from_i128_with_scale(wei, WEI_DECIMALS)
        .map(|d| d.normalize())
        .map_err(|e| TrackerError::InvalidResponse(format!("Balance out of range: {}", e)))
}

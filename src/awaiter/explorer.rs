//! EVM deposit detection through an Etherscan-compatible explorer API

use super::cancel::CancelToken;
use super::poll::PollLoop;
use super::{DepositAwaiter, DepositWatchConfig};
use crate::error::{BridgeError, BridgeResult};

use async_trait::async_trait;
use num_bigint::BigUint;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// One ERC-20 transfer as reported by `action=tokentx`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub block_number: String,
    #[serde(default)]
    pub time_stamp: String,
    pub hash: String,
    #[serde(default)]
    pub block_hash: String,
    pub from: String,
    pub contract_address: String,
    pub to: String,
    pub value: String,
    #[serde(default)]
    pub token_name: String,
    #[serde(default)]
    pub token_symbol: String,
    #[serde(default)]
    pub token_decimal: String,
    #[serde(default)]
    pub confirmations: String,
}

#[derive(Debug, Deserialize)]
struct TokenTxResponse {
    status: String,
    message: String,
    result: TokenTxResult,
}

/// `result` is a list on success and an error string otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenTxResult {
    Transfers(Vec<TokenTransfer>),
    Message(String),
}

/// First transfer of `watch_amount` of `watch_asset` into `watch_address`.
///
/// Addresses compare case-insensitively (explorers return lowercase hex,
/// configs often carry checksummed hex); the value compares numerically.
pub fn find_deposit(transfers: &[TokenTransfer], cfg: &DepositWatchConfig) -> Option<TokenTransfer> {
    transfers
        .iter()
        .find(|t| {
            t.contract_address.eq_ignore_ascii_case(&cfg.watch_asset)
                && t.to.eq_ignore_ascii_case(&cfg.watch_address)
                && BigUint::parse_bytes(t.value.as_bytes(), 10).as_ref() == Some(&cfg.watch_amount)
        })
        .cloned()
}

pub struct ExplorerAwaiter {
    client: Client,
    api_url: String,
    api_key: String,
    cfg: Option<DepositWatchConfig>,
}

impl ExplorerAwaiter {
    pub fn new(api_url: &str, api_key: &str) -> BridgeResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BridgeError::Config(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            cfg: None,
        })
    }

    /// `{api}/api?module=account&action=tokentx&address=..&startblock=..&sort=desc&apikey=..`
    pub fn request_url(&self, cfg: &DepositWatchConfig) -> BridgeResult<Url> {
        let start_block = cfg.block_start.unwrap_or(0).to_string();
        Url::parse_with_params(
            &format!("{}/api", self.api_url),
            &[
                ("module", "account"),
                ("action", "tokentx"),
                ("address", cfg.watch_address.as_str()),
                ("startblock", start_block.as_str()),
                ("sort", "desc"),
                ("apikey", self.api_key.as_str()),
            ],
        )
        .map_err(|e| BridgeError::Config(format!("Invalid explorer URL {}: {}", self.api_url, e)))
    }

    /// Latest transfers touching the watched address.
    pub async fn request_last_deposits(
        &self,
        cfg: &DepositWatchConfig,
    ) -> BridgeResult<Vec<TokenTransfer>> {
        let url = self.request_url(cfg)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::Explorer(e.to_string()))?
            .error_for_status()
            .map_err(|e| BridgeError::Explorer(e.to_string()))?;

        let body: TokenTxResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::Explorer(format!("Invalid tokentx response: {}", e)))?;

        let transfers = transfers_from(body)?;
        debug!("Explorer returned {} transfers", transfers.len());
        Ok(transfers)
    }
}

fn transfers_from(body: TokenTxResponse) -> BridgeResult<Vec<TokenTransfer>> {
    match body.result {
        TokenTxResult::Transfers(transfers) => Ok(transfers),
        // status "0" with an empty history is not an error
        TokenTxResult::Message(_) if body.message.starts_with("No transactions found") => {
            Ok(Vec::new())
        }
        TokenTxResult::Message(reason) => Err(BridgeError::Explorer(format!(
            "status {}: {}: {}",
            body.status, body.message, reason
        ))),
    }
}

#[async_trait]
impl DepositAwaiter for ExplorerAwaiter {
    type Event = TokenTransfer;

    fn set_cfg(&mut self, cfg: DepositWatchConfig) {
        self.cfg = Some(cfg);
    }

    async fn await_token_deposit(
        &mut self,
        delivery: mpsc::Sender<TokenTransfer>,
        cancel: CancelToken,
    ) -> BridgeResult<()> {
        let this = &*self;
        let cfg = this.cfg.as_ref().ok_or(BridgeError::AwaiterNotConfigured)?;

        PollLoop::new("explorer", cfg, cancel)
            .run(
                delivery,
                || this.request_last_deposits(cfg),
                |transfers| find_deposit(&transfers, cfg),
            )
            .await
    }
}

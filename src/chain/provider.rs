//! Ledger JSON-RPC access

use super::message::Hash;
use super::pubkey::Pubkey;
use crate::error::{BridgeError, BridgeResult};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ethers::providers::{Http, Provider, ProviderError, RpcError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Account state returned by `getAccountInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
    pub executable: bool,
}

/// The chain reads and writes the executor and ledger awaiter need.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Most recent blockhash, used as the transaction recency token.
    async fn latest_blockhash(&self) -> BridgeResult<Hash>;

    /// Submit a signed wire transaction; returns its base58 signature.
    async fn send_raw_transaction(&self, raw_tx: &[u8]) -> BridgeResult<String>;

    /// `None` when the account does not exist.
    async fn account_info(&self, address: &Pubkey) -> BridgeResult<Option<AccountInfo>>;
}

#[async_trait]
impl<T: LedgerRpc + ?Sized> LedgerRpc for Arc<T> {
    async fn latest_blockhash(&self) -> BridgeResult<Hash> {
        (**self).latest_blockhash().await
    }

    async fn send_raw_transaction(&self, raw_tx: &[u8]) -> BridgeResult<String> {
        (**self).send_raw_transaction(raw_tx).await
    }

    async fn account_info(&self, address: &Pubkey) -> BridgeResult<Option<AccountInfo>> {
        (**self).account_info(address).await
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RpcResponse<T> {
    value: T,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
    last_valid_block_height: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccountValue {
    data: (String, String),
    executable: bool,
    lamports: u64,
    owner: String,
}

/// JSON-RPC over HTTP, using the ethers transport.
pub struct HttpLedgerRpc {
    endpoint: String,
    commitment: String,
    provider: Provider<Http>,
}

impl HttpLedgerRpc {
    pub fn new(endpoint: &str, commitment: &str) -> BridgeResult<Self> {
        let provider = Provider::<Http>::try_from(endpoint)
            .map_err(|e| BridgeError::Config(format!("Invalid RPC endpoint {endpoint}: {e}")))?
            .interval(Duration::from_millis(100));

        debug!("Ledger RPC client created for {}", endpoint);

        Ok(Self {
            endpoint: endpoint.to_string(),
            commitment: commitment.to_string(),
            provider,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `getHealth` returns "ok" on a synced node.
    pub async fn health_check(&self) -> bool {
        match self.provider.request::<_, String>("getHealth", Vec::<u8>::new()).await {
            Ok(status) => status == "ok",
            Err(e) => {
                error!("Health check failed for {}: {}", self.endpoint, e);
                false
            }
        }
    }

    fn transport_error(&self, e: ProviderError) -> BridgeError {
        BridgeError::Rpc {
            endpoint: self.endpoint.clone(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl LedgerRpc for HttpLedgerRpc {
    async fn latest_blockhash(&self) -> BridgeResult<Hash> {
        let response: RpcResponse<BlockhashValue> = self
            .provider
            .request(
                "getLatestBlockhash",
                [json!({ "commitment": self.commitment })],
            )
            .await
            .map_err(|e| self.transport_error(e))?;

        debug!(
            "Latest blockhash {} (valid until height {})",
            response.value.blockhash, response.value.last_valid_block_height
        );

        decode_hash(&response.value.blockhash)
    }

    async fn send_raw_transaction(&self, raw_tx: &[u8]) -> BridgeResult<String> {
        let encoded = BASE64.encode(raw_tx);
        let config = json!({
            "encoding": "base64",
            "preflightCommitment": self.commitment,
        });

        match self
            .provider
            .request::<_, String>("sendTransaction", (encoded, config))
            .await
        {
            Ok(signature) => Ok(signature),
            Err(e) => match e.as_error_response() {
                // The node answered: preflight or the program refused it.
                Some(rpc_error) => {
                    warn!("Transaction rejected by {}: {}", self.endpoint, rpc_error);
                    let reason = match &rpc_error.data {
                        Some(data) => format!("{}: {}", rpc_error.message, data),
                        None => rpc_error.message.clone(),
                    };
                    Err(BridgeError::Rejected(reason))
                }
                None => Err(self.transport_error(e)),
            },
        }
    }

    async fn account_info(&self, address: &Pubkey) -> BridgeResult<Option<AccountInfo>> {
        let response: RpcResponse<Option<AccountValue>> = self
            .provider
            .request(
                "getAccountInfo",
                (
                    address.to_base58(),
                    json!({ "encoding": "base64", "commitment": self.commitment }),
                ),
            )
            .await
            .map_err(|e| self.transport_error(e))?;

        response.value.map(decode_account).transpose()
    }
}

fn decode_hash(encoded: &str) -> BridgeResult<Hash> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| malformed("getLatestBlockhash", e.to_string()))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| malformed("getLatestBlockhash", format!("hash of {} bytes", v.len())))
}

fn decode_account(value: AccountValue) -> BridgeResult<AccountInfo> {
    let (payload, encoding) = value.data;
    if encoding != "base64" {
        return Err(malformed(
            "getAccountInfo",
            format!("unexpected data encoding {encoding}"),
        ));
    }

    Ok(AccountInfo {
        owner: value.owner.parse()?,
        lamports: value.lamports,
        data: BASE64
            .decode(payload)
            .map_err(|e| malformed("getAccountInfo", e.to_string()))?,
        executable: value.executable,
    })
}

fn malformed(method: &str, message: String) -> BridgeError {
    BridgeError::MalformedResponse {
        method: method.to_string(),
        message,
    }
}

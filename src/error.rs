//! Error types for the bridge client

use thiserror::Error;

/// Main error type for the bridge client
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("RPC error on {endpoint}: {message}")]
    Rpc { endpoint: String, message: String },

    #[error("Malformed RPC response for {method}: {message}")]
    MalformedResponse { method: String, message: String },

    #[error("Explorer request failed: {0}")]
    Explorer(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid wire format: expected at least {expected} bytes, got {actual}")]
    InvalidFormat { expected: usize, actual: usize },

    #[error("Mixed operation encoding: {0}")]
    MixedEncoding(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Transaction too large: {size} bytes exceeds limit of {limit}")]
    TransactionTooLarge { size: usize, limit: usize },

    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("Account {0} not found")]
    AccountNotFound(String),

    #[error("Unexpected account owner for {account}: {owner}")]
    UnexpectedOwner { account: String, owner: String },

    #[error("Await configuration is not set")]
    AwaiterNotConfigured,

    #[error("Await canceled")]
    Canceled,

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Delivery channel closed")]
    ChannelClosed,
}

impl BridgeError {
    /// Check if error is a transient network condition
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::Rpc { .. } | BridgeError::Explorer(_) | BridgeError::Timeout { .. }
        )
    }

    /// Check if the program (or the runtime in front of it) refused the transaction
    pub fn is_on_chain_rejection(&self) -> bool {
        matches!(self, BridgeError::Rejected(_))
    }
}

impl From<borsh::io::Error> for BridgeError {
    fn from(e: borsh::io::Error) -> Self {
        BridgeError::Serialization(e.to_string())
    }
}

/// Result type for bridge client operations
pub type BridgeResult<T> = Result<T, BridgeError>;

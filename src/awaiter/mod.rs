//! Deposit awaiters
//!
//! An awaiter polls one source on an interval until a deposit matching its
//! [`DepositWatchConfig`] shows up, delivers that single event and closes
//! its channel. Three sources are provided:
//! - [`ExplorerAwaiter`]: EVM token transfers from an explorer API
//! - [`LedgerAwaiter`]: balance changes of a ledger token account
//! - [`GenericAwaiter`]: caller supplied retriever and comparator

mod cancel;
mod explorer;
mod generic;
mod ledger;
mod poll;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use explorer::{find_deposit, ExplorerAwaiter, TokenTransfer};
pub use generic::GenericAwaiter;
pub use ledger::{LedgerAwaiter, LedgerDeposit};

use crate::chain::{associated_token_address, Pubkey};
use crate::decimal::CrossChainAmount;
use crate::error::BridgeResult;

use async_trait::async_trait;
use num_bigint::BigUint;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What to watch for. Read-only while an awaiter polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositWatchConfig {
    /// Receiving address (EVM) or token account (ledger)
    pub watch_address: String,
    /// Token contract the deposit must come from (EVM)
    pub watch_asset: String,
    /// Exact amount in base units
    pub watch_amount: BigUint,
    /// First block to consider (explorer only)
    pub block_start: Option<u64>,
    /// Sleep between polls
    pub poll_interval: Duration,
    /// Give up after this long
    pub timeout: Option<Duration>,
}

impl DepositWatchConfig {
    pub fn new(
        watch_address: impl Into<String>,
        watch_asset: impl Into<String>,
        watch_amount: BigUint,
    ) -> Self {
        Self {
            watch_address: watch_address.into(),
            watch_asset: watch_asset.into(),
            watch_amount,
            block_start: None,
            poll_interval: Duration::from_secs(5),
            timeout: None,
        }
    }

    /// Watch for `amount` arriving on the origin chain.
    pub fn at_origin(
        watch_address: impl Into<String>,
        origin_asset: impl Into<String>,
        amount: &CrossChainAmount,
    ) -> Self {
        Self::new(watch_address, origin_asset, amount.as_origin())
    }

    /// Watch for `amount` arriving on the destination chain.
    pub fn at_destination(
        watch_address: impl Into<String>,
        destination_asset: impl Into<String>,
        amount: &CrossChainAmount,
    ) -> Self {
        Self::new(watch_address, destination_asset, amount.as_destination())
    }

    /// Watch the associated token account `owner` holds for `mint`.
    pub fn associated(owner: &Pubkey, mint: &Pubkey, watch_amount: BigUint) -> BridgeResult<Self> {
        let account = associated_token_address(owner, mint)?;
        Ok(Self::new(account.to_base58(), mint.to_base58(), watch_amount))
    }

    pub fn with_block_start(mut self, block: u64) -> Self {
        self.block_start = Some(block);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
pub trait DepositAwaiter: Send {
    type Event: Send + 'static;

    fn set_cfg(&mut self, cfg: DepositWatchConfig);

    /// Poll until a matching deposit is delivered on `delivery`.
    ///
    /// Retrieval errors are logged and polling continues. Returns
    /// `Canceled` or `Timeout` when stopped early and `AwaiterNotConfigured`
    /// when `set_cfg` was never called. The sender is dropped on return.
    async fn await_token_deposit(
        &mut self,
        delivery: mpsc::Sender<Self::Event>,
        cancel: CancelToken,
    ) -> BridgeResult<()>;
}

/// Run an awaiter on its own task.
///
/// The receiver yields at most one event and then `None`.
pub fn spawn<A>(
    mut awaiter: A,
    cancel: CancelToken,
) -> (mpsc::Receiver<A::Event>, JoinHandle<BridgeResult<()>>)
where
    A: DepositAwaiter + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let handle = tokio::spawn(async move { awaiter.await_token_deposit(tx, cancel).await });
    (rx, handle)
}

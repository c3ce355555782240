//! Ledger deposit detection by watching a token account balance

use super::cancel::CancelToken;
use super::poll::PollLoop;
use super::{DepositAwaiter, DepositWatchConfig};
use crate::chain::{LedgerRpc, Pubkey, TokenAccount, TOKEN_PROGRAM_ID};
use crate::error::{BridgeError, BridgeResult};

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// Balance increase observed on the watched token account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerDeposit {
    #[serde(serialize_with = "as_base58")]
    pub account: Pubkey,
    pub previous_balance: u64,
    pub balance: u64,
}

impl LedgerDeposit {
    pub fn amount(&self) -> u64 {
        self.balance - self.previous_balance
    }
}

/// Watches `watch_address` (an SPL token account).
///
/// The first successful poll only records a baseline. Every later poll
/// compares against the previous one and matches when the balance grew by
/// exactly `watch_amount`.
pub struct LedgerAwaiter<R: LedgerRpc> {
    rpc: R,
    cfg: Option<DepositWatchConfig>,
}

impl<R: LedgerRpc> LedgerAwaiter<R> {
    pub fn new(rpc: R) -> Self {
        Self { rpc, cfg: None }
    }

    /// Fetch and decode the token account, checking its owner program.
    pub async fn request_token_account(&self, address: &Pubkey) -> BridgeResult<TokenAccount> {
        let info = self
            .rpc
            .account_info(address)
            .await?
            .ok_or_else(|| BridgeError::AccountNotFound(address.to_base58()))?;

        if info.owner != TOKEN_PROGRAM_ID {
            return Err(BridgeError::UnexpectedOwner {
                account: address.to_base58(),
                owner: info.owner.to_base58(),
            });
        }

        TokenAccount::unpack(&info.data)
    }
}

/// Tracks the previous balance between polls.
struct BalanceTracker {
    account: Pubkey,
    target: BigUint,
    previous: Option<u64>,
}

impl BalanceTracker {
    fn observe(&mut self, balance: u64) -> Option<LedgerDeposit> {
        let Some(previous) = self.previous.replace(balance) else {
            debug!("Baseline balance for {}: {}", self.account, balance);
            return None;
        };

        let delta = balance.checked_sub(previous)?;
        if BigUint::from(delta) != self.target {
            if delta > 0 {
                debug!(
                    "Balance of {} grew by {}, waiting for {}",
                    self.account, delta, self.target
                );
            }
            return None;
        }

        Some(LedgerDeposit {
            account: self.account,
            previous_balance: previous,
            balance,
        })
    }
}

#[async_trait]
impl<R: LedgerRpc + 'static> DepositAwaiter for LedgerAwaiter<R> {
    type Event = LedgerDeposit;

    fn set_cfg(&mut self, cfg: DepositWatchConfig) {
        self.cfg = Some(cfg);
    }

    async fn await_token_deposit(
        &mut self,
        delivery: mpsc::Sender<LedgerDeposit>,
        cancel: CancelToken,
    ) -> BridgeResult<()> {
        let this = &*self;
        let cfg = this.cfg.as_ref().ok_or(BridgeError::AwaiterNotConfigured)?;
        let account: Pubkey = cfg.watch_address.parse()?;

        let mut tracker = BalanceTracker {
            account,
            target: cfg.watch_amount.clone(),
            previous: None,
        };

        PollLoop::new("ledger", cfg, cancel)
            .run(
                delivery,
                || this.request_token_account(&account),
                |token_account| tracker.observe(token_account.amount),
            )
            .await
    }
}

fn as_base58<S: serde::Serializer>(key: &Pubkey, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&key.to_base58())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awaiter::cancel_pair;
    use crate::chain::provider::MockLedgerRpc;
    use crate::chain::token_account::pack_for_tests;
    use crate::chain::AccountInfo;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn watched() -> Pubkey {
        Pubkey::new([7u8; 32])
    }

    fn cfg(amount: u64) -> DepositWatchConfig {
        DepositWatchConfig::new(watched().to_base58(), "", BigUint::from(amount))
            .with_poll_interval(Duration::from_millis(1))
    }

    fn token_info(amount: u64) -> AccountInfo {
        AccountInfo {
            owner: TOKEN_PROGRAM_ID,
            lamports: 2_039_280,
            data: pack_for_tests(Pubkey::new([1u8; 32]), Pubkey::new([2u8; 32]), amount),
            executable: false,
        }
    }

    /// Mock that walks through `balances`, repeating the last one.
    fn balances(sequence: Vec<u64>) -> (MockLedgerRpc, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut rpc = MockLedgerRpc::new();
        rpc.expect_account_info().returning(move |_| {
            let i = counter.fetch_add(1, Ordering::SeqCst);
            let amount = sequence[i.min(sequence.len() - 1)];
            Ok(Some(token_info(amount)))
        });
        (rpc, calls)
    }

    #[test]
    fn baseline_never_matches() {
        let mut tracker = BalanceTracker {
            account: watched(),
            target: BigUint::from(0u64),
            previous: None,
        };
        // Even a zero target does not match on the first observation.
        assert_eq!(tracker.observe(500), None);
        assert!(tracker.observe(500).is_some());
    }

    #[test]
    fn decreases_and_partial_increases_do_not_match() {
        let mut tracker = BalanceTracker {
            account: watched(),
            target: BigUint::from(100u64),
            previous: None,
        };
        assert_eq!(tracker.observe(1_000), None);
        assert_eq!(tracker.observe(900), None);
        assert_eq!(tracker.observe(950), None);
        let deposit = tracker.observe(1_050).unwrap();
        assert_eq!(deposit.previous_balance, 950);
        assert_eq!(deposit.amount(), 100);
    }

    #[tokio::test]
    async fn delivers_exact_increase() {
        let (rpc, calls) = balances(vec![1_000, 1_000, 1_437]);
        let mut awaiter = LedgerAwaiter::new(rpc);
        awaiter.set_cfg(cfg(437));

        let (tx, mut rx) = mpsc::channel(1);
        awaiter
            .await_token_deposit(tx, CancelToken::never())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let deposit = rx.recv().await.unwrap();
        assert_eq!(deposit.balance, 1_437);
        assert_eq!(deposit.account, watched());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn wrong_owner_is_logged_and_polling_continues() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut rpc = MockLedgerRpc::new();
        rpc.expect_account_info().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut info = token_info(10);
            info.owner = Pubkey::new([9u8; 32]);
            Ok(Some(info))
        });

        let mut awaiter = LedgerAwaiter::new(rpc);
        awaiter.set_cfg(cfg(5).with_timeout(Duration::from_millis(50)));

        let (tx, mut rx) = mpsc::channel(1);
        let err = awaiter
            .await_token_deposit(tx, CancelToken::never())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Timeout { .. }));
        assert!(calls.load(Ordering::SeqCst) > 1);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn owner_check_rejects_foreign_accounts() {
        let mut rpc = MockLedgerRpc::new();
        rpc.expect_account_info().returning(|_| {
            let mut info = token_info(10);
            info.owner = Pubkey::new([9u8; 32]);
            Ok(Some(info))
        });
        let awaiter = LedgerAwaiter::new(rpc);
        assert!(matches!(
            awaiter.request_token_account(&watched()).await,
            Err(BridgeError::UnexpectedOwner { .. })
        ));

        let mut rpc = MockLedgerRpc::new();
        rpc.expect_account_info().returning(|_| Ok(None));
        let awaiter = LedgerAwaiter::new(rpc);
        assert!(matches!(
            awaiter.request_token_account(&watched()).await,
            Err(BridgeError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn cancel_stops_a_spawned_awaiter() {
        let (rpc, _calls) = balances(vec![1_000]);
        let mut awaiter = LedgerAwaiter::new(rpc);
        awaiter.set_cfg(cfg(437));

        let (handle, token) = cancel_pair();
        let (mut rx, task) = crate::awaiter::spawn(awaiter, token);

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(BridgeError::Canceled)));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn invalid_watch_address_fails_fast() {
        let mut awaiter = LedgerAwaiter::new(MockLedgerRpc::new());
        awaiter.set_cfg(DepositWatchConfig::new("not-base58!", "", BigUint::from(1u8)));

        let (tx, _rx) = mpsc::channel(1);
        assert!(awaiter
            .await_token_deposit(tx, CancelToken::never())
            .await
            .is_err());
    }
}

//! The poll loop every awaiter runs

use super::cancel::CancelToken;
use super::DepositWatchConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::metrics;

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Holds the active-awaiter gauge up until dropped, including on abort.
struct ActiveAwaiter(&'static str);

impl ActiveAwaiter {
    fn enter(name: &'static str) -> Self {
        metrics::record_awaiter_started(name);
        Self(name)
    }
}

impl Drop for ActiveAwaiter {
    fn drop(&mut self) {
        metrics::record_awaiter_stopped(self.0);
    }
}

pub(crate) struct PollLoop {
    name: &'static str,
    interval: Duration,
    deadline: Option<Instant>,
    cancel: CancelToken,
}

impl PollLoop {
    pub(crate) fn new(name: &'static str, cfg: &DepositWatchConfig, cancel: CancelToken) -> Self {
        Self {
            name,
            interval: cfg.poll_interval,
            deadline: cfg.timeout.map(|t| Instant::now() + t),
            cancel,
        }
    }

    /// retrieve → match → sleep, until a match is delivered.
    pub(crate) async fn run<T, E, R, Fut, M>(
        mut self,
        delivery: mpsc::Sender<E>,
        mut retrieve: R,
        mut matches: M,
    ) -> BridgeResult<()>
    where
        R: FnMut() -> Fut,
        Fut: Future<Output = BridgeResult<T>>,
        M: FnMut(T) -> Option<E>,
    {
        let _active = ActiveAwaiter::enter(self.name);
        self.poll(&delivery, &mut retrieve, &mut matches).await
    }

    async fn poll<T, E, R, Fut, M>(
        &mut self,
        delivery: &mpsc::Sender<E>,
        retrieve: &mut R,
        matches: &mut M,
    ) -> BridgeResult<()>
    where
        R: FnMut() -> Fut,
        Fut: Future<Output = BridgeResult<T>>,
        M: FnMut(T) -> Option<E>,
    {
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            metrics::record_awaiter_poll(self.name);

            match self.interruptible(retrieve()).await? {
                Ok(value) => {
                    if let Some(event) = matches(value) {
                        delivery
                            .send(event)
                            .await
                            .map_err(|_| BridgeError::ChannelClosed)?;
                        metrics::record_awaiter_delivery(self.name);
                        info!("{}: deposit matched after {} polls", self.name, attempt);
                        return Ok(());
                    }
                    debug!("{}: poll {} found no matching deposit", self.name, attempt);
                }
                Err(e) => {
                    warn!("{}: poll {} failed: {}", self.name, attempt, e);
                    metrics::record_awaiter_error(self.name);
                }
            }

            self.interruptible(tokio::time::sleep(self.interval)).await?;
        }
    }

    async fn interruptible<F: Future>(&mut self, fut: F) -> BridgeResult<F::Output> {
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            output = fut => Ok(output),
            _ = self.cancel.cancelled() => {
                info!("{}: canceled", self.name);
                Err(BridgeError::Canceled)
            }
            _ = expired => Err(BridgeError::Timeout {
                operation: format!("{} deposit", self.name),
            }),
        }
    }
}

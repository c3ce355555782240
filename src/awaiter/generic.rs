//! Awaiter driven by caller supplied retrieval and matching

use super::cancel::CancelToken;
use super::poll::PollLoop;
use super::{DepositAwaiter, DepositWatchConfig};
use crate::error::{BridgeError, BridgeResult};

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::mpsc;

type Retriever<T> = Box<dyn FnMut() -> BoxFuture<'static, BridgeResult<T>> + Send>;
type Comparator<T, E> = Box<dyn FnMut(T, &DepositWatchConfig) -> Option<E> + Send>;

/// Polls `retriever` and hands each value to `comparator`, delivering the
/// first event the comparator returns.
pub struct GenericAwaiter<T, E> {
    retriever: Retriever<T>,
    comparator: Comparator<T, E>,
    cfg: Option<DepositWatchConfig>,
}

impl<T, E> GenericAwaiter<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new<R, C>(retriever: R, comparator: C) -> Self
    where
        R: FnMut() -> BoxFuture<'static, BridgeResult<T>> + Send + 'static,
        C: FnMut(T, &DepositWatchConfig) -> Option<E> + Send + 'static,
    {
        Self {
            retriever: Box::new(retriever),
            comparator: Box::new(comparator),
            cfg: None,
        }
    }
}

#[async_trait]
impl<T, E> DepositAwaiter for GenericAwaiter<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Event = E;

    fn set_cfg(&mut self, cfg: DepositWatchConfig) {
        self.cfg = Some(cfg);
    }

    async fn await_token_deposit(
        &mut self,
        delivery: mpsc::Sender<E>,
        cancel: CancelToken,
    ) -> BridgeResult<()> {
        let Self {
            retriever,
            comparator,
            cfg,
        } = self;
        let cfg = cfg.as_ref().ok_or(BridgeError::AwaiterNotConfigured)?;

        PollLoop::new("generic", cfg, cancel)
            .run(delivery, || retriever(), |value| comparator(value, cfg))
            .await
    }
}

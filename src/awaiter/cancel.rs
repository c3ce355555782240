//! Cooperative cancellation for awaiter loops

use tokio::sync::watch;

/// Create a connected handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Owner side: flips every token cloned from its pair.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token nobody can cancel.
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Never resolves if the handle was dropped
    /// without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_wakes_every_token() {
        let (handle, mut first) = cancel_pair();
        let mut second = handle.token();
        assert!(!first.is_cancelled());

        handle.cancel();
        first.cancelled().await;
        second.cancelled().await;
        assert!(second.is_cancelled());
    }

    #[test]
    fn cancelled_is_pending_until_cancel() {
        let (handle, mut token) = cancel_pair();
        let mut waiting = tokio_test::task::spawn(token.cancelled());
        tokio_test::assert_pending!(waiting.poll());

        handle.cancel();
        assert!(waiting.is_woken());
        tokio_test::assert_ready!(waiting.poll());
    }

    #[tokio::test]
    async fn never_token_stays_pending() {
        let mut token = CancelToken::never();
        let waited = tokio::time::timeout(Duration::from_millis(20), token.cancelled()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn dropped_handle_does_not_cancel() {
        let (handle, mut token) = cancel_pair();
        drop(handle);
        let waited = tokio::time::timeout(Duration::from_millis(20), token.cancelled()).await;
        assert!(waited.is_err());
        assert!(!token.is_cancelled());
    }
}

//! Long-lived executor with swappable signers

use super::context::{CallContext, CommandResponse, ProgramTarget};
use super::executor::Executor;
use crate::chain::{AccountMeta, AuxiliarySigner, HttpLedgerRpc, Keypair, LedgerRpc, Pubkey};
use crate::error::BridgeResult;

use borsh::BorshSerialize;
use std::sync::Arc;
use tracing::debug;

/// An executor plus the context the next call will use.
///
/// Setters replace the current context; a call in flight keeps the
/// context it started with.
pub struct ExecutorSession<R: LedgerRpc> {
    executor: Executor<R>,
    context: CallContext,
}

impl ExecutorSession<HttpLedgerRpc> {
    /// Session over HTTP JSON-RPC, invoking as the base58 keypair.
    pub fn connect(
        endpoint: &str,
        commitment: &str,
        invoker_base58: &str,
        target: ProgramTarget,
    ) -> BridgeResult<Self> {
        let rpc = HttpLedgerRpc::new(endpoint, commitment)?;
        let invoker = Keypair::from_base58(invoker_base58)?;
        Ok(Self::new(Executor::new(rpc, target), Arc::new(invoker)))
    }
}

impl<R: LedgerRpc> ExecutorSession<R> {
    pub fn new(executor: Executor<R>, invoker: Arc<Keypair>) -> Self {
        Self {
            executor,
            context: CallContext::new(invoker),
        }
    }

    pub fn executor(&self) -> &Executor<R> {
        &self.executor
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn invoker(&self) -> Pubkey {
        self.context.primary().pubkey()
    }

    pub fn set_invoker(&mut self, invoker: Arc<Keypair>) {
        debug!("Session invoker set to {}", invoker.pubkey());
        self.context = self.context.clone().with_primary(invoker);
    }

    pub fn set_additional_signers(&mut self, signers: Vec<Arc<dyn AuxiliarySigner>>) {
        self.context = self.context.clone().with_signers(signers);
    }

    pub fn erase_additional_signers(&mut self) {
        self.set_additional_signers(Vec::new());
    }

    pub fn set_additional_meta(&mut self, meta: Vec<AccountMeta>) {
        self.context = self.context.clone().with_extra_meta(meta);
    }

    pub fn erase_additional_meta(&mut self) {
        self.set_additional_meta(Vec::new());
    }

    pub async fn build_and_invoke<P: BorshSerialize>(
        &self,
        payload: &P,
    ) -> BridgeResult<CommandResponse> {
        self.executor.build_and_invoke(&self.context, payload).await
    }

    pub async fn invoke_instruction_batches<P: BorshSerialize>(
        &self,
        payloads: &[P],
    ) -> BridgeResult<CommandResponse> {
        self.executor
            .invoke_instruction_batches(&self.context, payloads)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::provider::MockLedgerRpc;
    use crate::chain::OracleSigner;
    use crate::programs::PortInstruction;

    fn session() -> ExecutorSession<MockLedgerRpc> {
        let target = ProgramTarget::new(Pubkey::new([10u8; 32]), Pubkey::new([11u8; 32]))
            .with_multisig(Pubkey::new([12u8; 32]));
        ExecutorSession::new(
            Executor::new(MockLedgerRpc::new(), target),
            Arc::new(Keypair::from_seed(&[1u8; 32])),
        )
    }

    #[test]
    fn set_and_erase_lists() {
        let mut session = session();
        let oracle: Arc<dyn AuxiliarySigner> =
            Arc::new(OracleSigner::new(Keypair::from_seed(&[2u8; 32])));

        session.set_additional_signers(vec![oracle.clone(), oracle]);
        session.set_additional_meta(vec![AccountMeta::new(Pubkey::new([20u8; 32]), false)]);
        assert_eq!(session.executor().account_metas(session.context()).len(), 3 + 2 + 1);

        session.erase_additional_signers();
        assert_eq!(session.executor().account_metas(session.context()).len(), 3 + 1);

        session.erase_additional_meta();
        assert_eq!(session.executor().account_metas(session.context()).len(), 3);
    }

    #[test]
    fn earlier_context_is_not_affected_by_setters() {
        let mut session = session();
        let before = session.context().clone();

        let invoker = Arc::new(Keypair::from_seed(&[9u8; 32]));
        session.set_invoker(invoker.clone());
        session.set_additional_meta(vec![AccountMeta::new(Pubkey::new([20u8; 32]), false)]);

        assert_eq!(session.invoker(), invoker.pubkey());
        assert_eq!(before.primary().pubkey(), Keypair::from_seed(&[1u8; 32]).pubkey());
        assert!(before.extra_meta().is_empty());
    }

    #[tokio::test]
    async fn invokes_with_current_context() {
        let mut rpc = MockLedgerRpc::new();
        rpc.expect_latest_blockhash().returning(|| Ok([3u8; 32]));
        rpc.expect_send_raw_transaction()
            .times(1)
            .returning(|_| Ok("5h3Y".to_string()));

        let session = ExecutorSession::new(
            Executor::new(rpc, ProgramTarget::new(Pubkey::new([10u8; 32]), Pubkey::new([11u8; 32]))),
            Arc::new(Keypair::from_seed(&[1u8; 32])),
        );

        let payload = PortInstruction::create_transfer_request([5u8; 32], 2.5);
        let response = tokio_test::assert_ok!(session.build_and_invoke(&payload).await);
        assert_eq!(response.tx_signature, "5h3Y");
    }
}

//! Instruction assembly, multi-party signing and submission

use super::context::{CallContext, CommandResponse, ProgramTarget};
use crate::chain::{
    AccountMeta, Hash, Instruction, LedgerRpc, Message, Pubkey, Signature, Transaction,
    PACKET_DATA_SIZE,
};
use crate::error::{BridgeError, BridgeResult};
use crate::metrics;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use borsh::BorshSerialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error, info};

/// Builds, signs and submits transactions against one program.
///
/// Every call is sequential: fetch blockhash, build, sign, submit. The
/// first error aborts the call. There is no retry and no confirmation
/// polling; the returned signature only means the node accepted it.
pub struct Executor<R: LedgerRpc> {
    rpc: R,
    target: ProgramTarget,
    label: String,
}

impl<R: LedgerRpc> Executor<R> {
    pub fn new(rpc: R, target: ProgramTarget) -> Self {
        let label = target.program_id.to_base58();
        Self { rpc, target, label }
    }

    pub fn target(&self) -> &ProgramTarget {
        &self.target
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Account list for one instruction, in the order the programs read it:
    /// primary, data account, multisig, auxiliary signers, extra accounts.
    pub fn account_metas(&self, ctx: &CallContext) -> Vec<AccountMeta> {
        let mut metas = Vec::with_capacity(3 + ctx.signers().len() + ctx.extra_meta().len());

        metas.push(AccountMeta::new_readonly(ctx.primary().pubkey(), true));
        metas.push(AccountMeta::new(self.target.data_account, false));
        if let Some(multisig) = self.target.multisig_account {
            metas.push(AccountMeta::new(multisig, false));
        }
        metas.extend(ctx.signers().iter().map(|signer| signer.meta()));
        metas.extend_from_slice(ctx.extra_meta());

        metas
    }

    pub fn build_instruction<P: BorshSerialize>(
        &self,
        ctx: &CallContext,
        payload: &P,
    ) -> BridgeResult<Instruction> {
        let data = borsh::to_vec(payload)?;
        debug!("Instruction data for {}: {}", self.label, hex::encode(&data));

        Ok(Instruction {
            program_id: self.target.program_id,
            accounts: self.account_metas(ctx),
            data,
        })
    }

    /// Build a single-instruction transaction from `payload` and submit it.
    pub async fn build_and_invoke<P: BorshSerialize>(
        &self,
        ctx: &CallContext,
        payload: &P,
    ) -> BridgeResult<CommandResponse> {
        let started = Instant::now();
        let result = self.invoke_single(ctx, payload).await;
        self.observe(result, started)
    }

    /// Pack payloads into as few transactions as the packet size allows
    /// and submit them in order.
    ///
    /// All batches share one blockhash. Returns the last batch's response;
    /// a failing batch stops the call and earlier batches stay submitted.
    pub async fn invoke_instruction_batches<P: BorshSerialize>(
        &self,
        ctx: &CallContext,
        payloads: &[P],
    ) -> BridgeResult<CommandResponse> {
        let started = Instant::now();
        let result = self.invoke_batches(ctx, payloads).await;
        self.observe(result, started)
    }

    async fn invoke_single<P: BorshSerialize>(
        &self,
        ctx: &CallContext,
        payload: &P,
    ) -> BridgeResult<CommandResponse> {
        let blockhash = self.fetch_blockhash().await?;
        let instruction = self.build_instruction(ctx, payload)?;
        self.sign_and_submit(ctx, &[instruction], blockhash).await
    }

    async fn invoke_batches<P: BorshSerialize>(
        &self,
        ctx: &CallContext,
        payloads: &[P],
    ) -> BridgeResult<CommandResponse> {
        if payloads.is_empty() {
            return Err(BridgeError::Config("no payloads to invoke".to_string()));
        }

        let blockhash = self.fetch_blockhash().await?;
        let instructions = payloads
            .iter()
            .map(|payload| self.build_instruction(ctx, payload))
            .collect::<BridgeResult<Vec<_>>>()?;

        let batches = pack_batches(instructions, &ctx.primary().pubkey(), blockhash)?;
        info!(
            "Invoking {} payloads on {} in {} transactions",
            payloads.len(),
            self.label,
            batches.len()
        );

        let mut last = None;
        for (i, batch) in batches.iter().enumerate() {
            debug!(
                "Submitting batch {}/{} ({} instructions)",
                i + 1,
                batches.len(),
                batch.len()
            );
            metrics::record_batch(&self.label);
            last = Some(self.sign_and_submit(ctx, batch, blockhash).await?);
        }

        last.ok_or_else(|| BridgeError::Config("no batches were built".to_string()))
    }

    async fn fetch_blockhash(&self) -> BridgeResult<Hash> {
        self.rpc.latest_blockhash().await.map_err(|e| {
            error!("Failed to fetch recent blockhash: {}", e);
            e
        })
    }

    async fn sign_and_submit(
        &self,
        ctx: &CallContext,
        instructions: &[Instruction],
        blockhash: Hash,
    ) -> BridgeResult<CommandResponse> {
        let message = Message::compile(instructions, &ctx.primary().pubkey(), blockhash)?;
        let message_bytes = message.serialize()?;

        for (i, key) in message.account_keys.iter().enumerate() {
            debug!("Instruction account #{} - {}", i, key);
        }

        let mut signatures: HashMap<Pubkey, Signature> = HashMap::new();
        signatures.insert(
            ctx.primary().pubkey(),
            ctx.primary().sign_message(&message_bytes),
        );
        for signer in ctx.signers() {
            signatures.insert(signer.pubkey(), signer.sign(&message_bytes));
        }
        debug!("Collected {} signatures", signatures.len());

        let tx = Transaction::assemble(message, &signatures)?;
        let raw_tx = tx.serialize()?;
        if raw_tx.len() > PACKET_DATA_SIZE {
            return Err(BridgeError::TransactionTooLarge {
                size: raw_tx.len(),
                limit: PACKET_DATA_SIZE,
            });
        }
        debug!("Raw transaction: {}", BASE64.encode(&raw_tx));

        let tx_signature = self.rpc.send_raw_transaction(&raw_tx).await?;
        info!("Transaction submitted to {}: {}", self.label, tx_signature);
        metrics::record_tx_submitted(&self.label);

        Ok(CommandResponse {
            serialized_message: hex::encode(&message_bytes),
            tx_signature,
        })
    }

    fn observe(
        &self,
        result: BridgeResult<CommandResponse>,
        started: Instant,
    ) -> BridgeResult<CommandResponse> {
        match &result {
            Ok(_) => {
                metrics::record_tx_latency(&self.label, started.elapsed().as_secs_f64());
            }
            Err(e) => {
                error!("Invocation of {} failed: {}", self.label, e);
                metrics::record_tx_failed(&self.label, e);
            }
        }
        result
    }
}

/// Greedy packing in payload order. A payload that does not fit in a
/// transaction of its own is an error.
fn pack_batches(
    instructions: Vec<Instruction>,
    fee_payer: &Pubkey,
    blockhash: Hash,
) -> BridgeResult<Vec<Vec<Instruction>>> {
    let measure = |ixs: &[Instruction]| -> BridgeResult<usize> {
        Transaction::wire_size(&Message::compile(ixs, fee_payer, blockhash)?)
    };

    let mut batches = Vec::new();
    let mut current: Vec<Instruction> = Vec::new();

    for instruction in instructions {
        current.push(instruction);
        if measure(&current)? <= PACKET_DATA_SIZE {
            continue;
        }

        if current.len() > 1 {
            let overflow = current.split_off(current.len() - 1);
            batches.push(std::mem::replace(&mut current, overflow));
        }

        let size = measure(&current)?;
        if size > PACKET_DATA_SIZE {
            return Err(BridgeError::TransactionTooLarge {
                size,
                limit: PACKET_DATA_SIZE,
            });
        }
    }

    if !current.is_empty() {
        batches.push(current);
    }

    Ok(batches)
}

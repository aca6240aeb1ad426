use std::sync::Arc;

use crossbill_core::{ActionKind, ChainId, EntityId, InstructionPayload};

use crate::error::LedgerError;
use crate::hooks::NotificationHook;
use crate::store::Ledger;

/// One attested message delivered from another chain: the origin, its
/// per-origin attestation sequence number, and the encoded instruction.
///
/// The transport guarantees authenticity and eventual delivery, nothing
/// else. Messages may arrive late, out of order, or more than once.
#[derive(Debug, Clone)]
pub struct AttestedEvent {
    pub origin_chain: ChainId,
    pub sequence: u64,
    pub payload: Vec<u8>,
}

/// What an attested event turned into once applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppliedEvent {
    Payment(EntityId),
    Withdrawal(EntityId),
}

/// Applies attested cross-chain events to the local ledger, exactly once
/// each, and fans the results out to registered hooks.
pub struct Reconciler {
    ledger: Arc<Ledger>,
    hooks: Vec<Arc<dyn NotificationHook>>,
}

impl Reconciler {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            hooks: Vec::new(),
        }
    }

    pub fn register_hook(&mut self, hook: Arc<dyn NotificationHook>) {
        self.hooks.push(hook);
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Decode and apply one attested event.
    ///
    /// Idempotent under redelivery: the same (origin chain, sequence) pair
    /// always maps to the same entity id, and a second delivery fails with
    /// [`LedgerError::DuplicateEvent`] without touching state or firing
    /// hooks. Events for distinct sequences commute, so delivery order
    /// does not matter.
    pub async fn apply(&self, event: &AttestedEvent) -> Result<AppliedEvent, LedgerError> {
        let instruction = InstructionPayload::decode(&event.payload)?;
        match instruction.action {
            ActionKind::Pay => {
                let (payment_id, payment) = self.ledger.apply_payable_payment(
                    event.origin_chain,
                    event.sequence,
                    &instruction,
                )?;
                for hook in &self.hooks {
                    hook.on_payment(payment_id, &payment).await;
                }
                Ok(AppliedEvent::Payment(payment_id))
            }
            ActionKind::Withdraw => {
                let (withdrawal_id, withdrawal) = self.ledger.apply_foreign_withdrawal(
                    event.origin_chain,
                    event.sequence,
                    &instruction,
                )?;
                for hook in &self.hooks {
                    hook.on_withdrawal(withdrawal_id, &withdrawal).await;
                }
                Ok(AppliedEvent::Withdrawal(withdrawal_id))
            }
            other => {
                tracing::warn!(
                    origin_chain = %event.origin_chain,
                    sequence = event.sequence,
                    action = ?other,
                    "Attested event carries a non-reconcilable action"
                );
                Err(LedgerError::UnexpectedAction(other))
            }
        }
    }
}

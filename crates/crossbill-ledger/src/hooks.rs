use async_trait::async_trait;
use crossbill_core::EntityId;

use crate::state::{PayablePayment, Withdrawal};

/// Observer of committed cross-chain events.
///
/// Hooks fire after the ledger mutation has committed, exactly once per
/// applied event. They are notifications only: a hook cannot veto or roll
/// back the mutation it observes.
#[async_trait]
pub trait NotificationHook: Send + Sync {
    async fn on_payment(&self, payment_id: EntityId, payment: &PayablePayment);

    async fn on_withdrawal(&self, withdrawal_id: EntityId, withdrawal: &Withdrawal);
}

use crossbill_core::{
    derive_id, ActionKind, Address, ChainId, EntityId, EntityKind, InstructionPayload,
    TokenAndAmount,
};

use crate::error::LedgerError;
use crate::state::{ActivityType, Payable, PayablePayment, TokenDetails, UserPayment};
use crate::store::{balances_with_credit, bump, now, Ledger};

impl Ledger {
    /// Pay into a payable from this chain.
    ///
    /// Writes both receipt views under a single payment id: the payer's
    /// [`UserPayment`] and the payable's [`PayablePayment`]. Lazily
    /// initializes the payer's user record.
    pub fn pay(
        &self,
        payer: Address,
        payable_id: EntityId,
        token: Address,
        amount: u128,
    ) -> Result<EntityId, LedgerError> {
        let _gate = self.gate();
        let chain = self.chain_id();
        let mut payable = self.get_payable(payable_id)?;
        let mut token_details = self
            .get_token_details(token)
            .ok_or(LedgerError::UnsupportedToken(token))?;
        check_payment(payable_id, &payable, &token_details, amount)?;

        let mut stats = self.stats_snapshot();
        let (mut user, is_new_user, init_activity_count) = self.prepare_user(payer, &mut stats)?;

        stats.user_payments_count = bump(stats.user_payments_count)?;
        stats.payable_payments_count = bump(stats.payable_payments_count)?;
        stats.activities_count = bump(stats.activities_count)?;
        user.payments_count = bump(user.payments_count)?;
        user.activities_count = bump(user.activities_count)?;
        payable.payments_count = bump(payable.payments_count)?;
        payable.activities_count = bump(payable.activities_count)?;

        let chain_count_key = (payable_id, chain);
        let local_chain_count = bump(
            self.payable_chain_payment_counts
                .get(&chain_count_key)
                .map(|c| *c)
                .unwrap_or(0),
        )?;

        let payment_id = derive_id(EntityKind::Payment, chain, stats.user_payments_count);
        if self.user_payments.contains_key(&payment_id)
            || self.payable_payments.contains_key(&payment_id)
        {
            return Err(LedgerError::DuplicateEvent(payment_id));
        }

        payable.balances = balances_with_credit(&payable.balances, token, amount)?;
        token_details.total_user_paid = token_details
            .total_user_paid
            .checked_add(amount)
            .ok_or(LedgerError::CounterOverflow)?;
        token_details.total_payable_received = token_details
            .total_payable_received
            .checked_add(amount)
            .ok_or(LedgerError::CounterOverflow)?;

        let timestamp = now();
        let details = TokenAndAmount::new(token, amount);
        let user_payment = UserPayment {
            payable_id,
            payer,
            payable_chain_id: chain,
            chain_count: stats.user_payments_count,
            payer_count: user.payments_count,
            payable_count: payable.payments_count,
            timestamp,
            details,
        };
        let payable_payment = PayablePayment {
            payable_id,
            payer,
            payer_chain_id: chain,
            local_chain_count,
            payable_count: payable.payments_count,
            timestamp,
            details,
        };

        let activity_chain_count = stats.activities_count;
        let user_activity_count = user.activities_count;
        let payable_activity_count = payable.activities_count;

        self.commit_stats(stats);
        self.users.insert(payer, user);
        if is_new_user {
            self.commit_new_user_activity(chain, payer, init_activity_count, timestamp);
        }
        self.payables.insert(payable_id, payable);
        self.token_details.insert(token, token_details);
        self.payable_chain_payment_counts
            .insert(chain_count_key, local_chain_count);
        self.user_payments.insert(payment_id, user_payment);
        self.payable_payments.insert(payment_id, payable_payment);
        self.user_payment_ids.entry(payer).or_default().push(payment_id);
        self.payable_payment_ids
            .entry(payable_id)
            .or_default()
            .push(payment_id);
        self.append_activity(
            chain,
            activity_chain_count,
            Some((payer, user_activity_count)),
            Some((payable_id, payable_activity_count)),
            payment_id,
            ActivityType::UserPaid,
            timestamp,
        );
        tracing::info!(
            payment_id = %payment_id,
            payable_id = %payable_id,
            payer = %payer,
            amount = %amount,
            "Payment applied"
        );
        Ok(payment_id)
    }

    /// Apply a payment that was made on another chain and delivered here as
    /// an attested message.
    ///
    /// The payment id derives from the origin chain and its attestation
    /// sequence, so a redelivered message maps to the same id and is
    /// rejected as a duplicate with no state change. The payer keeps no
    /// user record on this chain; only the payable-side receipt is written.
    pub fn apply_payable_payment(
        &self,
        origin_chain: ChainId,
        sequence: u64,
        instruction: &InstructionPayload,
    ) -> Result<(EntityId, PayablePayment), LedgerError> {
        if instruction.action != ActionKind::Pay {
            return Err(LedgerError::UnexpectedAction(instruction.action));
        }
        let _gate = self.gate();
        let chain = self.chain_id();
        let payable_id = instruction.payable_id;
        let token = instruction.token;
        let amount = instruction.amount;

        let mut payable = self.get_payable(payable_id)?;
        let mut token_details = self
            .get_token_details(token)
            .ok_or(LedgerError::UnsupportedToken(token))?;
        check_payment(payable_id, &payable, &token_details, amount)?;

        let payment_id = derive_id(EntityKind::Payment, origin_chain, sequence);
        if self.payable_payments.contains_key(&payment_id) {
            return Err(LedgerError::DuplicateEvent(payment_id));
        }

        let mut stats = self.stats_snapshot();
        stats.payable_payments_count = bump(stats.payable_payments_count)?;
        stats.activities_count = bump(stats.activities_count)?;
        payable.payments_count = bump(payable.payments_count)?;
        payable.activities_count = bump(payable.activities_count)?;

        let chain_count_key = (payable_id, origin_chain);
        let local_chain_count = bump(
            self.payable_chain_payment_counts
                .get(&chain_count_key)
                .map(|c| *c)
                .unwrap_or(0),
        )?;

        payable.balances = balances_with_credit(&payable.balances, token, amount)?;
        token_details.total_payable_received = token_details
            .total_payable_received
            .checked_add(amount)
            .ok_or(LedgerError::CounterOverflow)?;

        let timestamp = now();
        let payment = PayablePayment {
            payable_id,
            payer: instruction.caller,
            payer_chain_id: origin_chain,
            local_chain_count,
            payable_count: payable.payments_count,
            timestamp,
            details: TokenAndAmount::new(token, amount),
        };

        let activity_chain_count = stats.activities_count;
        let payable_activity_count = payable.activities_count;

        self.commit_stats(stats);
        self.payables.insert(payable_id, payable);
        self.token_details.insert(token, token_details);
        self.payable_chain_payment_counts
            .insert(chain_count_key, local_chain_count);
        self.payable_payments.insert(payment_id, payment.clone());
        self.payable_payment_ids
            .entry(payable_id)
            .or_default()
            .push(payment_id);
        self.append_activity(
            chain,
            activity_chain_count,
            None,
            Some((payable_id, payable_activity_count)),
            payment_id,
            ActivityType::PayableReceived,
            timestamp,
        );
        tracing::info!(
            payment_id = %payment_id,
            payable_id = %payable_id,
            origin_chain = %origin_chain,
            sequence,
            amount = %amount,
            "Cross-chain payment applied"
        );
        Ok((payment_id, payment))
    }
}

/// Common admission checks for local and cross-chain payments.
fn check_payment(
    payable_id: EntityId,
    payable: &Payable,
    token_details: &TokenDetails,
    amount: u128,
) -> Result<(), LedgerError> {
    if payable.is_closed {
        return Err(LedgerError::ClosedPayable(payable_id));
    }
    if amount == 0 {
        return Err(LedgerError::ZeroAmount);
    }
    if !token_details.is_supported {
        return Err(LedgerError::UnsupportedToken(token_details.token));
    }
    if !payable.allows_free_payments {
        let mut token_allowed = false;
        for taa in &payable.allowed_tokens_and_amounts {
            if taa.token == token_details.token {
                token_allowed = true;
                if amount <= taa.amount {
                    return Ok(());
                }
            }
        }
        if token_allowed {
            return Err(LedgerError::AmountExceedsAllowance {
                token: token_details.token,
                amount,
            });
        }
        return Err(LedgerError::UnsupportedToken(token_details.token));
    }
    Ok(())
}

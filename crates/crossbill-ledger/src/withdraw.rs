use crossbill_core::{
    derive_id, ActionKind, Address, ChainId, EntityId, EntityKind, InstructionPayload,
    TokenAndAmount, FEE_PERCENT_SCALE,
};

use crate::error::LedgerError;
use crate::state::{ActivityType, Payable, Withdrawal};
use crate::store::{balances_with_debit, bump, now, Ledger};

/// Fee owed on a withdrawal: a basis-point percentage of the amount,
/// floored, then capped at the token's configured maximum.
fn withdrawal_fee(
    amount: u128,
    fee_percent: u16,
    max_withdrawal_fees: u128,
) -> Result<u128, LedgerError> {
    let fee = amount
        .checked_mul(fee_percent as u128)
        .ok_or(LedgerError::CounterOverflow)?
        / FEE_PERCENT_SCALE;
    Ok(fee.min(max_withdrawal_fees))
}

fn check_withdrawal(
    payable_id: EntityId,
    payable: &Payable,
    caller: Address,
    token: Address,
    amount: u128,
) -> Result<(), LedgerError> {
    if payable.host != caller {
        return Err(LedgerError::NotPayableHost { payable_id, caller });
    }
    if amount == 0 {
        return Err(LedgerError::ZeroAmount);
    }
    let available = payable.balance_of(&token);
    if available < amount {
        return Err(LedgerError::InsufficientBalance {
            available,
            required: amount,
        });
    }
    Ok(())
}

impl Ledger {
    /// Withdraw funds from a payable on this chain. Only the host may
    /// withdraw, and only up to the payable's current balance in the token.
    ///
    /// The full amount leaves the payable's balance; the fee is taken out
    /// of the withdrawn amount, so the host nets `amount - fee` and the
    /// fee collector receives the rest. Withdrawals work on closed
    /// payables too.
    pub fn withdraw(
        &self,
        caller: Address,
        payable_id: EntityId,
        token: Address,
        amount: u128,
    ) -> Result<(EntityId, Withdrawal), LedgerError> {
        let _gate = self.gate();
        let chain = self.chain_id();
        let mut payable = self.get_payable(payable_id)?;
        check_withdrawal(payable_id, &payable, caller, token, amount)?;
        // A positive balance implies the token was registered at pay time.
        let mut token_details = self
            .get_token_details(token)
            .ok_or(LedgerError::UnsupportedToken(token))?;
        let config = self.config();
        let fee = withdrawal_fee(
            amount,
            config.withdrawal_fee_percent,
            token_details.max_withdrawal_fees,
        )?;

        let mut stats = self.stats_snapshot();
        let (mut user, is_new_user, init_activity_count) = self.prepare_user(caller, &mut stats)?;

        stats.withdrawals_count = bump(stats.withdrawals_count)?;
        stats.activities_count = bump(stats.activities_count)?;
        user.withdrawals_count = bump(user.withdrawals_count)?;
        user.activities_count = bump(user.activities_count)?;
        payable.withdrawals_count = bump(payable.withdrawals_count)?;
        payable.activities_count = bump(payable.activities_count)?;

        let withdrawal_id = derive_id(EntityKind::Withdrawal, chain, stats.withdrawals_count);
        if self.withdrawals.contains_key(&withdrawal_id) {
            return Err(LedgerError::DuplicateEvent(withdrawal_id));
        }

        payable.balances = balances_with_debit(&payable.balances, token, amount)?;
        token_details.total_withdrawn = token_details
            .total_withdrawn
            .checked_add(amount)
            .ok_or(LedgerError::CounterOverflow)?;
        token_details.total_withdrawal_fees_collected = token_details
            .total_withdrawal_fees_collected
            .checked_add(fee)
            .ok_or(LedgerError::CounterOverflow)?;

        let timestamp = now();
        let withdrawal = Withdrawal {
            payable_id,
            host: caller,
            chain_count: stats.withdrawals_count,
            host_count: user.withdrawals_count,
            payable_count: payable.withdrawals_count,
            timestamp,
            details: TokenAndAmount::new(token, amount),
        };

        let activity_chain_count = stats.activities_count;
        let user_activity_count = user.activities_count;
        let payable_activity_count = payable.activities_count;

        self.commit_stats(stats);
        self.users.insert(caller, user);
        if is_new_user {
            self.commit_new_user_activity(chain, caller, init_activity_count, timestamp);
        }
        self.payables.insert(payable_id, payable);
        self.token_details.insert(token, token_details);
        self.withdrawals.insert(withdrawal_id, withdrawal.clone());
        self.user_withdrawal_ids
            .entry(caller)
            .or_default()
            .push(withdrawal_id);
        self.payable_withdrawal_ids
            .entry(payable_id)
            .or_default()
            .push(withdrawal_id);
        self.append_activity(
            chain,
            activity_chain_count,
            Some((caller, user_activity_count)),
            Some((payable_id, payable_activity_count)),
            withdrawal_id,
            ActivityType::Withdrew,
            timestamp,
        );
        tracing::info!(
            withdrawal_id = %withdrawal_id,
            payable_id = %payable_id,
            amount = %amount,
            fee = %fee,
            "Withdrawal applied"
        );
        Ok((withdrawal_id, withdrawal))
    }

    /// Apply a withdrawal initiated on another chain and delivered here as
    /// an attested message. The withdrawal id derives from the origin chain
    /// and its attestation sequence, so redelivery is rejected as a
    /// duplicate with no state change.
    ///
    /// The host usually has no user record on this chain; their per-user
    /// counters are only touched when one exists.
    pub fn apply_foreign_withdrawal(
        &self,
        origin_chain: ChainId,
        sequence: u64,
        instruction: &InstructionPayload,
    ) -> Result<(EntityId, Withdrawal), LedgerError> {
        if instruction.action != ActionKind::Withdraw {
            return Err(LedgerError::UnexpectedAction(instruction.action));
        }
        let _gate = self.gate();
        let chain = self.chain_id();
        let payable_id = instruction.payable_id;
        let caller = instruction.caller;
        let token = instruction.token;
        let amount = instruction.amount;

        let mut payable = self.get_payable(payable_id)?;
        check_withdrawal(payable_id, &payable, caller, token, amount)?;
        let mut token_details = self
            .get_token_details(token)
            .ok_or(LedgerError::UnsupportedToken(token))?;
        let config = self.config();
        let fee = withdrawal_fee(
            amount,
            config.withdrawal_fee_percent,
            token_details.max_withdrawal_fees,
        )?;

        let withdrawal_id = derive_id(EntityKind::Withdrawal, origin_chain, sequence);
        if self.withdrawals.contains_key(&withdrawal_id) {
            return Err(LedgerError::DuplicateEvent(withdrawal_id));
        }

        let mut stats = self.stats_snapshot();
        stats.withdrawals_count = bump(stats.withdrawals_count)?;
        stats.activities_count = bump(stats.activities_count)?;
        payable.withdrawals_count = bump(payable.withdrawals_count)?;
        payable.activities_count = bump(payable.activities_count)?;

        let mut local_host = self.get_user(caller);
        if let Some(user) = local_host.as_mut() {
            user.withdrawals_count = bump(user.withdrawals_count)?;
            user.activities_count = bump(user.activities_count)?;
        }

        payable.balances = balances_with_debit(&payable.balances, token, amount)?;
        token_details.total_withdrawn = token_details
            .total_withdrawn
            .checked_add(amount)
            .ok_or(LedgerError::CounterOverflow)?;
        token_details.total_withdrawal_fees_collected = token_details
            .total_withdrawal_fees_collected
            .checked_add(fee)
            .ok_or(LedgerError::CounterOverflow)?;

        let timestamp = now();
        let withdrawal = Withdrawal {
            payable_id,
            host: caller,
            chain_count: stats.withdrawals_count,
            host_count: local_host
                .as_ref()
                .map(|u| u.withdrawals_count)
                .unwrap_or(0),
            payable_count: payable.withdrawals_count,
            timestamp,
            details: TokenAndAmount::new(token, amount),
        };

        let activity_chain_count = stats.activities_count;
        let user_attribution = local_host
            .as_ref()
            .map(|u| (caller, u.activities_count));
        let payable_activity_count = payable.activities_count;

        self.commit_stats(stats);
        if let Some(user) = local_host {
            self.users.insert(caller, user);
        }
        self.payables.insert(payable_id, payable);
        self.token_details.insert(token, token_details);
        self.withdrawals.insert(withdrawal_id, withdrawal.clone());
        self.user_withdrawal_ids
            .entry(caller)
            .or_default()
            .push(withdrawal_id);
        self.payable_withdrawal_ids
            .entry(payable_id)
            .or_default()
            .push(withdrawal_id);
        self.append_activity(
            chain,
            activity_chain_count,
            user_attribution,
            Some((payable_id, payable_activity_count)),
            withdrawal_id,
            ActivityType::Withdrew,
            timestamp,
        );
        tracing::info!(
            withdrawal_id = %withdrawal_id,
            payable_id = %payable_id,
            origin_chain = %origin_chain,
            sequence,
            amount = %amount,
            fee = %fee,
            "Cross-chain withdrawal applied"
        );
        Ok((withdrawal_id, withdrawal))
    }
}

use crossbill_core::{derive_id, Address, EntityId, EntityKind, TokenAndAmount};

use crate::error::LedgerError;
use crate::state::{ActivityType, Payable};
use crate::store::{bump, now, Ledger};

/// Longest accepted payable description, in bytes, after trimming.
pub const MAX_DESCRIPTION_LEN: usize = 3000;

/// Most (token, max amount) constraint entries a payable can carry.
pub const MAX_PAYABLE_TOKENS: usize = 20;

impl Ledger {
    /// Create a payable owned by `host`.
    ///
    /// A payable either allows free payments (empty constraint list) or
    /// names the exact tokens it accepts with a maximum amount each —
    /// never both. Lazily initializes the host's user record.
    pub fn create_payable(
        &self,
        host: Address,
        description: &str,
        allowed_tokens_and_amounts: Vec<TokenAndAmount>,
        allows_free_payments: bool,
    ) -> Result<EntityId, LedgerError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(LedgerError::InvalidPayableConfig(
                "description cannot be empty".into(),
            ));
        }
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(LedgerError::InvalidPayableConfig(format!(
                "description exceeds {MAX_DESCRIPTION_LEN} bytes"
            )));
        }
        if allows_free_payments != allowed_tokens_and_amounts.is_empty() {
            return Err(LedgerError::InvalidPayableConfig(
                "a payable either allows free payments or lists token constraints, not both"
                    .into(),
            ));
        }
        self.validate_allowed(&allowed_tokens_and_amounts)?;

        let _gate = self.gate();
        let chain = self.chain_id();
        let mut stats = self.stats_snapshot();
        let (mut user, is_new_user, init_activity_count) = self.prepare_user(host, &mut stats)?;

        stats.payables_count = bump(stats.payables_count)?;
        stats.activities_count = bump(stats.activities_count)?;
        user.payables_count = bump(user.payables_count)?;
        user.activities_count = bump(user.activities_count)?;

        let payable_id = derive_id(EntityKind::Payable, chain, stats.payables_count);
        if self.payables.contains_key(&payable_id) {
            return Err(LedgerError::DuplicateEvent(payable_id));
        }

        let timestamp = now();
        let payable = Payable {
            host,
            chain_count: stats.payables_count,
            host_count: user.payables_count,
            created_at: timestamp,
            description: description.to_owned(),
            payments_count: 0,
            withdrawals_count: 0,
            // Starts at 1: the creation itself is the first activity.
            activities_count: 1,
            allowed_tokens_and_amounts,
            balances: Vec::new(),
            allows_free_payments,
            is_closed: false,
        };

        let activity_chain_count = stats.activities_count;
        let user_activity_count = user.activities_count;

        self.commit_stats(stats);
        self.users.insert(host, user);
        if is_new_user {
            self.commit_new_user_activity(chain, host, init_activity_count, timestamp);
        }
        self.payables.insert(payable_id, payable);
        self.user_payable_ids.entry(host).or_default().push(payable_id);
        self.append_activity(
            chain,
            activity_chain_count,
            Some((host, user_activity_count)),
            Some((payable_id, 1)),
            payable_id,
            ActivityType::CreatedPayable,
            timestamp,
        );
        tracing::info!(payable_id = %payable_id, host = %host, "Payable created");
        Ok(payable_id)
    }

    /// Close a payable: new payments are rejected, withdrawals still work.
    pub fn close_payable(&self, payable_id: EntityId, caller: Address) -> Result<(), LedgerError> {
        let _gate = self.gate();
        let mut payable = self.get_payable(payable_id)?;
        self.ensure_host(payable_id, &payable, caller)?;
        if payable.is_closed {
            return Err(LedgerError::ClosedPayable(payable_id));
        }
        payable.is_closed = true;
        self.commit_payable_update(payable_id, payable, caller, ActivityType::ClosedPayable)?;
        tracing::info!(payable_id = %payable_id, "Payable closed");
        Ok(())
    }

    /// Reopen a closed payable.
    pub fn reopen_payable(&self, payable_id: EntityId, caller: Address) -> Result<(), LedgerError> {
        let _gate = self.gate();
        let mut payable = self.get_payable(payable_id)?;
        self.ensure_host(payable_id, &payable, caller)?;
        if !payable.is_closed {
            return Err(LedgerError::PayableNotClosed(payable_id));
        }
        payable.is_closed = false;
        self.commit_payable_update(payable_id, payable, caller, ActivityType::ReopenedPayable)?;
        tracing::info!(payable_id = %payable_id, "Payable reopened");
        Ok(())
    }

    /// Replace a payable's allowed-token constraints. An empty list turns
    /// free payments back on.
    pub fn update_allowed_tokens_and_amounts(
        &self,
        payable_id: EntityId,
        caller: Address,
        allowed_tokens_and_amounts: Vec<TokenAndAmount>,
    ) -> Result<(), LedgerError> {
        self.validate_allowed(&allowed_tokens_and_amounts)?;
        let _gate = self.gate();
        let mut payable = self.get_payable(payable_id)?;
        self.ensure_host(payable_id, &payable, caller)?;
        payable.allows_free_payments = allowed_tokens_and_amounts.is_empty();
        payable.allowed_tokens_and_amounts = allowed_tokens_and_amounts;
        self.commit_payable_update(
            payable_id,
            payable,
            caller,
            ActivityType::UpdatedPayableAllowedTokensAndAmounts,
        )?;
        tracing::info!(payable_id = %payable_id, "Payable allowed tokens updated");
        Ok(())
    }

    fn ensure_host(
        &self,
        payable_id: EntityId,
        payable: &Payable,
        caller: Address,
    ) -> Result<(), LedgerError> {
        if payable.host != caller {
            return Err(LedgerError::NotPayableHost { payable_id, caller });
        }
        Ok(())
    }

    fn validate_allowed(&self, allowed: &[TokenAndAmount]) -> Result<(), LedgerError> {
        if allowed.len() > MAX_PAYABLE_TOKENS {
            return Err(LedgerError::InvalidPayableConfig(format!(
                "at most {MAX_PAYABLE_TOKENS} token constraints are allowed"
            )));
        }
        for taa in allowed {
            if taa.amount == 0 {
                return Err(LedgerError::ZeroAmount);
            }
            let supported = self
                .token_details
                .get(&taa.token)
                .map(|t| t.is_supported)
                .unwrap_or(false);
            if !supported {
                return Err(LedgerError::UnsupportedToken(taa.token));
            }
        }
        Ok(())
    }

    /// Shared commit path of the host-gated payable mutations: bumps the
    /// activity counters and writes the payable plus one activity record.
    /// Caller must hold the write gate and have validated everything else.
    fn commit_payable_update(
        &self,
        payable_id: EntityId,
        mut payable: Payable,
        caller: Address,
        activity_type: ActivityType,
    ) -> Result<(), LedgerError> {
        let chain = self.chain_id();
        let mut stats = self.stats_snapshot();
        let (mut user, is_new_user, init_activity_count) =
            self.prepare_user(caller, &mut stats)?;

        stats.activities_count = bump(stats.activities_count)?;
        user.activities_count = bump(user.activities_count)?;
        payable.activities_count = bump(payable.activities_count)?;

        let timestamp = now();
        let activity_chain_count = stats.activities_count;
        let user_activity_count = user.activities_count;
        let payable_activity_count = payable.activities_count;

        self.commit_stats(stats);
        self.users.insert(caller, user);
        if is_new_user {
            self.commit_new_user_activity(chain, caller, init_activity_count, timestamp);
        }
        self.payables.insert(payable_id, payable);
        self.append_activity(
            chain,
            activity_chain_count,
            Some((caller, user_activity_count)),
            Some((payable_id, payable_activity_count)),
            payable_id,
            activity_type,
            timestamp,
        );
        Ok(())
    }
}

use dashmap::DashMap;
use std::sync::{Mutex, MutexGuard, RwLock};

use crossbill_core::{
    derive_id, Address, ChainId, CoreError, EntityId, EntityKind, LedgerConfig, TokenAndAmount,
};

use crate::error::LedgerError;
use crate::state::{
    ActivityRecord, ActivityType, ChainStats, Payable, PayablePayment, TokenDetails, User,
    UserPayment, Withdrawal,
};

/// The ledger state store of one chain instance.
///
/// Entities live in one arena per kind, keyed by their 32-byte id; the
/// by-user, by-payable, and chain-wide orderings are id-vector indices over
/// those arenas. Mutations serialize on a store-wide write gate and follow a
/// validate-then-commit discipline: every fallible step (lookups, checked
/// arithmetic) runs before the first write, so an error leaves the store
/// untouched. Readers never observe a partially applied transition.
pub struct Ledger {
    config: RwLock<LedgerConfig>,
    stats: RwLock<ChainStats>,

    pub(crate) users: DashMap<Address, User>,
    pub(crate) token_details: DashMap<Address, TokenDetails>,
    pub(crate) payables: DashMap<EntityId, Payable>,
    pub(crate) payable_payments: DashMap<EntityId, PayablePayment>,
    pub(crate) user_payments: DashMap<EntityId, UserPayment>,
    pub(crate) withdrawals: DashMap<EntityId, Withdrawal>,
    pub(crate) activities: DashMap<EntityId, ActivityRecord>,

    pub(crate) user_payable_ids: DashMap<Address, Vec<EntityId>>,
    pub(crate) user_payment_ids: DashMap<Address, Vec<EntityId>>,
    pub(crate) payable_payment_ids: DashMap<EntityId, Vec<EntityId>>,
    pub(crate) user_withdrawal_ids: DashMap<Address, Vec<EntityId>>,
    pub(crate) payable_withdrawal_ids: DashMap<EntityId, Vec<EntityId>>,
    chain_activity_ids: RwLock<Vec<EntityId>>,
    user_activity_ids: DashMap<Address, Vec<EntityId>>,
    payable_activity_ids: DashMap<EntityId, Vec<EntityId>>,
    pub(crate) payable_chain_payment_counts: DashMap<(EntityId, ChainId), u64>,

    write_gate: Mutex<()>,
}

/// Increment a counter, failing loudly instead of wrapping.
pub(crate) fn bump(count: u64) -> Result<u64, LedgerError> {
    count.checked_add(1).ok_or(LedgerError::CounterOverflow)
}

/// Current time as Unix seconds.
pub(crate) fn now() -> u64 {
    chrono::Utc::now().timestamp() as u64
}

/// Return a copy of `balances` with `amount` of `token` added.
pub(crate) fn balances_with_credit(
    balances: &[TokenAndAmount],
    token: Address,
    amount: u128,
) -> Result<Vec<TokenAndAmount>, LedgerError> {
    let mut updated = balances.to_vec();
    for entry in updated.iter_mut() {
        if entry.token == token {
            entry.amount = entry
                .amount
                .checked_add(amount)
                .ok_or(LedgerError::CounterOverflow)?;
            return Ok(updated);
        }
    }
    updated.push(TokenAndAmount::new(token, amount));
    Ok(updated)
}

/// Return a copy of `balances` with `amount` of `token` deducted.
pub(crate) fn balances_with_debit(
    balances: &[TokenAndAmount],
    token: Address,
    amount: u128,
) -> Result<Vec<TokenAndAmount>, LedgerError> {
    let mut updated = balances.to_vec();
    for entry in updated.iter_mut() {
        if entry.token == token {
            entry.amount =
                entry
                    .amount
                    .checked_sub(amount)
                    .ok_or(LedgerError::InsufficientBalance {
                        available: entry.amount,
                        required: amount,
                    })?;
            return Ok(updated);
        }
    }
    Err(LedgerError::InsufficientBalance {
        available: 0,
        required: amount,
    })
}

impl Ledger {
    /// Construct the store for one chain instance.
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        let stats = ChainStats::new(config.chain_id);
        Ok(Self {
            config: RwLock::new(config),
            stats: RwLock::new(stats),
            users: DashMap::new(),
            token_details: DashMap::new(),
            payables: DashMap::new(),
            payable_payments: DashMap::new(),
            user_payments: DashMap::new(),
            withdrawals: DashMap::new(),
            activities: DashMap::new(),
            user_payable_ids: DashMap::new(),
            user_payment_ids: DashMap::new(),
            payable_payment_ids: DashMap::new(),
            user_withdrawal_ids: DashMap::new(),
            payable_withdrawal_ids: DashMap::new(),
            chain_activity_ids: RwLock::new(Vec::new()),
            user_activity_ids: DashMap::new(),
            payable_activity_ids: DashMap::new(),
            payable_chain_payment_counts: DashMap::new(),
            write_gate: Mutex::new(()),
        })
    }

    /// The chain this ledger instance runs on.
    pub fn chain_id(&self) -> ChainId {
        self.config().chain_id
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> LedgerConfig {
        self.config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Current chain counters snapshot.
    pub fn chain_stats(&self) -> ChainStats {
        self.stats_snapshot()
    }

    // ---- governance ----

    /// Replace the configuration. Governance-gated by the caller.
    pub fn update_config(&self, config: LedgerConfig) -> Result<(), LedgerError> {
        config.validate()?;
        let _gate = self.gate();
        let current = self.config();
        if config.chain_id != current.chain_id {
            return Err(LedgerError::Core(CoreError::ValidationError(
                "chain id of a running ledger cannot change".into(),
            )));
        }
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        tracing::info!("Ledger configuration updated");
        Ok(())
    }

    /// Declare or revoke support for a token, with its withdrawal fee cap.
    /// Governance-gated by the caller.
    pub fn set_token_support(&self, token: Address, is_supported: bool, max_withdrawal_fees: u128) {
        let _gate = self.gate();
        self.token_details
            .entry(token)
            .and_modify(|details| {
                details.is_supported = is_supported;
                details.max_withdrawal_fees = max_withdrawal_fees;
            })
            .or_insert_with(|| TokenDetails::new(token, is_supported, max_withdrawal_fees));
        tracing::info!(token = %token, is_supported, "Token support updated");
    }

    // ---- point queries ----

    pub fn get_payable(&self, payable_id: EntityId) -> Result<Payable, LedgerError> {
        if payable_id.is_zero() {
            return Err(LedgerError::InvalidPayableId(payable_id));
        }
        self.payables
            .get(&payable_id)
            .map(|p| p.clone())
            .ok_or(LedgerError::InvalidPayableId(payable_id))
    }

    pub fn get_payable_payment(&self, payment_id: EntityId) -> Result<PayablePayment, LedgerError> {
        if payment_id.is_zero() {
            return Err(LedgerError::InvalidPaymentId(payment_id));
        }
        self.payable_payments
            .get(&payment_id)
            .map(|p| p.clone())
            .ok_or(LedgerError::InvalidPaymentId(payment_id))
    }

    pub fn get_user_payment(&self, payment_id: EntityId) -> Result<UserPayment, LedgerError> {
        if payment_id.is_zero() {
            return Err(LedgerError::InvalidPaymentId(payment_id));
        }
        self.user_payments
            .get(&payment_id)
            .map(|p| p.clone())
            .ok_or(LedgerError::InvalidPaymentId(payment_id))
    }

    pub fn get_withdrawal(&self, withdrawal_id: EntityId) -> Result<Withdrawal, LedgerError> {
        if withdrawal_id.is_zero() {
            return Err(LedgerError::InvalidWithdrawalId(withdrawal_id));
        }
        self.withdrawals
            .get(&withdrawal_id)
            .map(|w| w.clone())
            .ok_or(LedgerError::InvalidWithdrawalId(withdrawal_id))
    }

    pub fn get_user(&self, wallet: Address) -> Option<User> {
        self.users.get(&wallet).map(|u| u.clone())
    }

    pub fn get_token_details(&self, token: Address) -> Option<TokenDetails> {
        self.token_details.get(&token).map(|t| t.clone())
    }

    /// Current per-token balances of a payable.
    pub fn balances(&self, payable_id: EntityId) -> Result<Vec<TokenAndAmount>, LedgerError> {
        Ok(self.get_payable(payable_id)?.balances)
    }

    /// Allowed (token, max amount) constraints of a payable.
    pub fn allowed_tokens_and_amounts(
        &self,
        payable_id: EntityId,
    ) -> Result<Vec<TokenAndAmount>, LedgerError> {
        Ok(self.get_payable(payable_id)?.allowed_tokens_and_amounts)
    }

    /// How many payments a payable has received from one origin chain.
    pub fn payable_chain_payment_count(
        &self,
        payable_id: EntityId,
        chain: ChainId,
    ) -> Result<u64, LedgerError> {
        // Validates the payable first: zero is the answer only for a payable
        // that exists.
        self.get_payable(payable_id)?;
        Ok(self
            .payable_chain_payment_counts
            .get(&(payable_id, chain))
            .map(|c| *c)
            .unwrap_or(0))
    }

    /// Id of the nth payment made by a wallet (1-based).
    pub fn user_payment_id(&self, wallet: Address, n: u64) -> Result<EntityId, LedgerError> {
        nth_id(
            self.user_payment_ids
                .get(&wallet)
                .map(|ids| ids.clone())
                .unwrap_or_default()
                .as_slice(),
            n,
        )
    }

    /// Id of the nth payment received by a payable (1-based).
    pub fn payable_payment_id(
        &self,
        payable_id: EntityId,
        n: u64,
    ) -> Result<EntityId, LedgerError> {
        self.get_payable(payable_id)?;
        nth_id(
            self.payable_payment_ids
                .get(&payable_id)
                .map(|ids| ids.clone())
                .unwrap_or_default()
                .as_slice(),
            n,
        )
    }

    // ---- activity queries: three orderings over one arena ----

    /// Chain-wide activity feed, oldest first, 1-based pages.
    pub fn chain_activities(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<Vec<ActivityRecord>, LedgerError> {
        let ids = self
            .chain_activity_ids
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let page_ids = paginate(&ids, page, per_page)?;
        Ok(self.resolve_activities(&page_ids))
    }

    /// Activities attributed to one wallet, oldest first, 1-based pages.
    pub fn user_activities(
        &self,
        wallet: Address,
        page: u64,
        per_page: u64,
    ) -> Result<Vec<ActivityRecord>, LedgerError> {
        let ids = self
            .user_activity_ids
            .get(&wallet)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        let page_ids = paginate(&ids, page, per_page)?;
        Ok(self.resolve_activities(&page_ids))
    }

    /// Activities recorded against one payable, oldest first, 1-based pages.
    pub fn payable_activities(
        &self,
        payable_id: EntityId,
        page: u64,
        per_page: u64,
    ) -> Result<Vec<ActivityRecord>, LedgerError> {
        self.get_payable(payable_id)?;
        let ids = self
            .payable_activity_ids
            .get(&payable_id)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        let page_ids = paginate(&ids, page, per_page)?;
        Ok(self.resolve_activities(&page_ids))
    }

    fn resolve_activities(&self, ids: &[EntityId]) -> Vec<ActivityRecord> {
        ids.iter()
            .filter_map(|id| self.activities.get(id).map(|a| a.clone()))
            .collect()
    }

    // ---- internals shared by the mutation paths ----

    pub(crate) fn gate(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn stats_snapshot(&self) -> ChainStats {
        self.stats
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn commit_stats(&self, stats: ChainStats) {
        *self.stats.write().unwrap_or_else(|e| e.into_inner()) = stats;
    }

    /// Load an existing user, or compute a fresh one (bumping the user and
    /// activity counters on the caller's stats copy). Returns the user, a
    /// new-user flag, and the chain-wide activity count reserved for the
    /// initialization activity.
    pub(crate) fn prepare_user(
        &self,
        wallet: Address,
        stats: &mut ChainStats,
    ) -> Result<(User, bool, u64), LedgerError> {
        if let Some(user) = self.users.get(&wallet) {
            return Ok((user.clone(), false, 0));
        }
        stats.users_count = bump(stats.users_count)?;
        stats.activities_count = bump(stats.activities_count)?;
        let user = User {
            chain_count: stats.users_count,
            payables_count: 0,
            payments_count: 0,
            withdrawals_count: 0,
            activities_count: 1,
        };
        Ok((user, true, stats.activities_count))
    }

    /// Commit-phase: record the initialization activity of a new user.
    pub(crate) fn commit_new_user_activity(
        &self,
        chain: ChainId,
        wallet: Address,
        activity_chain_count: u64,
        timestamp: u64,
    ) {
        self.append_activity(
            chain,
            activity_chain_count,
            Some((wallet, 1)),
            None,
            EntityId(wallet.0),
            ActivityType::InitializedUser,
            timestamp,
        );
        tracing::info!(wallet = %wallet, "User initialized");
    }

    /// Commit-phase: append one activity record and index it under the
    /// chain-wide, per-user, and per-payable orderings.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn append_activity(
        &self,
        chain: ChainId,
        chain_count: u64,
        user: Option<(Address, u64)>,
        payable: Option<(EntityId, u64)>,
        entity: EntityId,
        activity_type: ActivityType,
        timestamp: u64,
    ) -> EntityId {
        let id = derive_id(EntityKind::Activity, chain, chain_count);
        let record = ActivityRecord {
            chain_count,
            user_count: user.map(|(_, c)| c).unwrap_or(0),
            payable_count: payable.map(|(_, c)| c).unwrap_or(0),
            timestamp,
            entity,
            activity_type,
        };
        self.activities.insert(id, record);
        self.chain_activity_ids
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(id);
        if let Some((wallet, _)) = user {
            self.user_activity_ids.entry(wallet).or_default().push(id);
        }
        if let Some((payable_id, _)) = payable {
            self.payable_activity_ids
                .entry(payable_id)
                .or_default()
                .push(id);
        }
        id
    }
}

fn nth_id(ids: &[EntityId], n: u64) -> Result<EntityId, LedgerError> {
    if n == 0 || n > ids.len() as u64 {
        return Err(LedgerError::InvalidPageNumber(n));
    }
    Ok(ids[(n - 1) as usize])
}

fn paginate(ids: &[EntityId], page: u64, per_page: u64) -> Result<Vec<EntityId>, LedgerError> {
    if page == 0 || per_page == 0 {
        return Err(LedgerError::InvalidPageNumber(page));
    }
    let start = (page - 1)
        .checked_mul(per_page)
        .ok_or(LedgerError::InvalidPageNumber(page))? as usize;
    if start >= ids.len() {
        return Err(LedgerError::InvalidPageNumber(page));
    }
    let end = (start + per_page as usize).min(ids.len());
    Ok(ids[start..end].to_vec())
}

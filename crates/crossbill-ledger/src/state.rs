use serde::{Deserialize, Serialize};
use std::fmt;

use crossbill_core::{Address, ChainId, EntityId, TokenAndAmount};

/// Monotone counters scoped to the local chain.
///
/// Each counter moves by exactly one per created entity of its kind and is
/// never decremented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStats {
    /// The chain these counters belong to.
    pub chain_id: ChainId,
    /// Users ever initialized on this chain.
    pub users_count: u64,
    /// Payables ever created on this chain.
    pub payables_count: u64,
    /// Payments ever made by users of this chain.
    pub user_payments_count: u64,
    /// Payments ever received by payables of this chain, from any chain.
    pub payable_payments_count: u64,
    /// Withdrawals ever made on this chain.
    pub withdrawals_count: u64,
    /// Activities ever recorded on this chain.
    pub activities_count: u64,
}

impl ChainStats {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            users_count: 0,
            payables_count: 0,
            user_payments_count: 0,
            payable_payments_count: 0,
            withdrawals_count: 0,
            activities_count: 0,
        }
    }
}

/// Per-wallet record, created lazily on first interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// This user's rank among all users of the chain. Immutable.
    pub chain_count: u64,
    /// Payables created by this user.
    pub payables_count: u64,
    /// Payments made by this user.
    pub payments_count: u64,
    /// Withdrawals made by this user.
    pub withdrawals_count: u64,
    /// Activities attributed to this user.
    pub activities_count: u64,
}

/// Per-token support flag, fee bound, and running totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenDetails {
    pub token: Address,
    /// Whether payments and withdrawals in this token are accepted.
    pub is_supported: bool,
    /// Upper bound on the fee taken from a single withdrawal.
    pub max_withdrawal_fees: u128,
    /// Total ever paid by users in this token.
    pub total_user_paid: u128,
    /// Total ever received by payables in this token.
    pub total_payable_received: u128,
    /// Total ever withdrawn in this token.
    pub total_withdrawn: u128,
    /// Total withdrawal fees ever collected in this token.
    pub total_withdrawal_fees_collected: u128,
}

impl TokenDetails {
    pub fn new(token: Address, is_supported: bool, max_withdrawal_fees: u128) -> Self {
        Self {
            token,
            is_supported,
            max_withdrawal_fees,
            total_user_paid: 0,
            total_payable_received: 0,
            total_withdrawn: 0,
            total_withdrawal_fees_collected: 0,
        }
    }
}

/// A host-owned invoice that can receive payments from any connected chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payable {
    /// Wallet that created and owns this payable. Immutable.
    pub host: Address,
    /// Rank among all payables of this chain. Immutable.
    pub chain_count: u64,
    /// Rank among the host's payables. Immutable.
    pub host_count: u64,
    /// Creation time, Unix seconds.
    pub created_at: u64,
    /// Human-readable description shown to payers.
    pub description: String,
    /// Payments ever received, from any chain.
    pub payments_count: u64,
    /// Withdrawals ever made by the host.
    pub withdrawals_count: u64,
    /// Activities recorded against this payable.
    pub activities_count: u64,
    /// Allowed (token, max amount) constraints; empty means unconstrained.
    pub allowed_tokens_and_amounts: Vec<TokenAndAmount>,
    /// Cached per-token balances: one entry per token ever received.
    pub balances: Vec<TokenAndAmount>,
    /// Whether any token/amount is accepted.
    pub allows_free_payments: bool,
    /// Closed payables reject new payments; withdrawals remain possible.
    pub is_closed: bool,
}

impl Payable {
    /// Current balance in the given token, zero if never received.
    pub fn balance_of(&self, token: &Address) -> u128 {
        self.balances
            .iter()
            .find(|b| b.token == *token)
            .map(|b| b.amount)
            .unwrap_or(0)
    }
}

/// Receipt of a payment to a payable, arriving from any chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayablePayment {
    pub payable_id: EntityId,
    /// Chain-normalized address of the payer.
    pub payer: Address,
    /// Chain the payment originated from.
    pub payer_chain_id: ChainId,
    /// Sequence of this payment among payments from that chain to this
    /// payable.
    pub local_chain_count: u64,
    /// The payable's own payment sequence at receipt time.
    pub payable_count: u64,
    /// Receipt time, Unix seconds.
    pub timestamp: u64,
    pub details: TokenAndAmount,
}

/// Mirror receipt recorded on the payer's own chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayment {
    pub payable_id: EntityId,
    pub payer: Address,
    /// Chain the target payable lives on.
    pub payable_chain_id: ChainId,
    /// The chain-wide user-payment sequence at payment time.
    pub chain_count: u64,
    /// The payer's own payment sequence at payment time.
    pub payer_count: u64,
    /// The payable's payment sequence at payment time.
    pub payable_count: u64,
    pub timestamp: u64,
    pub details: TokenAndAmount,
}

/// Receipt of a host withdrawal from a payable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub payable_id: EntityId,
    pub host: Address,
    /// The chain-wide withdrawal sequence at withdrawal time.
    pub chain_count: u64,
    /// The host's withdrawal sequence at withdrawal time; zero when the
    /// host has no local user record.
    pub host_count: u64,
    /// The payable's withdrawal sequence at withdrawal time.
    pub payable_count: u64,
    pub timestamp: u64,
    pub details: TokenAndAmount,
}

/// The kind of ledger-affecting action an activity records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityType {
    InitializedUser,
    CreatedPayable,
    UserPaid,
    PayableReceived,
    Withdrew,
    ClosedPayable,
    ReopenedPayable,
    UpdatedPayableAllowedTokensAndAmounts,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializedUser => write!(f, "InitializedUser"),
            Self::CreatedPayable => write!(f, "CreatedPayable"),
            Self::UserPaid => write!(f, "UserPaid"),
            Self::PayableReceived => write!(f, "PayableReceived"),
            Self::Withdrew => write!(f, "Withdrew"),
            Self::ClosedPayable => write!(f, "ClosedPayable"),
            Self::ReopenedPayable => write!(f, "ReopenedPayable"),
            Self::UpdatedPayableAllowedTokensAndAmounts => {
                write!(f, "UpdatedPayableAllowedTokensAndAmounts")
            }
        }
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Chain-wide activity sequence at the time of the event.
    pub chain_count: u64,
    /// Acting user's activity sequence; zero when no local user acted.
    pub user_count: u64,
    /// Affected payable's activity sequence; zero when no payable involved.
    pub payable_count: u64,
    pub timestamp: u64,
    /// The entity this activity concerns (payable, payment, withdrawal, or
    /// the acting wallet for user initialization).
    pub entity: EntityId,
    pub activity_type: ActivityType,
}

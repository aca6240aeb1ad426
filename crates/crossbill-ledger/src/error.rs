use crossbill_core::{ActionKind, Address, CoreError, EntityId};

/// Ledger-layer errors.
///
/// Every variant is raised before any state mutation: an error return means
/// counters and balances are exactly as they were before the call.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid payable id: {0}")]
    InvalidPayableId(EntityId),

    #[error("invalid payment id: {0}")]
    InvalidPaymentId(EntityId),

    #[error("invalid withdrawal id: {0}")]
    InvalidWithdrawalId(EntityId),

    #[error("invalid page number: {0}")]
    InvalidPageNumber(u64),

    #[error("payable {0} is closed")]
    ClosedPayable(EntityId),

    #[error("payable {0} is not closed")]
    PayableNotClosed(EntityId),

    #[error("unsupported token: {0}")]
    UnsupportedToken(Address),

    #[error("amount {amount} exceeds the allowance for token {token}")]
    AmountExceedsAllowance { token: Address, amount: u128 },

    #[error("{caller} is not the host of payable {payable_id}")]
    NotPayableHost {
        payable_id: EntityId,
        caller: Address,
    },

    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: u128, required: u128 },

    #[error("duplicate event: {0} was already applied")]
    DuplicateEvent(EntityId),

    #[error("counter overflow")]
    CounterOverflow,

    #[error("zero amount specified")]
    ZeroAmount,

    #[error("invalid payable configuration: {0}")]
    InvalidPayableConfig(String),

    #[error("unexpected action {0:?} for this operation")]
    UnexpectedAction(ActionKind),

    #[error(transparent)]
    Core(#[from] CoreError),
}

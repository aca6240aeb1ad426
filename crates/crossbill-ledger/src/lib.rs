//! Crossbill Ledger
//!
//! The per-chain state of the invoicing network: payables, payments,
//! withdrawals, users, token totals, and the activity feed, held in
//! concurrent in-memory maps with deterministic ids and gapless counters.
//!
//! Local operations ([`Ledger::create_payable`], [`Ledger::pay`],
//! [`Ledger::withdraw`], the payable lifecycle) mutate state directly.
//! Events that happened on other chains arrive as attested messages and
//! flow through the [`Reconciler`], which applies each exactly once
//! regardless of delivery order or redelivery.

pub mod error;
pub mod hooks;
pub mod payable;
pub mod payment;
pub mod reconciler;
pub mod state;
pub mod store;
pub mod withdraw;

pub use error::LedgerError;
pub use hooks::NotificationHook;
pub use payable::{MAX_DESCRIPTION_LEN, MAX_PAYABLE_TOKENS};
pub use reconciler::{AppliedEvent, AttestedEvent, Reconciler};
pub use state::{
    ActivityRecord, ActivityType, ChainStats, Payable, PayablePayment, TokenDetails, User,
    UserPayment, Withdrawal,
};
pub use store::Ledger;

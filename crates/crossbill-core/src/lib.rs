//! Crossbill core types
//!
//! Shared value types of the cross-chain invoicing ledger, the canonical
//! byte codec for cross-chain payment instructions, and deterministic
//! entity-id derivation.

pub mod config;
pub mod entity_id;
pub mod error;
pub mod payload;
pub mod types;

pub use config::{LedgerConfig, FEE_PERCENT_SCALE};
pub use entity_id::{derive_id, EntityKind};
pub use error::CoreError;
pub use payload::{ActionKind, InstructionPayload};
pub use types::{Address, ChainId, EntityId, TokenAndAmount};

//! Shared helpers for the crossbill integration tests.

use std::sync::{Arc, Once};

use crossbill_core::{ActionKind, Address, ChainId, EntityId, InstructionPayload, LedgerConfig};
use crossbill_ledger::{AttestedEvent, Ledger};

static INIT_TRACING: Once = Once::new();

/// Install a compact test subscriber once per process. Respects
/// `RUST_LOG` for filtering.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn host() -> Address {
    Address::from_evm([0xaa; 20])
}

pub fn payer() -> Address {
    Address::from_evm([0xab; 20])
}

pub fn usdc() -> Address {
    Address::from_evm([0xbb; 20])
}

pub fn fee_collector() -> Address {
    Address::from_evm([0xfe; 20])
}

/// A Solana-resident ledger with a 2.00% withdrawal fee and USDC
/// supported with an uncapped per-token fee.
pub fn test_ledger() -> Arc<Ledger> {
    init_tracing();
    let config = LedgerConfig::new(ChainId::Solana, 1, 200, fee_collector(), Address::ZERO)
        .unwrap_or_else(|e| panic!("test config invalid: {e}"));
    let ledger = Ledger::new(config).unwrap_or_else(|e| panic!("ledger init failed: {e}"));
    ledger.set_token_support(usdc(), true, u128::MAX);
    Arc::new(ledger)
}

/// An attested Pay instruction as it would arrive from another chain.
pub fn attested_payment(
    origin_chain: ChainId,
    sequence: u64,
    payer: Address,
    payable_id: EntityId,
    token: Address,
    amount: u128,
) -> AttestedEvent {
    let instruction = InstructionPayload {
        action: ActionKind::Pay,
        caller: payer,
        payable_id,
        token,
        amount,
        allows_free_payments: false,
        allowed_tokens_and_amounts: Vec::new(),
        description: String::new(),
    };
    AttestedEvent {
        origin_chain,
        sequence,
        payload: instruction
            .encode()
            .unwrap_or_else(|e| panic!("payload encoding failed: {e}")),
    }
}

/// An attested Withdraw instruction as it would arrive from another chain.
pub fn attested_withdrawal(
    origin_chain: ChainId,
    sequence: u64,
    caller: Address,
    payable_id: EntityId,
    token: Address,
    amount: u128,
) -> AttestedEvent {
    let instruction = InstructionPayload {
        action: ActionKind::Withdraw,
        caller,
        payable_id,
        token,
        amount,
        allows_free_payments: false,
        allowed_tokens_and_amounts: Vec::new(),
        description: String::new(),
    };
    AttestedEvent {
        origin_chain,
        sequence,
        payload: instruction
            .encode()
            .unwrap_or_else(|e| panic!("payload encoding failed: {e}")),
    }
}

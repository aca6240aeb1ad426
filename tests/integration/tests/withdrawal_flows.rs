//! Integration test: withdrawal flows, local and cross-chain.

use crossbill_core::{Address, ChainId, LedgerConfig, TokenAndAmount};
use crossbill_integration_tests::{
    attested_payment, attested_withdrawal, fee_collector, host, init_tracing, payer, test_ledger,
    usdc,
};
use crossbill_ledger::{Ledger, LedgerError, Reconciler};
use std::sync::Arc;

// =========================================================================
// Fee application
// =========================================================================

#[tokio::test]
async fn test_fee_capped_by_token_maximum() {
    init_tracing();
    // 2.00% fee but USDC's fee is capped at 300 per withdrawal.
    let config = LedgerConfig::new(ChainId::Solana, 1, 200, fee_collector(), Address::ZERO)
        .unwrap();
    let ledger = Arc::new(Ledger::new(config).unwrap());
    ledger.set_token_support(usdc(), true, 300);

    let payable_id = ledger
        .create_payable(host(), "invoice", Vec::new(), true)
        .unwrap();
    ledger.pay(payer(), payable_id, usdc(), 100_000).unwrap();

    // 2% of 40_000 is 800, capped to 300.
    ledger.withdraw(host(), payable_id, usdc(), 40_000).unwrap();
    let details = ledger.get_token_details(usdc()).unwrap();
    assert_eq!(details.total_withdrawal_fees_collected, 300);
    assert_eq!(details.total_withdrawn, 40_000);
}

#[tokio::test]
async fn test_repeated_withdrawals_drain_the_balance() {
    let ledger = test_ledger();
    let payable_id = ledger
        .create_payable(host(), "invoice", Vec::new(), true)
        .unwrap();
    ledger.pay(payer(), payable_id, usdc(), 10_000).unwrap();

    for _ in 0..4 {
        ledger.withdraw(host(), payable_id, usdc(), 2_500).unwrap();
    }
    assert_eq!(
        ledger.balances(payable_id).unwrap(),
        vec![TokenAndAmount::new(usdc(), 0)]
    );
    assert!(matches!(
        ledger.withdraw(host(), payable_id, usdc(), 1),
        Err(LedgerError::InsufficientBalance { available: 0, .. })
    ));

    let payable = ledger.get_payable(payable_id).unwrap();
    assert_eq!(payable.withdrawals_count, 4);
    assert_eq!(ledger.chain_stats().withdrawals_count, 4);
    assert_eq!(ledger.get_user(host()).unwrap().withdrawals_count, 4);
}

// =========================================================================
// Cross-chain withdrawal of cross-chain funds
// =========================================================================

#[tokio::test]
async fn test_host_withdraws_from_another_chain() {
    let ledger = test_ledger();
    let payable_id = ledger
        .create_payable(host(), "invoice", Vec::new(), true)
        .unwrap();
    let reconciler = Reconciler::new(ledger.clone());

    reconciler
        .apply(&attested_payment(
            ChainId::Ethereum,
            1,
            payer(),
            payable_id,
            usdc(),
            50_000,
        ))
        .await
        .unwrap();

    // The host triggers the withdrawal from Ethereum; it settles here.
    reconciler
        .apply(&attested_withdrawal(
            ChainId::Ethereum,
            2,
            host(),
            payable_id,
            usdc(),
            20_000,
        ))
        .await
        .unwrap();

    assert_eq!(
        ledger.balances(payable_id).unwrap(),
        vec![TokenAndAmount::new(usdc(), 30_000)]
    );
    let details = ledger.get_token_details(usdc()).unwrap();
    assert_eq!(details.total_withdrawn, 20_000);
    assert_eq!(details.total_withdrawal_fees_collected, 400);

    // The host created the payable locally, so their user counters track
    // the foreign withdrawal too.
    assert_eq!(ledger.get_user(host()).unwrap().withdrawals_count, 1);
}

#[tokio::test]
async fn test_foreign_withdrawal_rejects_non_host() {
    let ledger = test_ledger();
    let payable_id = ledger
        .create_payable(host(), "invoice", Vec::new(), true)
        .unwrap();
    ledger.pay(payer(), payable_id, usdc(), 5_000).unwrap();
    let reconciler = Reconciler::new(ledger.clone());

    let event = attested_withdrawal(ChainId::Ethereum, 1, payer(), payable_id, usdc(), 1_000);
    assert!(matches!(
        reconciler.apply(&event).await,
        Err(LedgerError::NotPayableHost { .. })
    ));
    assert_eq!(ledger.balances(payable_id).unwrap()[0].amount, 5_000);
}

#[tokio::test]
async fn test_foreign_withdrawal_cannot_overdraw() {
    let ledger = test_ledger();
    let payable_id = ledger
        .create_payable(host(), "invoice", Vec::new(), true)
        .unwrap();
    ledger.pay(payer(), payable_id, usdc(), 5_000).unwrap();
    let reconciler = Reconciler::new(ledger.clone());

    let event = attested_withdrawal(ChainId::Ethereum, 1, host(), payable_id, usdc(), 5_001);
    assert!(matches!(
        reconciler.apply(&event).await,
        Err(LedgerError::InsufficientBalance {
            available: 5_000,
            required: 5_001,
        })
    ));
}

// =========================================================================
// Mixed local and cross-chain funding settles as one pot
// =========================================================================

#[tokio::test]
async fn test_balances_merge_across_origins() {
    let ledger = test_ledger();
    let payable_id = ledger
        .create_payable(host(), "invoice", Vec::new(), true)
        .unwrap();
    let reconciler = Reconciler::new(ledger.clone());

    ledger.pay(payer(), payable_id, usdc(), 1_000).unwrap();
    reconciler
        .apply(&attested_payment(
            ChainId::Base,
            1,
            payer(),
            payable_id,
            usdc(),
            2_000,
        ))
        .await
        .unwrap();

    // One pot per token, regardless of which chain funded it.
    assert_eq!(
        ledger.balances(payable_id).unwrap(),
        vec![TokenAndAmount::new(usdc(), 3_000)]
    );
    ledger.withdraw(host(), payable_id, usdc(), 3_000).unwrap();
    assert_eq!(ledger.balances(payable_id).unwrap()[0].amount, 0);
}

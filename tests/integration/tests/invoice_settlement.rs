//! Integration test: full invoice lifecycle across chains.
//!
//! A host on the local chain creates a payable, a payer on another chain
//! pays it through the reconciler, and the host withdraws net of fees.

use crossbill_core::{ChainId, TokenAndAmount};
use crossbill_integration_tests::{
    attested_payment, host, payer, test_ledger, usdc,
};
use crossbill_ledger::{ActivityType, AppliedEvent, LedgerError, Reconciler};

// =========================================================================
// Happy path: create → pay from another chain → withdraw
// =========================================================================

#[tokio::test]
async fn test_invoice_paid_cross_chain_and_settled() {
    let ledger = test_ledger();
    let payable_id = ledger
        .create_payable(host(), "Consulting retainer, August", Vec::new(), true)
        .unwrap();

    let reconciler = Reconciler::new(ledger.clone());
    let event = attested_payment(ChainId::Ethereum, 1, payer(), payable_id, usdc(), 100_000);
    let applied = reconciler.apply(&event).await.unwrap();
    assert!(matches!(applied, AppliedEvent::Payment(_)));

    let payable = ledger.get_payable(payable_id).unwrap();
    assert_eq!(payable.payments_count, 1);
    assert_eq!(
        payable.balances,
        vec![TokenAndAmount::new(usdc(), 100_000)]
    );
    assert_eq!(
        ledger
            .payable_chain_payment_count(payable_id, ChainId::Ethereum)
            .unwrap(),
        1
    );

    // Host withdraws 40k at the 2.00% fee: 800 to the collector, 39_200
    // paid out, and the payable keeps the remaining 60k.
    let (_, withdrawal) = ledger.withdraw(host(), payable_id, usdc(), 40_000).unwrap();
    assert_eq!(withdrawal.details.amount, 40_000);
    assert_eq!(
        ledger.balances(payable_id).unwrap(),
        vec![TokenAndAmount::new(usdc(), 60_000)]
    );
    let details = ledger.get_token_details(usdc()).unwrap();
    assert_eq!(details.total_payable_received, 100_000);
    assert_eq!(details.total_withdrawn, 40_000);
    assert_eq!(details.total_withdrawal_fees_collected, 800);

    let stats = ledger.chain_stats();
    assert_eq!(stats.payables_count, 1);
    assert_eq!(stats.payable_payments_count, 1);
    assert_eq!(stats.withdrawals_count, 1);
    // No local payment was made.
    assert_eq!(stats.user_payments_count, 0);
}

#[tokio::test]
async fn test_redelivered_event_changes_nothing() {
    let ledger = test_ledger();
    let payable_id = ledger
        .create_payable(host(), "invoice", Vec::new(), true)
        .unwrap();
    let reconciler = Reconciler::new(ledger.clone());

    let event = attested_payment(ChainId::Ethereum, 1, payer(), payable_id, usdc(), 100_000);
    let first = reconciler.apply(&event).await.unwrap();
    let AppliedEvent::Payment(payment_id) = first else {
        panic!("expected a payment");
    };

    let replay = reconciler.apply(&event).await;
    assert!(matches!(replay, Err(LedgerError::DuplicateEvent(id)) if id == payment_id));

    let payable = ledger.get_payable(payable_id).unwrap();
    assert_eq!(payable.payments_count, 1);
    assert_eq!(payable.balances[0].amount, 100_000);
    assert_eq!(ledger.chain_stats().payable_payments_count, 1);
}

// =========================================================================
// Activity feed choreography
// =========================================================================

#[tokio::test]
async fn test_activity_feeds_across_the_lifecycle() {
    let ledger = test_ledger();
    let payable_id = ledger
        .create_payable(host(), "invoice", Vec::new(), true)
        .unwrap();
    let reconciler = Reconciler::new(ledger.clone());
    reconciler
        .apply(&attested_payment(
            ChainId::Base,
            1,
            payer(),
            payable_id,
            usdc(),
            5_000,
        ))
        .await
        .unwrap();
    ledger.withdraw(host(), payable_id, usdc(), 1_000).unwrap();
    ledger.close_payable(payable_id, host()).unwrap();

    let chain_feed = ledger.chain_activities(1, 10).unwrap();
    let kinds: Vec<_> = chain_feed.iter().map(|a| a.activity_type).collect();
    assert_eq!(
        kinds,
        vec![
            ActivityType::InitializedUser,
            ActivityType::CreatedPayable,
            ActivityType::PayableReceived,
            ActivityType::Withdrew,
            ActivityType::ClosedPayable,
        ]
    );
    // Chain-wide sequence is gapless and ordered.
    let counts: Vec<_> = chain_feed.iter().map(|a| a.chain_count).collect();
    assert_eq!(counts, vec![1, 2, 3, 4, 5]);

    // The cross-chain payment is attributed to the payable but to no
    // local user.
    let payable_feed = ledger.payable_activities(payable_id, 1, 10).unwrap();
    assert_eq!(payable_feed.len(), 4);
    let received = &chain_feed[2];
    assert_eq!(received.user_count, 0);
    assert_eq!(received.payable_count, 2);

    // Paging is 1-based; past-end pages fail.
    let page = ledger.chain_activities(2, 3).unwrap();
    assert_eq!(page.len(), 2);
    assert!(matches!(
        ledger.chain_activities(3, 3),
        Err(LedgerError::InvalidPageNumber(3))
    ));
}

// =========================================================================
// Receipt snapshots survive serialization
// =========================================================================

#[tokio::test]
async fn test_payment_receipt_serializes() {
    let ledger = test_ledger();
    let payable_id = ledger
        .create_payable(host(), "invoice", Vec::new(), true)
        .unwrap();
    let reconciler = Reconciler::new(ledger.clone());
    let applied = reconciler
        .apply(&attested_payment(
            ChainId::Arbitrum,
            42,
            payer(),
            payable_id,
            usdc(),
            777,
        ))
        .await
        .unwrap();
    let AppliedEvent::Payment(payment_id) = applied else {
        panic!("expected a payment");
    };

    let receipt = ledger.get_payable_payment(payment_id).unwrap();
    let json = serde_json::to_value(&receipt).unwrap();
    assert_eq!(json["payer_chain_id"], serde_json::json!("Arbitrum"));
    assert_eq!(json["local_chain_count"], serde_json::json!(1));
}

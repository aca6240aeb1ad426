use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Address, ChainId};

/// Denominator of the fixed-point withdrawal fee: two decimal digits of a
/// percentage, so 200 means 2.00% and 10_000 means 100.00%.
pub const FEE_PERCENT_SCALE: u128 = 10_000;

/// Configuration of one ledger instance.
///
/// Read by every operation; mutated only through a governance action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// The chain this ledger instance runs on.
    pub chain_id: ChainId,
    /// Confirmations required before the attestation layer trusts a message.
    /// Enforced by the external relay; recorded here as chain policy.
    pub confirmation_depth: u8,
    /// Withdrawal fee in hundredths of a percent (200 = 2.00%).
    pub withdrawal_fee_percent: u16,
    /// Address credited with withdrawal fees.
    pub fee_collector: Address,
    /// Address of the local attestation-verifying contract.
    pub attestation_contract: Address,
}

impl LedgerConfig {
    pub fn new(
        chain_id: ChainId,
        confirmation_depth: u8,
        withdrawal_fee_percent: u16,
        fee_collector: Address,
        attestation_contract: Address,
    ) -> Result<Self, CoreError> {
        let config = Self {
            chain_id,
            confirmation_depth,
            withdrawal_fee_percent,
            fee_collector,
            attestation_contract,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.withdrawal_fee_percent as u128 > FEE_PERCENT_SCALE {
            return Err(CoreError::ValidationError(
                "withdrawal fee cannot exceed 100%".into(),
            ));
        }
        if self.fee_collector.is_zero() {
            return Err(CoreError::ValidationError(
                "fee collector cannot be the zero address".into(),
            ));
        }
        Ok(())
    }
}

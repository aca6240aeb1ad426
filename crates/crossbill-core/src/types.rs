use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Identifier of a connected chain network.
///
/// The discriminant doubles as the on-wire `u16` chain id, so the values
/// here must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ChainId {
    Solana = 1,
    Ethereum = 2,
    Bsc = 4,
    Polygon = 5,
    Avalanche = 6,
    Arbitrum = 23,
    Base = 30,
}

impl ChainId {
    /// The on-wire representation.
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Parse from the on-wire representation.
    pub fn from_u16(value: u16) -> Result<Self, CoreError> {
        match value {
            1 => Ok(Self::Solana),
            2 => Ok(Self::Ethereum),
            4 => Ok(Self::Bsc),
            5 => Ok(Self::Polygon),
            6 => Ok(Self::Avalanche),
            23 => Ok(Self::Arbitrum),
            30 => Ok(Self::Base),
            other => Err(CoreError::InvalidChainId(other)),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solana => write!(f, "solana"),
            Self::Ethereum => write!(f, "ethereum"),
            Self::Bsc => write!(f, "bsc"),
            Self::Polygon => write!(f, "polygon"),
            Self::Avalanche => write!(f, "avalanche"),
            Self::Arbitrum => write!(f, "arbitrum"),
            Self::Base => write!(f, "base"),
        }
    }
}

/// Canonical normalized address: 32 bytes regardless of the origin chain's
/// native address width.
///
/// Wallet and token identifiers are both addresses in this sense. Native
/// representations are converted at the system boundary only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const ZERO: Self = Self([0u8; 32]);

    /// Normalize a 20-byte EVM address by left-padding with zeros.
    pub fn from_evm(native: [u8; 20]) -> Self {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(&native);
        Self(bytes)
    }

    /// Wrap an already 32-byte-wide native address (Solana, CosmWasm).
    pub fn from_bytes32(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Recover the 20-byte EVM form, if the upper 12 bytes are zero padding.
    pub fn to_evm(&self) -> Option<[u8; 20]> {
        if self.0[..12].iter().all(|&b| b == 0) {
            let mut native = [0u8; 20];
            native.copy_from_slice(&self.0[12..]);
            Some(native)
        } else {
            None
        }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// A 32-byte entity identifier, derived deterministically at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub [u8; 32]);

impl EntityId {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Parse from a hex string (with or without a `0x` prefix).
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)
            .map_err(|e| CoreError::ValidationError(format!("invalid entity id hex: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::ValidationError("entity id must be 32 bytes".into()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// A (token, amount) pair — the unit of value everywhere in the ledger.
///
/// Amounts are in the token's smallest native unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAndAmount {
    pub token: Address,
    pub amount: u128,
}

impl TokenAndAmount {
    pub fn new(token: Address, amount: u128) -> Self {
        Self { token, amount }
    }
}

impl fmt::Display for TokenAndAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.amount, self.token)
    }
}

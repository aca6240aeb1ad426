use bytes::{Buf, BufMut};

use crate::error::CoreError;
use crate::types::{Address, EntityId, TokenAndAmount};

/// Discriminant of a cross-chain instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActionKind {
    CreatePayable = 1,
    Pay = 2,
    Withdraw = 3,
    ClosePayable = 4,
    ReopenPayable = 5,
    UpdatePayableTokens = 6,
}

impl ActionKind {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn from_u8(value: u8) -> Result<Self, CoreError> {
        match value {
            1 => Ok(Self::CreatePayable),
            2 => Ok(Self::Pay),
            3 => Ok(Self::Withdraw),
            4 => Ok(Self::ClosePayable),
            5 => Ok(Self::ReopenPayable),
            6 => Ok(Self::UpdatePayableTokens),
            other => Err(CoreError::MalformedPayload(format!(
                "unknown action id: {other}"
            ))),
        }
    }
}

/// A cross-chain instruction payload in its decoded form.
///
/// One flat record carries the fields of every instruction kind; fields not
/// meaningful for a given action are zero/empty on the wire. The canonical
/// byte layout is fixed by the cross-chain contract: all integers big-endian
/// and fixed-width, variable-length fields length-prefixed, addresses
/// normalized to 32 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionPayload {
    /// Which instruction this is.
    pub action: ActionKind,
    /// Normalized address of the initiating account.
    pub caller: Address,
    /// Target payable.
    pub payable_id: EntityId,
    /// Token being moved (payments and withdrawals).
    pub token: Address,
    /// Amount being moved, in the token's smallest unit.
    pub amount: u128,
    /// Whether the payable accepts any token/amount (payable creation).
    pub allows_free_payments: bool,
    /// Allowed (token, max amount) constraints (creation and updates).
    pub allowed_tokens_and_amounts: Vec<TokenAndAmount>,
    /// Human-readable payable description (creation), UTF-8.
    pub description: String,
}

impl InstructionPayload {
    /// Encode into the canonical byte layout.
    pub fn encode(&self) -> Result<Vec<u8>, CoreError> {
        if self.allowed_tokens_and_amounts.len() > u8::MAX as usize {
            return Err(CoreError::ValidationError(
                "at most 255 token constraints can be encoded".into(),
            ));
        }
        if self.description.len() > u16::MAX as usize {
            return Err(CoreError::ValidationError(
                "description exceeds the u16 length prefix".into(),
            ));
        }

        let mut buf = Vec::with_capacity(
            1 + 32 + 32 + 32 + 32 + 1 + 1
                + self.allowed_tokens_and_amounts.len() * 64
                + 2
                + self.description.len(),
        );
        buf.put_u8(self.action.as_u8());
        buf.put_slice(self.caller.as_bytes());
        buf.put_slice(self.payable_id.as_bytes());
        buf.put_slice(self.token.as_bytes());
        put_amount(&mut buf, self.amount);
        buf.put_u8(self.allows_free_payments as u8);
        buf.put_u8(self.allowed_tokens_and_amounts.len() as u8);
        for taa in &self.allowed_tokens_and_amounts {
            buf.put_slice(taa.token.as_bytes());
            put_amount(&mut buf, taa.amount);
        }
        buf.put_u16(self.description.len() as u16);
        buf.put_slice(self.description.as_bytes());
        Ok(buf)
    }

    /// Decode from the canonical byte layout.
    ///
    /// A single forward pass: every read is bounds-checked up front, and any
    /// bytes left over after the declared fields make the buffer malformed.
    pub fn decode(bytes: &[u8]) -> Result<Self, CoreError> {
        let mut buf = bytes;

        let action = ActionKind::from_u8(take_u8(&mut buf, "actionId")?)?;
        let caller = Address(take_array32(&mut buf, "caller")?);
        let payable_id = EntityId(take_array32(&mut buf, "payableId")?);
        let token = Address(take_array32(&mut buf, "token")?);
        let amount = take_amount(&mut buf, "amount")?;

        let allows_free_payments = match take_u8(&mut buf, "allowsFreePayments")? {
            0 => false,
            1 => true,
            other => {
                return Err(CoreError::MalformedPayload(format!(
                    "allowsFreePayments must be 0 or 1, got {other}"
                )))
            }
        };

        let taa_len = take_u8(&mut buf, "tokensAndAmounts length")? as usize;
        let mut allowed_tokens_and_amounts = Vec::with_capacity(taa_len);
        for _ in 0..taa_len {
            let token = Address(take_array32(&mut buf, "tokensAndAmounts token")?);
            let amount = take_amount(&mut buf, "tokensAndAmounts amount")?;
            allowed_tokens_and_amounts.push(TokenAndAmount { token, amount });
        }

        let desc_len = take_u16(&mut buf, "description length")? as usize;
        if buf.remaining() < desc_len {
            return Err(CoreError::MalformedPayload(format!(
                "description truncated: declared {desc_len} bytes, {} remain",
                buf.remaining()
            )));
        }
        let mut desc_bytes = vec![0u8; desc_len];
        buf.copy_to_slice(&mut desc_bytes);
        let description = String::from_utf8(desc_bytes)
            .map_err(|_| CoreError::MalformedPayload("description is not valid UTF-8".into()))?;

        if buf.has_remaining() {
            return Err(CoreError::MalformedPayload(format!(
                "{} trailing unconsumed bytes",
                buf.remaining()
            )));
        }

        Ok(Self {
            action,
            caller,
            payable_id,
            token,
            amount,
            allows_free_payments,
            allowed_tokens_and_amounts,
            description,
        })
    }
}

/// Write an amount as a 32-byte big-endian integer (upper half zero).
fn put_amount(buf: &mut Vec<u8>, amount: u128) {
    buf.put_u128(0);
    buf.put_u128(amount);
}

fn take_u8(buf: &mut &[u8], field: &str) -> Result<u8, CoreError> {
    if buf.remaining() < 1 {
        return Err(truncated(field));
    }
    Ok(buf.get_u8())
}

fn take_u16(buf: &mut &[u8], field: &str) -> Result<u16, CoreError> {
    if buf.remaining() < 2 {
        return Err(truncated(field));
    }
    Ok(buf.get_u16())
}

fn take_array32(buf: &mut &[u8], field: &str) -> Result<[u8; 32], CoreError> {
    if buf.remaining() < 32 {
        return Err(truncated(field));
    }
    let mut out = [0u8; 32];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

/// Read a 32-byte big-endian amount. Values above `u128::MAX` cannot be
/// represented in the ledger and are rejected as malformed.
fn take_amount(buf: &mut &[u8], field: &str) -> Result<u128, CoreError> {
    if buf.remaining() < 32 {
        return Err(truncated(field));
    }
    let high = buf.get_u128();
    let low = buf.get_u128();
    if high != 0 {
        return Err(CoreError::MalformedPayload(format!(
            "{field} exceeds the supported amount range"
        )));
    }
    Ok(low)
}

fn truncated(field: &str) -> CoreError {
    CoreError::MalformedPayload(format!("buffer truncated at {field}"))
}

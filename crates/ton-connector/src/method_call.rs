//! Message bodies for state-changing contract calls.
//!
//! A body is `op:uint32 query_id:uint64` followed by the call parameters in
//! order. The opcode comes from the standard table, else from the caller,
//! else from CRC-32 of the method name.

use std::sync::Arc;

use crc::{CRC_32_ISO_HDLC, Crc};
use serde::Deserialize;
use tracing::{debug, warn};
use ton_cell::{Cell, CellBuilder, CellSlice, MsgAddress};
use ton_jetton::{
    OP_BURN, OP_BURN_NOTIFICATION, OP_EXCESSES, OP_GET_STATIC_DATA, OP_INTERNAL_TRANSFER,
    OP_NFT_TRANSFER, OP_OWNERSHIP_ASSIGNED, OP_REPORT_STATIC_DATA, OP_TRANSFER,
    OP_TRANSFER_NOTIFICATION,
};

use crate::amount::parse_ton;
use crate::error::ConnectorResult;
use crate::query_id::QueryIdSource;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Method names with a fixed, well-known opcode.
pub const STANDARD_OPCODES: &[(&str, u32)] = &[
    ("transfer", OP_TRANSFER),
    ("transfer_notification", OP_TRANSFER_NOTIFICATION),
    ("internal_transfer", OP_INTERNAL_TRANSFER),
    ("excesses", OP_EXCESSES),
    ("burn", OP_BURN),
    ("burn_notification", OP_BURN_NOTIFICATION),
    ("nft_transfer", OP_NFT_TRANSFER),
    ("ownership_assigned", OP_OWNERSHIP_ASSIGNED),
    ("get_static_data", OP_GET_STATIC_DATA),
    ("report_static_data", OP_REPORT_STATIC_DATA),
];

/// Where a resolved opcode came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeSource {
    Standard,
    Custom,
    /// CRC-32 of the method name. Not guaranteed to match the contract.
    Computed,
}

pub fn standard_opcode(method: &str) -> Option<u32> {
    STANDARD_OPCODES
        .iter()
        .find(|(name, _)| *name == method)
        .map(|(_, op)| *op)
}

/// CRC-32 (ISO-HDLC) of the method name.
pub fn computed_opcode(method: &str) -> u32 {
    CRC32.checksum(method.as_bytes())
}

pub fn resolve_opcode(method: &str, custom: Option<u32>) -> (u32, OpcodeSource) {
    if let Some(op) = standard_opcode(method) {
        if let Some(custom) = custom.filter(|&c| c != op) {
            debug!(method, custom, standard = op, "custom opcode ignored for standard method");
        }
        return (op, OpcodeSource::Standard);
    }
    if let Some(op) = custom {
        return (op, OpcodeSource::Custom);
    }
    let op = computed_opcode(method);
    warn!(method, opcode = format_args!("0x{op:08x}"), "no known opcode, using CRC-32 of method name");
    (op, OpcodeSource::Computed)
}

/// Untyped parameter as received from JSON callers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LegacyValue {
    Bool(bool),
    Unsigned(u64),
    Signed(i64),
    Text(String),
}

/// One parameter of a contract call, appended to the body in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodCallParam {
    Uint { value: u128, bits: usize },
    Int { value: i128, bits: usize },
    /// Nanotons, as VarUInteger 16.
    Coins(u128),
    Address(MsgAddress),
    Bool(bool),
    /// Stored as a reference.
    Cell(Arc<Cell>),
    /// Bits and references stored inline.
    Slice(Arc<Cell>),
    Legacy(LegacyValue),
}

impl MethodCallParam {
    /// Resolve a legacy value to the typed parameter it is encoded as.
    ///
    /// Booleans take one bit, integers 64 bits (signed when negative). Text
    /// is an address if it parses as one, coins if it is a non-negative
    /// decimal in TON, and raw UTF-8 bytes otherwise.
    pub fn classify(value: &LegacyValue) -> ConnectorResult<MethodCallParam> {
        Ok(match value {
            LegacyValue::Bool(b) => MethodCallParam::Bool(*b),
            LegacyValue::Unsigned(v) => MethodCallParam::Uint {
                value: *v as u128,
                bits: 64,
            },
            LegacyValue::Signed(v) if *v >= 0 => MethodCallParam::Uint {
                value: *v as u128,
                bits: 64,
            },
            LegacyValue::Signed(v) => MethodCallParam::Int {
                value: *v as i128,
                bits: 64,
            },
            LegacyValue::Text(text) => {
                if let Ok(address) = MsgAddress::from_string(text) {
                    MethodCallParam::Address(address)
                } else if is_plain_decimal(text) {
                    MethodCallParam::Coins(parse_ton(text)?)
                } else {
                    MethodCallParam::Legacy(LegacyValue::Text(text.clone()))
                }
            }
        })
    }

    fn store(&self, builder: &mut CellBuilder) -> ConnectorResult<()> {
        match self {
            MethodCallParam::Uint { value, bits } => {
                builder.store_uint_wide(*value, *bits)?;
            }
            MethodCallParam::Int { value, bits } => {
                builder.store_int_wide(*value, *bits)?;
            }
            MethodCallParam::Coins(amount) => {
                builder.store_coins(*amount)?;
            }
            MethodCallParam::Address(address) => {
                builder.store_address(address)?;
            }
            MethodCallParam::Bool(b) => {
                builder.store_bit(*b)?;
            }
            MethodCallParam::Cell(cell) => {
                builder.store_ref(cell.clone())?;
            }
            MethodCallParam::Slice(cell) => {
                builder.store_slice(&CellSlice::new(cell))?;
            }
            MethodCallParam::Legacy(value) => match Self::classify(value)? {
                MethodCallParam::Legacy(LegacyValue::Text(text)) => {
                    builder.store_bytes(text.as_bytes())?;
                }
                typed => typed.store(builder)?,
            },
        }
        Ok(())
    }
}

fn is_plain_decimal(text: &str) -> bool {
    let mut parts = text.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let frac = parts.next();
    !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && frac.is_none_or(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

/// Builds call bodies with fresh query ids.
#[derive(Debug, Clone)]
pub struct MethodCallEncoder {
    query_ids: Arc<QueryIdSource>,
}

impl MethodCallEncoder {
    pub fn new(query_ids: Arc<QueryIdSource>) -> Self {
        Self { query_ids }
    }

    pub fn build(
        &self,
        method: &str,
        params: &[MethodCallParam],
        custom_opcode: Option<u32>,
    ) -> ConnectorResult<Cell> {
        self.build_with_query_id(method, params, custom_opcode, self.query_ids.next_id())
    }

    pub fn build_with_query_id(
        &self,
        method: &str,
        params: &[MethodCallParam],
        custom_opcode: Option<u32>,
        query_id: u64,
    ) -> ConnectorResult<Cell> {
        let (op, _) = resolve_opcode(method, custom_opcode);
        let mut builder = CellBuilder::new();
        builder.store_u32(op)?;
        builder.store_u64(query_id)?;
        for param in params {
            param.store(&mut builder)?;
        }
        Ok(builder.build()?)
    }
}

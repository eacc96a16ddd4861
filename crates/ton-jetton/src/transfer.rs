//! Jetton wallet message bodies.

use std::sync::Arc;

use ton_cell::{Cell, CellBuilder, CellSlice, MsgAddress};

use crate::error::{JettonError, JettonResult};
use crate::opcodes::{OP_BURN, OP_TRANSFER};

/// Creates a transfer message body.
///
/// # Message Format
///
/// ```text
/// transfer#0f8a7ea5
///   query_id:uint64
///   amount:(VarUInteger 16)
///   destination:MsgAddress
///   response_destination:MsgAddress
///   custom_payload:(Maybe ^Cell)
///   forward_ton_amount:(VarUInteger 16)
///   forward_payload:(Either Cell ^Cell)
/// ```
///
/// Receiving wallets parse this layout field by field; nothing may be
/// reordered.
pub fn create_transfer_body(
    query_id: u64,
    amount: u128,
    destination: &MsgAddress,
    response_destination: &MsgAddress,
    forward_ton_amount: u128,
    forward_payload: Option<Arc<Cell>>,
) -> JettonResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u32(OP_TRANSFER)?;
    builder.store_u64(query_id)?;
    builder.store_coins(amount)?;
    builder.store_address(destination)?;
    builder.store_address(response_destination)?;
    builder.store_bit(false)?; // no custom payload
    builder.store_coins(forward_ton_amount)?;

    // forward_payload as ^Cell when present
    match forward_payload {
        Some(payload) => {
            builder.store_bit(true)?;
            builder.store_ref(payload)?;
        }
        None => {
            builder.store_bit(false)?;
        }
    }

    Ok(builder.build()?)
}

/// Creates a burn message body.
///
/// ```text
/// burn#595f07bc query_id:uint64 amount:(VarUInteger 16)
///   response_destination:MsgAddress custom_payload:(Maybe ^Cell)
/// ```
pub fn create_burn_body(
    query_id: u64,
    amount: u128,
    response_destination: &MsgAddress,
) -> JettonResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u32(OP_BURN)?;
    builder.store_u64(query_id)?;
    builder.store_coins(amount)?;
    builder.store_address(response_destination)?;
    builder.store_bit(false)?;
    Ok(builder.build()?)
}

/// Fields of a decoded transfer body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferBody {
    pub query_id: u64,
    pub amount: u128,
    pub destination: MsgAddress,
    pub response_destination: MsgAddress,
    pub custom_payload: Option<Arc<Cell>>,
    pub forward_ton_amount: u128,
    pub forward_payload: Option<Arc<Cell>>,
}

impl TransferBody {
    /// Decode a `transfer#0f8a7ea5` body.
    pub fn parse(cell: &Cell) -> JettonResult<Self> {
        let mut slice = CellSlice::new(cell);
        let op = slice.load_u32()?;
        if op != OP_TRANSFER {
            return Err(JettonError::UnexpectedOpcode {
                expected: OP_TRANSFER,
                actual: op,
            });
        }

        let query_id = slice.load_u64()?;
        let amount = slice.load_coins()?;
        let destination = slice.load_address()?;
        let response_destination = slice.load_address()?;
        let custom_payload = slice.load_maybe_ref()?.cloned();
        let forward_ton_amount = slice.load_coins()?;
        let forward_payload = if slice.load_bit()? {
            Some(slice.load_ref()?.clone())
        } else if slice.bits_left() > 0 || slice.refs_left() > 0 {
            Some(Arc::new(slice.to_cell()?))
        } else {
            None
        };

        Ok(Self {
            query_id,
            amount,
            destination,
            response_destination,
            custom_payload,
            forward_ton_amount,
            forward_payload,
        })
    }
}

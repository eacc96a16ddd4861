//! TEP-62 NFT items.

use std::sync::Arc;

use ton_cell::{Cell, CellBuilder, MsgAddress};
use ton_jetton::{JettonMetadata, MetadataDecoder, OP_NFT_TRANSFER};

use crate::client::GetMethodResult;
use crate::error::ConnectorResult;

/// Result of `get_nft_data`.
#[derive(Debug, Clone)]
pub struct NftInfo {
    pub address: MsgAddress,
    pub initialized: bool,
    pub index: u128,
    pub collection: MsgAddress,
    pub owner: MsgAddress,
    /// Individual item content. Off-chain items usually hold only a path
    /// relative to the collection's base URI.
    pub content: JettonMetadata,
    pub content_cell: Arc<Cell>,
}

impl NftInfo {
    /// Parse the `[init, index, collection, owner, content]` stack.
    pub fn from_stack(address: MsgAddress, result: &GetMethodResult) -> ConnectorResult<Self> {
        result.ensure_success("get_nft_data")?;
        let content_cell = result.cell(4)?.clone();
        Ok(Self {
            address,
            initialized: result.int(0)? != 0,
            index: result.uint(1)?,
            collection: result.address(2)?,
            owner: result.address(3)?,
            content: MetadataDecoder::parse(&content_cell),
            content_cell,
        })
    }
}

/// ```text
/// transfer#5fcc3d14 query_id:uint64 new_owner:MsgAddress
///   response_destination:MsgAddress custom_payload:(Maybe ^Cell)
///   forward_amount:(VarUInteger 16) forward_payload:(Either Cell ^Cell)
/// ```
pub fn create_nft_transfer_body(
    query_id: u64,
    new_owner: &MsgAddress,
    response_destination: &MsgAddress,
    forward_amount: u128,
    forward_payload: Option<Arc<Cell>>,
) -> ConnectorResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u32(OP_NFT_TRANSFER)?;
    builder.store_u64(query_id)?;
    builder.store_address(new_owner)?;
    builder.store_address(response_destination)?;
    builder.store_bit(false)?; // no custom payload
    builder.store_coins(forward_amount)?;
    builder.store_maybe_ref(forward_payload)?;
    Ok(builder.build()?)
}

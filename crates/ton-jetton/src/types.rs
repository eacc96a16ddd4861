//! Results of the TEP-74 get methods.

use std::sync::Arc;

use ton_cell::{Cell, MsgAddress};

use crate::metadata::{JettonMetadata, MetadataDecoder};

/// Data returned by `get_jetton_data` on a jetton master.
#[derive(Debug, Clone)]
pub struct JettonData {
    /// Total supply of tokens (in smallest units).
    pub total_supply: u128,
    /// Whether new tokens can be minted.
    pub mintable: bool,
    /// Address of the admin/owner of the Jetton.
    pub admin_address: MsgAddress,
    /// TEP-64 content cell.
    pub content: Arc<Cell>,
}

impl JettonData {
    /// Decode the content cell, with defaults for anything unreadable.
    pub fn metadata(&self) -> JettonMetadata {
        MetadataDecoder::parse(&self.content)
    }
}

/// Data returned by `get_wallet_data` on a jetton wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JettonWalletData {
    /// Balance of tokens in this wallet (in smallest units).
    pub balance: u128,
    pub owner: MsgAddress,
    pub jetton_master: MsgAddress,
}

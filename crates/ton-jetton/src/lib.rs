//! # ton-jetton
//!
//! TEP-74 Jetton (fungible token) message bodies and TEP-64 metadata for TON.
//!
//! ## Overview
//!
//! The Jetton standard defines two types of contracts:
//!
//! - **Jetton Master**: The main token contract that holds metadata and manages supply.
//!   There is one Jetton Master per token.
//!
//! - **Jetton Wallet**: Per-user wallet contracts that hold token balances.
//!   Transfers are internal messages from the owner to its jetton wallet
//!   carrying a `transfer` body.
//!
//! ## TEP-64 Token Data Standard
//!
//! - **On-chain (0x00)**: Dictionary with key-value pairs
//! - **Off-chain (0x01)**: URI pointing to JSON metadata
//!
//! ## Creating Transfer Messages
//!
//! ```rust
//! use ton_jetton::{create_transfer_body, TransferBody};
//! use ton_cell::MsgAddress;
//!
//! let destination = MsgAddress::Internal {
//!     workchain: 0,
//!     address: [0x12; 32],
//! };
//! let response_dest = MsgAddress::Internal {
//!     workchain: 0,
//!     address: [0x34; 32],
//! };
//!
//! let body = create_transfer_body(
//!     1,                 // query_id
//!     1_000_000_000,     // amount (1 token with 9 decimals)
//!     &destination,
//!     &response_dest,    // where excess TON goes
//!     1,                 // forward TON amount
//!     None,              // forward payload
//! ).unwrap();
//! assert_eq!(TransferBody::parse(&body).unwrap().amount, 1_000_000_000);
//! ```

pub mod error;
pub mod metadata;
pub mod opcodes;
pub mod transfer;
pub mod types;

pub use error::{JettonError, JettonResult};
pub use metadata::{
    attribute_key, build_offchain_content, build_onchain_content, JettonMetadata, MetadataDecoder,
    MetadataSource,
};
pub use opcodes::*;
pub use transfer::{create_burn_body, create_transfer_body, TransferBody};
pub use types::{JettonData, JettonWalletData};

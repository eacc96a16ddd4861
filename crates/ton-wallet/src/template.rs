//! Wallet contract templates.
//!
//! A template fixes the contract code and the layout of its persistent data
//! and signed transfer bodies. The address of a wallet follows from the
//! template, the workchain and the public key alone.

use std::sync::Arc;

use ton_cell::{Cell, MsgAddress};

use crate::error::WalletResult;
use crate::message::{self, Transfer};

/// Common interface of versioned wallet contracts.
pub trait WalletTemplate: Send + Sync {
    /// Version name, e.g. "v4r2".
    fn version(&self) -> &'static str;

    /// Contract code cell.
    fn code(&self) -> Arc<Cell>;

    /// Subwallet id used when none is configured.
    fn default_subwallet_id(&self, workchain: i32) -> u32;

    /// Most messages one signed body may carry.
    fn max_messages(&self) -> usize;

    /// Initial persistent data for a fresh wallet.
    fn initial_data(&self, public_key: &[u8; 32], subwallet_id: u32) -> WalletResult<Cell>;

    /// Unsigned transfer body for `seqno`.
    fn create_transfer_body(
        &self,
        subwallet_id: u32,
        seqno: u32,
        valid_until: u32,
        transfers: &[Transfer],
    ) -> WalletResult<Cell>;

    /// StateInit deploying this wallet.
    fn state_init(&self, public_key: &[u8; 32], subwallet_id: u32) -> WalletResult<Cell> {
        let data = self.initial_data(public_key, subwallet_id)?;
        Ok(message::state_init(self.code(), Arc::new(data))?)
    }

    /// Address the wallet has once deployed.
    fn derive_address(
        &self,
        workchain: i32,
        public_key: &[u8; 32],
        subwallet_id: u32,
    ) -> WalletResult<MsgAddress> {
        let state_init = self.state_init(public_key, subwallet_id)?;
        Ok(message::contract_address(workchain, &state_init))
    }
}

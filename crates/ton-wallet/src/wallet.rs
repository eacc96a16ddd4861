//! A wallet owned by this process: its keys, address and contract template.

use std::sync::Arc;

use ton_cell::{Cell, MsgAddress};
use ton_crypto::Ed25519Keypair;

use crate::error::WalletResult;
use crate::message::{self, Transfer};
use crate::template::WalletTemplate;

/// A deployed (or deployable) wallet contract and its signing key.
///
/// The sequence number is not cached here; it is read from the chain right
/// before each send.
pub struct Wallet {
    address: MsgAddress,
    keypair: Ed25519Keypair,
    workchain: i32,
    subwallet_id: u32,
    template: Arc<dyn WalletTemplate>,
}

impl Wallet {
    pub fn new(
        template: Arc<dyn WalletTemplate>,
        keypair: Ed25519Keypair,
        workchain: i32,
        subwallet_id: Option<u32>,
    ) -> WalletResult<Self> {
        let subwallet_id = subwallet_id.unwrap_or_else(|| template.default_subwallet_id(workchain));
        let address = template.derive_address(workchain, &keypair.public_key, subwallet_id)?;
        Ok(Self {
            address,
            keypair,
            workchain,
            subwallet_id,
            template,
        })
    }

    pub fn address(&self) -> &MsgAddress {
        &self.address
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.keypair.public_key
    }

    pub fn workchain(&self) -> i32 {
        self.workchain
    }

    pub fn subwallet_id(&self) -> u32 {
        self.subwallet_id
    }

    pub fn version(&self) -> &'static str {
        self.template.version()
    }

    pub fn max_messages(&self) -> usize {
        self.template.max_messages()
    }

    /// StateInit that deploys this wallet.
    pub fn state_init(&self) -> WalletResult<Cell> {
        self.template.state_init(&self.keypair.public_key, self.subwallet_id)
    }

    /// Build and sign the external message carrying `transfers`.
    ///
    /// With `seqno == 0` the wallet is assumed undeployed and its StateInit
    /// is attached so the first message deploys it.
    pub fn create_external_message(
        &self,
        seqno: u32,
        valid_until: u32,
        transfers: &[Transfer],
    ) -> WalletResult<Cell> {
        let body = self
            .template
            .create_transfer_body(self.subwallet_id, seqno, valid_until, transfers)?;
        let signed = message::sign_body(&self.keypair, &body)?;
        let state_init = if seqno == 0 {
            Some(Arc::new(self.state_init()?))
        } else {
            None
        };
        Ok(message::external_message(
            &self.address,
            state_init,
            Arc::new(signed),
        )?)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address.to_raw_string())
            .field("public_key", &hex::encode(self.keypair.public_key))
            .field("workchain", &self.workchain)
            .field("subwallet_id", &self.subwallet_id)
            .field("version", &self.template.version())
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

//! Wallet derivation from a mnemonic phrase.

use std::sync::Arc;

use tracing::info;

use crate::error::{WalletError, WalletResult};
use crate::mnemonic::Mnemonic;
use crate::template::WalletTemplate;
use crate::wallet::Wallet;

/// Turns a phrase into a [`Wallet`] using a fixed contract template.
#[derive(Clone)]
pub struct KeyManager {
    template: Arc<dyn WalletTemplate>,
    workchain: i32,
    subwallet_id: Option<u32>,
    strict: bool,
}

impl KeyManager {
    /// Basechain wallets, default subwallet id, strict seed check.
    pub fn new(template: Arc<dyn WalletTemplate>) -> Self {
        Self {
            template,
            workchain: 0,
            subwallet_id: None,
            strict: true,
        }
    }

    pub fn with_workchain(mut self, workchain: i32) -> Self {
        self.workchain = workchain;
        self
    }

    pub fn with_subwallet_id(mut self, subwallet_id: Option<u32>) -> Self {
        self.subwallet_id = subwallet_id;
        self
    }

    /// Require phrases to pass the TON seed check.
    pub fn with_strict_mnemonic(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Derive the wallet for `mnemonic`.
    ///
    /// Fails with `MnemonicRequired` for a missing or blank phrase and with
    /// `WrongWordCount` before any hashing when the length is not one of
    /// 12, 15, 18, 21 or 24 words.
    pub fn initialize(&self, mnemonic: Option<&str>) -> WalletResult<Wallet> {
        let phrase = mnemonic
            .filter(|p| !p.trim().is_empty())
            .ok_or(WalletError::MnemonicRequired)?;

        let mnemonic = if self.strict {
            Mnemonic::from_phrase_strict(phrase)?
        } else {
            Mnemonic::from_phrase(phrase)?
        };

        let wallet = Wallet::new(
            self.template.clone(),
            mnemonic.to_keypair(),
            self.workchain,
            self.subwallet_id,
        )?;
        info!(
            address = %wallet.address(),
            version = wallet.version(),
            "Wallet initialized"
        );
        Ok(wallet)
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("version", &self.template.version())
            .field("workchain", &self.workchain)
            .field("subwallet_id", &self.subwallet_id)
            .field("strict", &self.strict)
            .finish()
    }
}

//! TON wallet: mnemonic handling, contract templates and signed messages.
//!
//! - [`Mnemonic`]: TON phrase validation and Ed25519 key derivation
//! - [`WalletTemplate`] / [`WalletV4R2`]: contract code and data layout
//! - [`KeyManager`]: phrase to [`Wallet`] (keys plus derived address)
//! - [`message`]: internal/external messages, StateInit, comments, signing

pub mod error;
pub mod key_manager;
pub mod message;
pub mod mnemonic;
pub mod template;
pub mod v4r2;
pub mod wallet;

pub use error::{WalletError, WalletResult};
pub use key_manager::KeyManager;
pub use message::{build_comment, Transfer};
pub use mnemonic::{Mnemonic, VALID_WORD_COUNTS};
pub use template::WalletTemplate;
pub use v4r2::{WalletV4R2, DEFAULT_WALLET_ID, WALLET_V4R2_CODE_BOC, WALLET_V4R2_CODE_HASH};
pub use wallet::Wallet;

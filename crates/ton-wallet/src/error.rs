//! Error types for ton-wallet

use thiserror::Error;

/// Wallet error type
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Cell error: {0}")]
    Cell(#[from] ton_cell::CellError),

    #[error("Mnemonic required")]
    MnemonicRequired,

    /// Rejected before any key derivation is attempted.
    #[error("Wrong word count: expected 12, 15, 18, 21 or 24, got {0}")]
    WrongWordCount(usize),

    #[error("Invalid word in mnemonic: {0}")]
    InvalidWord(String),

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Too many transfers: max {max}, got {got}")]
    TooManyTransfers { max: usize, got: usize },

    #[error("Invalid wallet code: {0}")]
    InvalidCode(String),

    #[error("Signed body too large: {0} bits")]
    BodyTooLarge(usize),
}

impl WalletError {
    /// Whether the phrase was rejected on shape alone, before derivation.
    pub fn is_word_count(&self) -> bool {
        matches!(self, WalletError::WrongWordCount(_))
    }
}

/// Result type alias
pub type WalletResult<T> = Result<T, WalletError>;

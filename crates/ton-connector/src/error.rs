//! Error taxonomy of the connector.

use thiserror::Error;
use ton_cell::CellError;
use ton_jetton::JettonError;
use ton_wallet::WalletError;

/// Why a mnemonic was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MnemonicFailure {
    /// Rejected on length alone; no derivation was attempted.
    #[error("expected 12, 15, 18, 21 or 24 words, got {0}")]
    WordCount(usize),

    /// Unknown word or failed TON seed check.
    #[error("{0}")]
    Derivation(String),
}

/// Connector error type
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(MnemonicFailure),

    #[error("Mnemonic required")]
    MnemonicRequired,

    #[error("Wallet not initialized")]
    WalletNotInitialized,

    /// A cell would exceed 1023 bits or 4 references.
    #[error("Cell overflow: {0}")]
    CellOverflow(CellError),

    /// The wallet seqno did not advance within the configured attempts. The
    /// message may still be accepted later.
    #[error("Confirmation timeout: seqno {seqno} not advanced after {attempts} attempts")]
    ConfirmationTimeout { seqno: u32, attempts: u32 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cell error: {0}")]
    Cell(CellError),

    #[error("Jetton error: {0}")]
    Jetton(JettonError),

    #[error("Wallet error: {0}")]
    Wallet(WalletError),

    /// A get method returned a stack of the wrong shape.
    #[error("Unexpected stack: {0}")]
    UnexpectedStack(String),
}

impl ConnectorError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConnectorError::ConfirmationTimeout { .. })
    }
}

impl From<CellError> for ConnectorError {
    fn from(e: CellError) -> Self {
        match e {
            CellError::InvalidAddress(msg) => ConnectorError::InvalidAddress(msg),
            e if e.is_overflow() => ConnectorError::CellOverflow(e),
            e => ConnectorError::Cell(e),
        }
    }
}

impl From<WalletError> for ConnectorError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::MnemonicRequired => ConnectorError::MnemonicRequired,
            WalletError::WrongWordCount(n) => {
                ConnectorError::InvalidMnemonic(MnemonicFailure::WordCount(n))
            }
            WalletError::InvalidWord(_) | WalletError::InvalidMnemonic(_) => {
                ConnectorError::InvalidMnemonic(MnemonicFailure::Derivation(e.to_string()))
            }
            WalletError::Cell(e) => e.into(),
            e => ConnectorError::Wallet(e),
        }
    }
}

impl From<JettonError> for ConnectorError {
    fn from(e: JettonError) -> Self {
        match e {
            JettonError::CellError(e) => e.into(),
            e => ConnectorError::Jetton(e),
        }
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(e: reqwest::Error) -> Self {
        ConnectorError::Rpc(e.to_string())
    }
}

/// Result type alias
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_is_distinct_from_other_cell_errors() {
        let overflow: ConnectorError = CellError::BitOverflow { need: 8, left: 0 }.into();
        assert!(matches!(overflow, ConnectorError::CellOverflow(_)));

        let refs: ConnectorError = WalletError::Cell(CellError::RefOverflow(5)).into();
        assert!(matches!(refs, ConnectorError::CellOverflow(_)));

        let other: ConnectorError = CellError::UnexpectedEof.into();
        assert!(matches!(other, ConnectorError::Cell(_)));
    }

    #[test]
    fn test_mnemonic_failures_are_distinguished() {
        let count: ConnectorError = WalletError::WrongWordCount(11).into();
        assert!(matches!(
            count,
            ConnectorError::InvalidMnemonic(MnemonicFailure::WordCount(11))
        ));

        let word: ConnectorError = WalletError::InvalidWord("zzz".into()).into();
        assert!(matches!(
            word,
            ConnectorError::InvalidMnemonic(MnemonicFailure::Derivation(_))
        ));

        let missing: ConnectorError = WalletError::MnemonicRequired.into();
        assert!(matches!(missing, ConnectorError::MnemonicRequired));
    }

    #[test]
    fn test_address_errors_surface_as_invalid_address() {
        let e: ConnectorError = CellError::InvalidAddress("bad".into()).into();
        assert!(matches!(e, ConnectorError::InvalidAddress(_)));
    }
}

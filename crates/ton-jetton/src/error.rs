//! Error types for Jetton operations.

use thiserror::Error;

/// Errors that can occur during Jetton operations.
#[derive(Debug, Error)]
pub enum JettonError {
    /// Unknown TEP-64 content layout byte.
    #[error("Invalid content type: 0x{0:02x} (expected 0x00 for on-chain or 0x01 for off-chain)")]
    InvalidContentType(u8),

    /// Content cell too short to carry a layout byte.
    #[error("Empty content cell")]
    EmptyContent,

    /// An attribute value could not be decoded.
    #[error("Invalid metadata attribute {key}: {reason}")]
    InvalidAttribute { key: &'static str, reason: String },

    /// Message body starts with a different opcode.
    #[error("Unexpected opcode: expected 0x{expected:08x}, got 0x{actual:08x}")]
    UnexpectedOpcode { expected: u32, actual: u32 },

    /// Cell operation error.
    #[error("Cell error: {0}")]
    CellError(#[from] ton_cell::CellError),
}

/// Result type for Jetton operations.
pub type JettonResult<T> = Result<T, JettonError>;

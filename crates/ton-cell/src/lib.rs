//! TON Cell and Bag of Cells (BoC) Library
//!
//! This crate provides the data structures every TON message is made of:
//!
//! - **Cell**: immutable node with up to 1023 bits and 4 references
//! - **CellBuilder**: append-only builder, finalized with `build()`
//! - **CellSlice**: sequential reader over a cell
//! - **BagOfCells**: canonical binary serialization of a cell tree
//! - **MsgAddress**: TON address (raw and user-friendly forms)
//! - **Dictionary**: `HashmapE 256 ^Cell` used by token metadata
//! - **snake**: byte strings split across a chain of cells
//!
//! # Example
//!
//! ```
//! use ton_cell::{CellBuilder, BagOfCells};
//!
//! let mut builder = CellBuilder::new();
//! builder.store_u32(0x12345678).unwrap();
//! builder.store_bytes(&[1, 2, 3, 4]).unwrap();
//! let cell = builder.build().unwrap();
//!
//! let bytes = BagOfCells::from_root(cell.clone()).serialize().unwrap();
//! let decoded = BagOfCells::deserialize(&bytes).unwrap();
//! assert_eq!(decoded.single_root().unwrap().hash(), cell.hash());
//! ```
//!
//! A builder is consumed by `build()`, so nothing can be appended to a
//! finalized cell:
//!
//! ```compile_fail
//! use ton_cell::CellBuilder;
//!
//! let mut builder = CellBuilder::new();
//! builder.store_u8(1).unwrap();
//! let cell = builder.build().unwrap();
//! builder.store_u8(2).unwrap();
//! ```

use sha2::{Digest, Sha256};
use thiserror::Error;

mod address;
mod boc;
mod builder;
mod cell;
mod dict;
mod slice;
pub mod snake;

pub use address::{AddressFlags, MsgAddress};
pub use boc::BagOfCells;
pub use builder::CellBuilder;
pub use cell::{Cell, CellStats, HASH_BYTES};
pub use dict::{Dictionary, DICT_KEY_BITS};
pub use slice::CellSlice;

/// Errors that can occur during Cell/BoC operations.
#[derive(Debug, Error)]
pub enum CellError {
    /// Appending would exceed the 1023-bit data limit.
    #[error("Cell bit overflow: need {need} bits, {left} left (max 1023)")]
    BitOverflow { need: usize, left: usize },

    /// Appending would exceed the 4-reference limit.
    #[error("Cell reference overflow: would have {0} refs (max 4)")]
    RefOverflow(usize),

    /// A value does not fit in the requested bit width.
    #[error("Value {value} does not fit in {bits} bits")]
    ValueOutOfRange { value: String, bits: usize },

    /// Cell tree is deeper than the network allows, or cyclic.
    #[error("Cell tree depth exceeds {0}")]
    DepthExceeded(usize),

    /// Invalid BoC format.
    #[error("Invalid BoC format: {0}")]
    InvalidBoc(String),

    /// Cell not found in BoC.
    #[error("Cell not found: index {0}")]
    CellNotFound(usize),

    /// CRC32 checksum mismatch.
    #[error("CRC32 mismatch: expected 0x{expected:08x}, got 0x{actual:08x}")]
    CrcMismatch { expected: u32, actual: u32 },

    /// Unexpected end of data.
    #[error("Unexpected end of data")]
    UnexpectedEof,

    /// Not enough bits available.
    #[error("Not enough bits: need {need}, have {have}")]
    NotEnoughBits { need: usize, have: usize },

    /// Not enough references available.
    #[error("Not enough refs: need {need}, have {have}")]
    NotEnoughRefs { need: usize, have: usize },

    /// Invalid address format.
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    /// Invalid base64 encoding.
    #[error("Invalid base64: {0}")]
    InvalidBase64(String),

    /// Invalid hex encoding.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Expected single root but found multiple or none.
    #[error("Expected single root, found {0}")]
    NotSingleRoot(usize),

    /// Exotic cells (pruned branches, Merkle proofs, libraries) are not handled.
    #[error("Exotic cell in input (descriptor 0x{0:02x})")]
    ExoticCell(u8),

    /// Invalid bit length for the requested operation.
    #[error("Invalid bit length: {0}")]
    InvalidBitLength(usize),

    /// Cell bytes are not valid UTF-8 text.
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Malformed HashmapE structure.
    #[error("Invalid dictionary: {0}")]
    InvalidDictionary(String),
}

impl CellError {
    /// Whether this error is a 1023-bit / 4-ref capacity violation.
    pub fn is_overflow(&self) -> bool {
        matches!(self, CellError::BitOverflow { .. } | CellError::RefOverflow(_))
    }
}

/// Result type for Cell/BoC operations.
pub type CellResult<T> = Result<T, CellError>;

/// Maximum number of bits in a cell's data.
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references a cell can have.
pub const MAX_CELL_REFS: usize = 4;

/// Maximum number of bytes in cell data (1023 bits round up to 128 bytes).
pub const MAX_CELL_BYTES: usize = 128;

/// Maximum depth of a cell tree.
/// Reference: ton-blockchain/ton/crypto/vm/cells/CellTraits.h max_depth = 1024
pub const MAX_CELL_DEPTH: usize = 1024;

/// BoC magic number for generic BoC.
pub const BOC_GENERIC_MAGIC: u32 = 0xb5ee9c72;

/// BoC magic number for indexed BoC.
pub const BOC_INDEXED_MAGIC: u32 = 0x68ff65f3;

/// BoC magic number for indexed CRC32 BoC.
pub const BOC_INDEXED_CRC32_MAGIC: u32 = 0xacc3a728;

/// Compute SHA256 hash of the input data.
fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Compute CRC32-C checksum (Castagnoli polynomial).
fn crc32c(data: &[u8]) -> u32 {
    const CRC32C: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISCSI);
    CRC32C.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_exactly_full_cell_builds() {
        let mut builder = CellBuilder::new();
        builder.store_bytes(&[0xAA; 127]).unwrap();
        builder.store_uint(0b1010101, 7).unwrap();
        let leaf = Arc::new(CellBuilder::new().build().unwrap());
        for _ in 0..MAX_CELL_REFS {
            builder.store_ref(leaf.clone()).unwrap();
        }
        assert_eq!(builder.bits_left(), 0);
        assert_eq!(builder.refs_left(), 0);

        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), MAX_CELL_BITS);
        assert_eq!(cell.reference_count(), MAX_CELL_REFS);
    }

    #[test]
    fn test_overflow_errors_are_tagged() {
        let mut builder = CellBuilder::new();
        builder.store_bytes(&[0; 127]).unwrap();
        let err = builder.store_u8(1).unwrap_err();
        assert!(err.is_overflow());
        assert!(matches!(err, CellError::BitOverflow { need: 8, left: 7 }));

        let leaf = Arc::new(CellBuilder::new().build().unwrap());
        let mut builder = CellBuilder::new();
        for _ in 0..4 {
            builder.store_ref(leaf.clone()).unwrap();
        }
        let err = builder.store_ref(leaf).unwrap_err();
        assert!(matches!(err, CellError::RefOverflow(5)));
        assert!(err.is_overflow());

        assert!(!CellError::UnexpectedEof.is_overflow());
    }

    #[test]
    fn test_failed_append_leaves_builder_untouched() {
        let mut builder = CellBuilder::new();
        builder.store_bytes(&[0xFF; 120]).unwrap();
        assert!(builder.store_bytes(&[0x01; 8]).is_err());
        assert_eq!(builder.bit_len(), 960);

        let cell = builder.build().unwrap();
        assert_eq!(cell.data(), &[0xFF; 120][..]);
    }

    #[test]
    fn test_empty_cell_hash_is_known_constant() {
        // Hash of the empty ordinary cell, as reported by every TON implementation.
        let cell = CellBuilder::new().build().unwrap();
        assert_eq!(
            hex::encode(cell.hash()),
            "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7"
        );
    }

    #[test]
    fn test_crc32c_check_value() {
        assert_eq!(crc32c(b"123456789"), 0xE3069283);
    }
}

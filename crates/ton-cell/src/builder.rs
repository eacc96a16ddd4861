//! CellBuilder for constructing TON cells.
//!
//! Every `store_*` call checks capacity before writing, so a rejected
//! append leaves the builder exactly as it was.

use std::sync::Arc;

use crate::{Cell, CellError, CellResult, CellSlice, MsgAddress, MAX_CELL_BITS, MAX_CELL_REFS};

/// Builder for constructing TON cells.
///
/// # Example
///
/// ```
/// use ton_cell::CellBuilder;
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x12345678).unwrap().store_coins(1_000_000_000).unwrap();
/// let cell = builder.build().unwrap();
/// assert_eq!(cell.bit_len(), 32 + 4 + 32);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    references: Vec<Arc<Cell>>,
}

impl CellBuilder {
    /// Create a new empty CellBuilder.
    pub fn new() -> Self {
        CellBuilder {
            data: Vec::with_capacity(128),
            bit_len: 0,
            references: Vec::new(),
        }
    }

    fn ensure_bits(&self, need: usize) -> CellResult<()> {
        let left = self.bits_left();
        if need > left {
            return Err(CellError::BitOverflow { need, left });
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        let byte_index = self.bit_len / 8;
        if byte_index >= self.data.len() {
            self.data.push(0);
        }
        if bit {
            self.data[byte_index] |= 1 << (7 - self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    fn push_uint(&mut self, value: u128, bits: usize) {
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
    }

    /// Store a single bit.
    pub fn store_bit(&mut self, bit: bool) -> CellResult<&mut Self> {
        self.ensure_bits(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Store multiple bits.
    pub fn store_bits(&mut self, bits: &[bool]) -> CellResult<&mut Self> {
        self.ensure_bits(bits.len())?;
        for &bit in bits {
            self.push_bit(bit);
        }
        Ok(self)
    }

    pub fn store_u8(&mut self, value: u8) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 8)
    }

    pub fn store_u16(&mut self, value: u16) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 16)
    }

    pub fn store_u32(&mut self, value: u32) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 32)
    }

    pub fn store_u64(&mut self, value: u64) -> CellResult<&mut Self> {
        self.store_uint(value, 64)
    }

    pub fn store_i8(&mut self, value: i8) -> CellResult<&mut Self> {
        self.store_int(value as i64, 8)
    }

    pub fn store_i32(&mut self, value: i32) -> CellResult<&mut Self> {
        self.store_int(value as i64, 32)
    }

    /// Store an unsigned integer with a specific bit width (at most 64).
    pub fn store_uint(&mut self, value: u64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        self.store_uint_wide(value as u128, bits)
    }

    /// Store a signed integer with a specific bit width (at most 64),
    /// two's complement, big-endian.
    pub fn store_int(&mut self, value: i64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        self.store_int_wide(value as i128, bits)
    }

    /// Store an unsigned integer in up to 256 bits.
    ///
    /// Widths above 128 are zero-padded on the left.
    pub fn store_uint_wide(&mut self, value: u128, bits: usize) -> CellResult<&mut Self> {
        if bits > 256 {
            return Err(CellError::InvalidBitLength(bits));
        }
        if bits < 128 && value >> bits != 0 {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                bits,
            });
        }
        self.ensure_bits(bits)?;

        let padding = bits.saturating_sub(128);
        for _ in 0..padding {
            self.push_bit(false);
        }
        self.push_uint(value, bits - padding);
        Ok(self)
    }

    /// Store a signed integer in up to 256 bits, sign-extending above 128.
    pub fn store_int_wide(&mut self, value: i128, bits: usize) -> CellResult<&mut Self> {
        if bits > 256 {
            return Err(CellError::InvalidBitLength(bits));
        }
        if bits == 0 {
            if value != 0 {
                return Err(CellError::ValueOutOfRange {
                    value: value.to_string(),
                    bits,
                });
            }
            return Ok(self);
        }
        if bits < 128 {
            let min = -(1i128 << (bits - 1));
            let max = (1i128 << (bits - 1)) - 1;
            if value < min || value > max {
                return Err(CellError::ValueOutOfRange {
                    value: value.to_string(),
                    bits,
                });
            }
        }
        self.ensure_bits(bits)?;

        let padding = bits.saturating_sub(128);
        for _ in 0..padding {
            self.push_bit(value < 0);
        }
        self.push_uint(value as u128, bits - padding);
        Ok(self)
    }

    /// Store a byte array.
    pub fn store_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        self.ensure_bits(bytes.len() * 8)?;
        for &byte in bytes {
            self.push_uint(byte as u128, 8);
        }
        Ok(self)
    }

    /// Store the unread bits and refs of a CellSlice.
    pub fn store_slice(&mut self, slice: &CellSlice) -> CellResult<&mut Self> {
        let bits_left = slice.bits_left();
        self.ensure_bits(bits_left)?;
        let refs = slice.refs_left();
        if self.references.len() + refs > MAX_CELL_REFS {
            return Err(CellError::RefOverflow(self.references.len() + refs));
        }

        for i in 0..bits_left {
            self.push_bit(slice.get_bit_at(slice.bit_offset + i));
        }
        for i in slice.ref_offset..slice.cell.reference_count() {
            if let Some(reference) = slice.cell.reference(i) {
                self.references.push(reference.clone());
            }
        }
        Ok(self)
    }

    /// Store a reference to another cell.
    pub fn store_ref(&mut self, cell: Arc<Cell>) -> CellResult<&mut Self> {
        if self.references.len() >= MAX_CELL_REFS {
            return Err(CellError::RefOverflow(self.references.len() + 1));
        }
        self.references.push(cell);
        Ok(self)
    }

    /// Store `Maybe ^Cell`: a presence bit, plus the reference when present.
    pub fn store_maybe_ref(&mut self, cell: Option<Arc<Cell>>) -> CellResult<&mut Self> {
        match cell {
            Some(cell) => {
                self.ensure_bits(1)?;
                if self.references.len() >= MAX_CELL_REFS {
                    return Err(CellError::RefOverflow(self.references.len() + 1));
                }
                self.push_bit(true);
                self.references.push(cell);
                Ok(self)
            }
            None => self.store_bit(false),
        }
    }

    /// Store coins (VarUInteger 16): 4-bit byte length, then the value.
    pub fn store_coins(&mut self, nanotons: u128) -> CellResult<&mut Self> {
        let bytes_needed = (128 - nanotons.leading_zeros()).div_ceil(8) as usize;
        if bytes_needed > 15 {
            return Err(CellError::ValueOutOfRange {
                value: nanotons.to_string(),
                bits: 120,
            });
        }
        self.ensure_bits(4 + bytes_needed * 8)?;
        self.push_uint(bytes_needed as u128, 4);
        self.push_uint(nanotons, bytes_needed * 8);
        Ok(self)
    }

    /// Store a message address.
    pub fn store_address(&mut self, addr: &MsgAddress) -> CellResult<&mut Self> {
        match addr {
            MsgAddress::Null => {
                // addr_none$00
                self.store_uint(0b00, 2)
            }
            MsgAddress::External { len, data } => {
                // addr_extern$01 len:(## 9) external_address:(bits len)
                let len = *len as usize;
                if data.len() * 8 < len {
                    return Err(CellError::InvalidAddress(format!(
                        "external address declares {len} bits but carries {}",
                        data.len() * 8
                    )));
                }
                self.ensure_bits(2 + 9 + len)?;
                self.push_uint(0b01, 2);
                self.push_uint(len as u128, 9);
                for i in 0..len {
                    self.push_bit((data[i / 8] >> (7 - i % 8)) & 1 == 1);
                }
                Ok(self)
            }
            MsgAddress::Internal { workchain, address } => {
                // addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256
                let workchain = i8::try_from(*workchain).map_err(|_| {
                    CellError::InvalidAddress(format!("workchain {workchain} does not fit addr_std"))
                })?;
                self.ensure_bits(2 + 1 + 8 + 256)?;
                self.push_uint(0b100, 3);
                self.push_uint(workchain as u8 as u128, 8);
                for &byte in address {
                    self.push_uint(byte as u128, 8);
                }
                Ok(self)
            }
        }
    }

    /// Get the number of bits that can still be stored.
    pub fn bits_left(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    /// Get the number of references that can still be added.
    pub fn refs_left(&self) -> usize {
        MAX_CELL_REFS - self.references.len()
    }

    /// Get the current number of bits stored.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Get the current number of references.
    pub fn ref_count(&self) -> usize {
        self.references.len()
    }

    /// Finalize into an immutable cell, consuming the builder.
    pub fn build(self) -> CellResult<Cell> {
        Cell::new(self.data, self.bit_len, self.references)
    }
}

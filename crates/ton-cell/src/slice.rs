//! CellSlice for reading data from TON cells.
//!
//! A CellSlice provides methods to sequentially read data from a cell,
//! tracking the current position within the cell's data and references.

use std::sync::Arc;

use crate::{Cell, CellError, CellResult, MsgAddress};

/// A slice view into a Cell for reading data.
///
/// # Example
///
/// ```
/// use ton_cell::{CellBuilder, CellSlice};
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x12345678).unwrap();
/// let cell = builder.build().unwrap();
///
/// let mut slice = CellSlice::new(&cell);
/// assert_eq!(slice.load_u32().unwrap(), 0x12345678);
/// ```
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    pub(crate) cell: &'a Cell,
    pub(crate) bit_offset: usize,
    /// Number of bits remaining (from bit_offset).
    pub(crate) bit_len: usize,
    pub(crate) ref_offset: usize,
}

impl<'a> CellSlice<'a> {
    /// Create a new slice from a cell.
    pub fn new(cell: &'a Cell) -> Self {
        CellSlice {
            cell,
            bit_offset: 0,
            bit_len: cell.bit_len(),
            ref_offset: 0,
        }
    }

    fn ensure_bits(&self, need: usize) -> CellResult<()> {
        if need > self.bit_len {
            return Err(CellError::NotEnoughBits {
                need,
                have: self.bit_len,
            });
        }
        Ok(())
    }

    fn take_bit(&mut self) -> bool {
        let bit = self.get_bit_at(self.bit_offset);
        self.bit_offset += 1;
        self.bit_len -= 1;
        bit
    }

    /// Load a single bit.
    pub fn load_bit(&mut self) -> CellResult<bool> {
        self.ensure_bits(1)?;
        Ok(self.take_bit())
    }

    /// Load multiple bits.
    pub fn load_bits(&mut self, count: usize) -> CellResult<Vec<bool>> {
        self.ensure_bits(count)?;
        Ok((0..count).map(|_| self.take_bit()).collect())
    }

    pub fn load_u8(&mut self) -> CellResult<u8> {
        self.load_uint(8).map(|v| v as u8)
    }

    pub fn load_u16(&mut self) -> CellResult<u16> {
        self.load_uint(16).map(|v| v as u16)
    }

    pub fn load_u32(&mut self) -> CellResult<u32> {
        self.load_uint(32).map(|v| v as u32)
    }

    pub fn load_u64(&mut self) -> CellResult<u64> {
        self.load_uint(64)
    }

    pub fn load_i8(&mut self) -> CellResult<i8> {
        self.load_int(8).map(|v| v as i8)
    }

    pub fn load_i32(&mut self) -> CellResult<i32> {
        self.load_int(32).map(|v| v as i32)
    }

    /// Load an unsigned integer with a specific bit width (at most 64).
    pub fn load_uint(&mut self, bits: usize) -> CellResult<u64> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        self.load_uint_wide(bits).map(|v| v as u64)
    }

    /// Load a signed integer with a specific bit width (two's complement, at most 64).
    pub fn load_int(&mut self, bits: usize) -> CellResult<i64> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        self.load_int_wide(bits).map(|v| v as i64)
    }

    /// Load an unsigned integer of up to 256 bits.
    ///
    /// Widths above 128 must carry only zero bits in the extra high part.
    pub fn load_uint_wide(&mut self, bits: usize) -> CellResult<u128> {
        if bits > 256 {
            return Err(CellError::InvalidBitLength(bits));
        }
        self.ensure_bits(bits)?;

        let padding = bits.saturating_sub(128);
        let mut high_set = false;
        for _ in 0..padding {
            high_set |= self.take_bit();
        }
        let mut result: u128 = 0;
        for _ in 0..bits - padding {
            result = (result << 1) | self.take_bit() as u128;
        }
        if high_set {
            return Err(CellError::ValueOutOfRange {
                value: format!("> {result}"),
                bits: 128,
            });
        }
        Ok(result)
    }

    /// Load a signed integer of up to 256 bits.
    pub fn load_int_wide(&mut self, bits: usize) -> CellResult<i128> {
        if bits == 0 {
            return Ok(0);
        }
        if bits > 256 {
            return Err(CellError::InvalidBitLength(bits));
        }
        self.ensure_bits(bits)?;

        let padding = bits.saturating_sub(128);
        let low_bits = bits - padding;
        let sign = self.get_bit_at(self.bit_offset);
        for _ in 0..padding {
            if self.take_bit() != sign {
                return Err(CellError::ValueOutOfRange {
                    value: "signed integer".to_string(),
                    bits: 128,
                });
            }
        }
        let mut unsigned: u128 = 0;
        for _ in 0..low_bits {
            unsigned = (unsigned << 1) | self.take_bit() as u128;
        }
        if low_bits < 128 && sign {
            unsigned |= !0u128 << low_bits;
        }
        let value = unsigned as i128;
        if padding > 0 && (value < 0) != sign {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                bits: 128,
            });
        }
        Ok(value)
    }

    /// Load a byte array.
    pub fn load_bytes(&mut self, count: usize) -> CellResult<Vec<u8>> {
        self.ensure_bits(count * 8)?;
        let mut result = Vec::with_capacity(count);
        for _ in 0..count {
            let mut byte = 0u8;
            for _ in 0..8 {
                byte = (byte << 1) | self.take_bit() as u8;
            }
            result.push(byte);
        }
        Ok(result)
    }

    /// Load all remaining bits as bytes. Fails if they are not byte-aligned.
    pub fn load_remaining_bytes(&mut self) -> CellResult<Vec<u8>> {
        if !self.bit_len.is_multiple_of(8) {
            return Err(CellError::InvalidBitLength(self.bit_len));
        }
        self.load_bytes(self.bit_len / 8)
    }

    /// Load a reference to another cell.
    pub fn load_ref(&mut self) -> CellResult<&'a Arc<Cell>> {
        let reference = self
            .cell
            .reference(self.ref_offset)
            .ok_or(CellError::NotEnoughRefs { need: 1, have: 0 })?;
        self.ref_offset += 1;
        Ok(reference)
    }

    /// Load `Maybe ^Cell`.
    pub fn load_maybe_ref(&mut self) -> CellResult<Option<&'a Arc<Cell>>> {
        if self.load_bit()? {
            self.load_ref().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Load coins (VarUInteger 16).
    pub fn load_coins(&mut self) -> CellResult<u128> {
        let byte_len = self.load_uint(4)? as usize;
        self.load_uint_wide(byte_len * 8)
    }

    /// Load a message address.
    pub fn load_address(&mut self) -> CellResult<MsgAddress> {
        match self.load_uint(2)? {
            0b00 => Ok(MsgAddress::Null),
            0b01 => {
                // addr_extern$01 len:(## 9) external_address:(bits len)
                let len = self.load_uint(9)? as u16;
                let bits = self.load_bits(len as usize)?;
                let mut data = vec![0u8; (len as usize).div_ceil(8)];
                for (i, bit) in bits.into_iter().enumerate() {
                    if bit {
                        data[i / 8] |= 1 << (7 - i % 8);
                    }
                }
                Ok(MsgAddress::External { len, data })
            }
            0b10 => {
                // addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256
                if self.load_bit()? {
                    let depth = self.load_uint(5)?;
                    self.skip_bits(depth as usize)?;
                }
                let workchain = self.load_i8()? as i32;
                let mut address = [0u8; 32];
                address.copy_from_slice(&self.load_bytes(32)?);
                Ok(MsgAddress::Internal { workchain, address })
            }
            _ => Err(CellError::InvalidAddress(
                "addr_var is not supported".to_string(),
            )),
        }
    }

    /// Get the number of bits remaining.
    pub fn bits_left(&self) -> usize {
        self.bit_len
    }

    /// Get the number of references remaining.
    pub fn refs_left(&self) -> usize {
        self.cell.reference_count() - self.ref_offset
    }

    /// Skip a number of bits.
    pub fn skip_bits(&mut self, count: usize) -> CellResult<()> {
        self.ensure_bits(count)?;
        self.bit_offset += count;
        self.bit_len -= count;
        Ok(())
    }

    /// Check if the slice is empty (no bits or refs left).
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0 && self.refs_left() == 0
    }

    pub(crate) fn get_bit_at(&self, index: usize) -> bool {
        self.cell.get_bit(index).unwrap_or(false)
    }

    /// Copy the unread part of this slice into a standalone cell.
    pub fn to_cell(&self) -> CellResult<Cell> {
        let mut builder = crate::CellBuilder::new();
        builder.store_slice(self)?;
        builder.build()
    }
}

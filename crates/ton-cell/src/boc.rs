//! Bag of Cells (BoC) serialization format.
//!
//! BoC is the standard serialization format for TON cells. It encodes a DAG
//! of cells with deduplication and an optional CRC32-C checksum. Cells are
//! written parent-first, so every reference points to a higher index.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::{
    crc32c, Cell, CellError, CellResult, BOC_GENERIC_MAGIC, BOC_INDEXED_CRC32_MAGIC, BOC_INDEXED_MAGIC,
    MAX_CELL_BITS, MAX_CELL_DEPTH, MAX_CELL_REFS,
};

/// Bag of Cells - a serialized collection of cells.
#[derive(Debug, Clone)]
pub struct BagOfCells {
    roots: Vec<Arc<Cell>>,
}

/// A cell as read from the wire, before its references are resolved.
struct RawCell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<usize>,
}

enum Slot {
    Pending,
    Building,
    Built(Arc<Cell>),
}

impl BagOfCells {
    /// Create a new BoC with the given root cells.
    pub fn new(roots: Vec<Arc<Cell>>) -> Self {
        BagOfCells { roots }
    }

    /// Create a BoC with a single root cell.
    pub fn from_root(root: Cell) -> Self {
        BagOfCells {
            roots: vec![Arc::new(root)],
        }
    }

    /// Get all root cells.
    pub fn roots(&self) -> &[Arc<Cell>] {
        &self.roots
    }

    /// Get a single root cell (errors if not exactly one root).
    pub fn single_root(&self) -> CellResult<&Arc<Cell>> {
        match self.roots.as_slice() {
            [root] => Ok(root),
            roots => Err(CellError::NotSingleRoot(roots.len())),
        }
    }

    /// Take the single root cell out of the bag.
    pub fn into_single_root(self) -> CellResult<Arc<Cell>> {
        let count = self.roots.len();
        let mut roots = self.roots.into_iter();
        match (roots.next(), roots.next()) {
            (Some(root), None) => Ok(root),
            _ => Err(CellError::NotSingleRoot(count)),
        }
    }

    /// Serialize the BoC to bytes with a CRC32-C trailer and no index.
    pub fn serialize(&self) -> CellResult<Vec<u8>> {
        self.serialize_with_options(true, false)
    }

    /// Serialize with options.
    ///
    /// # Arguments
    /// * `with_crc` - Include CRC32 checksum
    /// * `with_index` - Include cell index (for faster deserialization)
    pub fn serialize_with_options(&self, with_crc: bool, with_index: bool) -> CellResult<Vec<u8>> {
        if self.roots.is_empty() {
            return Err(CellError::InvalidBoc("No root cells".to_string()));
        }

        let cells = self.collect_cells_parent_first();
        let cell_count = cells.len();

        let hash_to_index: HashMap<[u8; 32], usize> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| (c.hash(), i))
            .collect();

        let root_indices = self
            .roots
            .iter()
            .map(|r| {
                hash_to_index
                    .get(&r.hash())
                    .copied()
                    .ok_or_else(|| CellError::InvalidBoc("Root not collected".to_string()))
            })
            .collect::<CellResult<Vec<usize>>>()?;

        let size_bytes = Self::bytes_needed(cell_count);
        let mut cell_data: Vec<Vec<u8>> = Vec::with_capacity(cell_count);
        for cell in &cells {
            cell_data.push(Self::serialize_cell(cell, &hash_to_index, size_bytes)?);
        }
        let total_cells_size: usize = cell_data.iter().map(Vec::len).sum();
        let off_bytes = Self::bytes_needed(total_cells_size);

        let mut result = Vec::with_capacity(total_cells_size + 32);
        result.extend_from_slice(&BOC_GENERIC_MAGIC.to_be_bytes());

        // has_idx (bit 7) | has_crc (bit 6) | has_cache_bits (bit 5) | flags (bits 4-3) | size_bytes (bits 2-0)
        let flags: u8 = (if with_index { 1 << 7 } else { 0 })
            | (if with_crc { 1 << 6 } else { 0 })
            | (size_bytes as u8);
        result.push(flags);
        result.push(off_bytes as u8);

        Self::write_uint(&mut result, cell_count as u64, size_bytes);
        Self::write_uint(&mut result, self.roots.len() as u64, size_bytes);
        Self::write_uint(&mut result, 0, size_bytes);
        Self::write_uint(&mut result, total_cells_size as u64, off_bytes);

        for idx in &root_indices {
            Self::write_uint(&mut result, *idx as u64, size_bytes);
        }

        if with_index {
            let mut offset = 0usize;
            for data in &cell_data {
                offset += data.len();
                Self::write_uint(&mut result, offset as u64, off_bytes);
            }
        }

        for data in cell_data {
            result.extend_from_slice(&data);
        }

        if with_crc {
            let crc = crc32c(&result);
            result.extend_from_slice(&crc.to_le_bytes());
        }

        Ok(result)
    }

    /// Serialize to base64 string.
    pub fn serialize_to_base64(&self) -> CellResult<String> {
        Ok(STANDARD.encode(self.serialize()?))
    }

    /// Serialize to lowercase hex string.
    pub fn serialize_to_hex(&self) -> CellResult<String> {
        Ok(hex::encode(self.serialize()?))
    }

    /// Deserialize from bytes.
    ///
    /// Supports all three BoC magics:
    /// - `0xb5ee9c72` - Generic BoC (serialized_boc)
    /// - `0x68ff65f3` - Indexed BoC (serialized_boc_idx)
    /// - `0xacc3a728` - Indexed BoC with CRC32C (serialized_boc_idx_crc32c)
    ///
    /// References may point forward or backward; cycles and trees deeper
    /// than `MAX_CELL_DEPTH` are rejected.
    pub fn deserialize(data: &[u8]) -> CellResult<Self> {
        if data.len() < 6 {
            return Err(CellError::UnexpectedEof);
        }

        let magic = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let mut offset = 4;

        let (has_idx, has_crc, size_bytes) = match magic {
            BOC_GENERIC_MAGIC => {
                let flags = data[offset];
                offset += 1;
                (flags & 0x80 != 0, flags & 0x40 != 0, (flags & 0x07) as usize)
            }
            BOC_INDEXED_MAGIC => {
                let size_bytes = data[offset] as usize;
                offset += 1;
                (true, false, size_bytes)
            }
            BOC_INDEXED_CRC32_MAGIC => {
                let size_bytes = data[offset] as usize;
                offset += 1;
                (true, true, size_bytes)
            }
            _ => {
                return Err(CellError::InvalidBoc(format!(
                    "Invalid magic: {:08x}, expected one of {:08x}, {:08x}, {:08x}",
                    magic, BOC_GENERIC_MAGIC, BOC_INDEXED_MAGIC, BOC_INDEXED_CRC32_MAGIC
                )));
            }
        };

        if size_bytes == 0 || size_bytes > 4 {
            return Err(CellError::InvalidBoc(format!("Invalid size_bytes: {size_bytes}")));
        }

        let off_bytes = data[offset] as usize;
        offset += 1;
        if off_bytes == 0 || off_bytes > 8 {
            return Err(CellError::InvalidBoc(format!("Invalid off_bytes: {off_bytes}")));
        }

        let data_end = if has_crc {
            let end = data.len().checked_sub(4).ok_or(CellError::UnexpectedEof)?;
            let expected = u32::from_le_bytes([data[end], data[end + 1], data[end + 2], data[end + 3]]);
            let actual = crc32c(&data[..end]);
            if expected != actual {
                return Err(CellError::CrcMismatch { expected, actual });
            }
            end
        } else {
            data.len()
        };
        let data = &data[..data_end];

        let cells_count = Self::read_uint(data, &mut offset, size_bytes)? as usize;
        let roots_count = Self::read_uint(data, &mut offset, size_bytes)? as usize;
        let _absent_count = Self::read_uint(data, &mut offset, size_bytes)?;
        let total_cells_size = Self::read_uint(data, &mut offset, off_bytes)? as usize;

        if roots_count > cells_count {
            return Err(CellError::InvalidBoc(format!(
                "{roots_count} roots for {cells_count} cells"
            )));
        }

        let mut root_indices = Vec::with_capacity(roots_count);
        for _ in 0..roots_count {
            root_indices.push(Self::read_uint(data, &mut offset, size_bytes)? as usize);
        }

        if has_idx {
            let index_len = cells_count
                .checked_mul(off_bytes)
                .ok_or_else(|| CellError::InvalidBoc("Index too large".to_string()))?;
            offset = offset.checked_add(index_len).ok_or(CellError::UnexpectedEof)?;
        }

        let cells_end = offset.checked_add(total_cells_size).ok_or(CellError::UnexpectedEof)?;
        let cells_data = data.get(offset..cells_end).ok_or(CellError::UnexpectedEof)?;
        let raw = Self::parse_raw_cells(cells_data, cells_count, size_bytes)?;
        let cells = Self::link_cells(raw)?;

        let roots = root_indices
            .iter()
            .map(|&idx| cells.get(idx).cloned().ok_or(CellError::CellNotFound(idx)))
            .collect::<CellResult<Vec<_>>>()?;

        Ok(BagOfCells { roots })
    }

    /// Deserialize from base64 string.
    pub fn deserialize_from_base64(base64_str: &str) -> CellResult<Self> {
        let bytes = STANDARD
            .decode(base64_str.trim())
            .map_err(|e| CellError::InvalidBase64(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    /// Deserialize from hex string.
    pub fn deserialize_from_hex(hex_str: &str) -> CellResult<Self> {
        let bytes = hex::decode(hex_str.trim()).map_err(|e| CellError::InvalidHex(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    /// Decode a single-root BoC given either as hex or as base64.
    ///
    /// Text made only of an even number of hex digits is read as hex.
    pub fn decode_single_root(encoded: &str) -> CellResult<Arc<Cell>> {
        let encoded = encoded.trim();
        let is_hex = encoded.len().is_multiple_of(2) && encoded.bytes().all(|b| b.is_ascii_hexdigit());
        let bag = if is_hex {
            Self::deserialize_from_hex(encoded)?
        } else {
            Self::deserialize_from_base64(encoded)?
        };
        bag.into_single_root()
    }

    /// Collect distinct cells so that every parent precedes its children.
    fn collect_cells_parent_first(&self) -> Vec<Arc<Cell>> {
        let mut post_order: Vec<Arc<Cell>> = Vec::new();
        let mut visited: HashMap<[u8; 32], ()> = HashMap::new();

        // Roots are visited last-to-first so that, after reversal, the
        // first root lands at index 0.
        for root in self.roots.iter().rev() {
            Self::collect_post_order(root, &mut post_order, &mut visited);
        }

        post_order.reverse();
        post_order
    }

    fn collect_post_order(
        cell: &Arc<Cell>,
        out: &mut Vec<Arc<Cell>>,
        visited: &mut HashMap<[u8; 32], ()>,
    ) {
        if visited.insert(cell.hash(), ()).is_some() {
            return;
        }
        for reference in cell.references().iter().rev() {
            Self::collect_post_order(reference, out, visited);
        }
        out.push(cell.clone());
    }

    fn serialize_cell(
        cell: &Cell,
        hash_to_index: &HashMap<[u8; 32], usize>,
        ref_size: usize,
    ) -> CellResult<Vec<u8>> {
        let mut result = Vec::with_capacity(2 + cell.bit_len().div_ceil(8) + 4 * ref_size);

        let (d1, d2) = cell.descriptors();
        result.push(d1);
        result.push(d2);
        result.extend_from_slice(&cell.data_with_completion_tag());

        for reference in cell.references() {
            let idx = hash_to_index
                .get(&reference.hash())
                .ok_or_else(|| CellError::InvalidBoc("Reference not found".to_string()))?;
            Self::write_uint(&mut result, *idx as u64, ref_size);
        }

        Ok(result)
    }

    fn parse_raw_cells(data: &[u8], cell_count: usize, size_bytes: usize) -> CellResult<Vec<RawCell>> {
        let mut offset = 0;
        let mut cells = Vec::with_capacity(cell_count.min(data.len() / 2));

        for _ in 0..cell_count {
            let (d1, d2) = match data.get(offset..offset + 2) {
                Some(&[d1, d2]) => (d1, d2),
                _ => return Err(CellError::UnexpectedEof),
            };
            offset += 2;

            if d1 & 0x08 != 0 || d1 >> 5 != 0 {
                return Err(CellError::ExoticCell(d1));
            }
            let refs_count = (d1 & 0x07) as usize;
            if refs_count > MAX_CELL_REFS {
                return Err(CellError::InvalidBoc(format!("Cell declares {refs_count} refs")));
            }

            let data_len = (d2 as usize).div_ceil(2);
            let bytes = data
                .get(offset..offset + data_len)
                .ok_or(CellError::UnexpectedEof)?;
            offset += data_len;

            let bit_len = if d2.is_multiple_of(2) {
                data_len * 8
            } else {
                Self::find_bit_len(bytes)?
            };
            if bit_len > MAX_CELL_BITS {
                return Err(CellError::InvalidBoc(format!("Cell declares {bit_len} bits")));
            }

            let mut refs = Vec::with_capacity(refs_count);
            for _ in 0..refs_count {
                let idx = Self::read_uint(data, &mut offset, size_bytes)? as usize;
                if idx >= cell_count {
                    return Err(CellError::CellNotFound(idx));
                }
                refs.push(idx);
            }

            cells.push(RawCell {
                data: Self::remove_completion_tag(bytes, bit_len),
                bit_len,
                refs,
            });
        }

        Ok(cells)
    }

    /// Resolve reference indices into `Arc<Cell>`s, building each cell once.
    fn link_cells(raw: Vec<RawCell>) -> CellResult<Vec<Arc<Cell>>> {
        let mut slots: Vec<Slot> = (0..raw.len()).map(|_| Slot::Pending).collect();
        for idx in 0..raw.len() {
            Self::build_cell(idx, &raw, &mut slots, 0)?;
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| match slot {
                Slot::Built(cell) => Ok(cell),
                _ => Err(CellError::CellNotFound(i)),
            })
            .collect()
    }

    fn build_cell(idx: usize, raw: &[RawCell], slots: &mut [Slot], level: usize) -> CellResult<Arc<Cell>> {
        if level > MAX_CELL_DEPTH {
            return Err(CellError::DepthExceeded(MAX_CELL_DEPTH));
        }
        match &slots[idx] {
            Slot::Built(cell) => return Ok(cell.clone()),
            Slot::Building => {
                return Err(CellError::InvalidBoc(format!("Reference cycle through cell {idx}")));
            }
            Slot::Pending => {}
        }
        slots[idx] = Slot::Building;

        let entry = &raw[idx];
        let mut references = Vec::with_capacity(entry.refs.len());
        for &child in &entry.refs {
            references.push(Self::build_cell(child, raw, slots, level + 1)?);
        }

        let cell = Arc::new(Cell::new(entry.data.clone(), entry.bit_len, references)?);
        slots[idx] = Slot::Built(cell.clone());
        Ok(cell)
    }

    /// Find the bit length of a non-aligned cell from its completion tag.
    fn find_bit_len(data: &[u8]) -> CellResult<usize> {
        match data.last() {
            Some(&last) if last != 0 => Ok(data.len() * 8 - last.trailing_zeros() as usize - 1),
            _ => Err(CellError::InvalidBoc("Missing completion tag".to_string())),
        }
    }

    fn remove_completion_tag(data: &[u8], bit_len: usize) -> Vec<u8> {
        let mut result = data[..bit_len.div_ceil(8)].to_vec();
        let remainder = bit_len % 8;
        if remainder != 0
            && let Some(last) = result.last_mut()
        {
            *last &= !((1u8 << (8 - remainder)) - 1);
        }
        result
    }

    /// Calculate bytes needed to represent a number.
    fn bytes_needed(n: usize) -> usize {
        if n == 0 {
            1
        } else {
            (64 - (n as u64).leading_zeros()).div_ceil(8) as usize
        }
    }

    fn write_uint(buf: &mut Vec<u8>, value: u64, bytes: usize) {
        for i in (0..bytes).rev() {
            buf.push((value >> (i * 8)) as u8);
        }
    }

    fn read_uint(data: &[u8], offset: &mut usize, bytes: usize) -> CellResult<u64> {
        let chunk = data.get(*offset..*offset + bytes).ok_or(CellError::UnexpectedEof)?;
        *offset += bytes;
        Ok(chunk.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }
}

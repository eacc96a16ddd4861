//! Cell implementation for TON.
//!
//! A Cell is the fundamental data unit in TON, containing up to 1023 bits
//! of data and up to 4 references to other cells. Only ordinary cells are
//! modelled; their representation hash is computed once on construction.
//!
//! Reference: ton-blockchain/ton/crypto/vm/cells/DataCell.cpp

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{sha256, CellError, CellResult, MAX_CELL_BITS, MAX_CELL_DEPTH, MAX_CELL_REFS};

/// Hash size in bytes (SHA256).
pub const HASH_BYTES: usize = 32;

/// A TON Cell - the basic unit of data storage.
///
/// Children are held behind `Arc`, so a cell can only reference cells that
/// already existed when it was built. Shared subtrees are allowed, cycles
/// cannot be expressed.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Raw data bytes (may contain partial byte at the end).
    pub(crate) data: Vec<u8>,
    /// Number of bits stored in data.
    pub(crate) bit_len: usize,
    /// References to child cells.
    pub(crate) references: Vec<Arc<Cell>>,
    hash: [u8; HASH_BYTES],
    depth: u16,
}

/// Size of a cell tree, counting each distinct cell once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellStats {
    pub cells: usize,
    pub bits: usize,
}

impl Cell {
    /// Create a new cell. Called by `CellBuilder::build()` and the BoC parser,
    /// which have already enforced the bit and ref limits.
    pub(crate) fn new(data: Vec<u8>, bit_len: usize, references: Vec<Arc<Cell>>) -> CellResult<Self> {
        debug_assert!(bit_len <= MAX_CELL_BITS);
        debug_assert!(references.len() <= MAX_CELL_REFS);

        let depth = references
            .iter()
            .map(|r| r.depth + 1)
            .max()
            .unwrap_or(0);
        if depth as usize > MAX_CELL_DEPTH {
            return Err(CellError::DepthExceeded(MAX_CELL_DEPTH));
        }

        let mut cell = Cell {
            data,
            bit_len,
            references,
            hash: [0u8; HASH_BYTES],
            depth,
        };
        cell.hash = sha256(&cell.representation());
        Ok(cell)
    }

    /// Create an empty cell.
    pub fn empty() -> Self {
        let mut cell = Cell {
            data: Vec::new(),
            bit_len: 0,
            references: Vec::new(),
            hash: [0u8; HASH_BYTES],
            depth: 0,
        };
        cell.hash = sha256(&cell.representation());
        cell
    }

    /// Representation hashed into the cell hash:
    /// descriptors, data with completion tag, child depths, child hashes.
    fn representation(&self) -> Vec<u8> {
        let mut repr = Vec::with_capacity(2 + 128 + self.references.len() * (2 + HASH_BYTES));

        let (d1, d2) = self.descriptors();
        repr.push(d1);
        repr.push(d2);
        repr.extend_from_slice(&self.data_with_completion_tag());

        for reference in &self.references {
            repr.extend_from_slice(&reference.depth.to_be_bytes());
        }
        for reference in &self.references {
            repr.extend_from_slice(&reference.hash);
        }
        repr
    }

    /// The SHA256 representation hash identifying this cell and its subtree.
    pub fn hash(&self) -> [u8; HASH_BYTES] {
        self.hash
    }

    /// Depth of the tree below this cell (0 for a leaf).
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Descriptor bytes for an ordinary cell.
    ///
    /// d1 = refs_count, d2 = ceil(bit_len / 8) + floor(bit_len / 8)
    pub fn descriptors(&self) -> (u8, u8) {
        let d1 = self.references.len() as u8;
        let d2 = (self.bit_len.div_ceil(8) + self.bit_len / 8) as u8;
        (d1, d2)
    }

    /// Get data with completion tag.
    ///
    /// If bit_len is not byte-aligned, the bit after the last data bit is set.
    pub fn data_with_completion_tag(&self) -> Vec<u8> {
        let mut result = self.data[..self.bit_len.div_ceil(8)].to_vec();
        let remainder = self.bit_len % 8;
        if remainder != 0
            && let Some(last) = result.last_mut()
        {
            *last |= 1 << (7 - remainder);
        }
        result
    }

    /// Get the raw data bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the number of bits in this cell.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Get all references to child cells.
    pub fn references(&self) -> &[Arc<Cell>] {
        &self.references
    }

    /// Get a reference by index.
    pub fn reference(&self, index: usize) -> Option<&Arc<Cell>> {
        self.references.get(index)
    }

    /// Get the number of references.
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Get a specific bit from the cell data.
    pub fn get_bit(&self, index: usize) -> Option<bool> {
        if index >= self.bit_len {
            return None;
        }
        Some((self.data[index / 8] >> (7 - index % 8)) & 1 == 1)
    }

    /// Count this cell and all of its descendants, once per reference.
    pub fn count_cells(&self) -> CellResult<usize> {
        self.tree_stats().map(|s| s.cells)
    }

    /// Cells and data bits of the tree as encoded, so a child referenced
    /// twice is counted twice.
    ///
    /// Totals saturate instead of overflowing; subtrees are memoized by hash
    /// so heavily shared trees stay linear in their distinct cells.
    pub fn tree_stats(&self) -> CellResult<CellStats> {
        if self.depth as usize > MAX_CELL_DEPTH {
            return Err(CellError::DepthExceeded(MAX_CELL_DEPTH));
        }
        let mut memo = HashMap::new();
        Ok(self.tree_stats_memo(&mut memo))
    }

    fn tree_stats_memo(&self, memo: &mut HashMap<[u8; HASH_BYTES], CellStats>) -> CellStats {
        if let Some(stats) = memo.get(&self.hash) {
            return *stats;
        }
        let mut stats = CellStats {
            cells: 1,
            bits: self.bit_len,
        };
        for child in &self.references {
            let sub = child.tree_stats_memo(memo);
            stats.cells = stats.cells.saturating_add(sub.cells);
            stats.bits = stats.bits.saturating_add(sub.bits);
        }
        memo.insert(self.hash, stats);
        stats
    }

    /// Distinct cells and total data bits in this tree.
    ///
    /// Cells shared by several parents are counted once, as in a serialized
    /// BoC. Traversal is bounded by `MAX_CELL_DEPTH`.
    pub fn stats(&self) -> CellResult<CellStats> {
        let mut seen = HashSet::new();
        let mut stats = CellStats::default();
        let mut stack: Vec<(&Cell, usize)> = vec![(self, 0)];

        while let Some((cell, level)) = stack.pop() {
            if level > MAX_CELL_DEPTH {
                return Err(CellError::DepthExceeded(MAX_CELL_DEPTH));
            }
            if !seen.insert(cell.hash) {
                continue;
            }
            stats.cells += 1;
            stats.bits += cell.bit_len;
            for child in &cell.references {
                stack.push((child.as_ref(), level + 1));
            }
        }

        Ok(stats)
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

//! `HashmapE 256 ^Cell` dictionaries.
//!
//! TL-B:
//! ```text
//! hm_edge#_ {n:#} {X:Type} {l:#} {m:#} label:(HmLabel ~l n)
//!           {n = (~m) + l} node:(HashmapNode m X) = Hashmap n X;
//! hmn_leaf#_ {X:Type} value:X = HashmapNode 0 X;
//! hmn_fork#_ {n:#} {X:Type} left:^(Hashmap n X)
//!            right:^(Hashmap n X) = HashmapNode (n + 1) X;
//! hml_short$0 {m:#} {n:#} len:(Unary ~n) {n <= m} s:(n * Bit) = HmLabel ~n m;
//! hml_long$10 {m:#} n:(#<= m) s:(n * Bit) = HmLabel ~n m;
//! hml_same$11 {m:#} v:Bit n:(#<= m) = HmLabel ~n m;
//! hme_empty$0 {n:#} {X:Type} = HashmapE n X;
//! hme_root$1 {n:#} {X:Type} root:^(Hashmap n X) = HashmapE n X;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{Cell, CellBuilder, CellError, CellResult, CellSlice};

/// Key width of the dictionaries handled here.
pub const DICT_KEY_BITS: usize = 256;

/// A dictionary from 256-bit keys to cell references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: BTreeMap<[u8; 32], Arc<Cell>>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: [u8; 32], value: Arc<Cell>) -> Option<Arc<Cell>> {
        self.entries.insert(key, value)
    }

    pub fn get(&self, key: &[u8; 32]) -> Option<&Arc<Cell>> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8; 32], &Arc<Cell>)> {
        self.entries.iter()
    }

    /// Read a `HashmapE` (presence bit plus optional root reference).
    pub fn load(slice: &mut CellSlice) -> CellResult<Self> {
        match slice.load_maybe_ref()? {
            Some(root) => Self::from_root(root),
            None => Ok(Self::new()),
        }
    }

    /// Parse a non-empty `Hashmap 256` from its root cell.
    pub fn from_root(root: &Cell) -> CellResult<Self> {
        let mut dict = Self::new();
        let mut prefix = Vec::with_capacity(DICT_KEY_BITS);
        parse_node(root, &mut prefix, DICT_KEY_BITS, &mut dict.entries)?;
        Ok(dict)
    }

    /// Write this dictionary as a `HashmapE`.
    pub fn store(&self, builder: &mut CellBuilder) -> CellResult<()> {
        builder.store_maybe_ref(self.build_root()?)?;
        Ok(())
    }

    /// Build the root cell, or `None` for an empty dictionary.
    pub fn build_root(&self) -> CellResult<Option<Arc<Cell>>> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        let items: Vec<(Vec<bool>, &Arc<Cell>)> = self
            .entries
            .iter()
            .map(|(k, v)| (key_to_bits(k), v))
            .collect();
        build_node(&items, 0, DICT_KEY_BITS).map(|cell| Some(Arc::new(cell)))
    }
}

/// Bits needed for `#<= m`.
fn len_bits(m: usize) -> usize {
    (usize::BITS - m.leading_zeros()) as usize
}

fn key_to_bits(key: &[u8; 32]) -> Vec<bool> {
    key.iter()
        .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1))
        .collect()
}

fn bits_to_key(bits: &[bool]) -> [u8; 32] {
    let mut key = [0u8; 32];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            key[i / 8] |= 1 << (7 - i % 8);
        }
    }
    key
}

fn load_label(slice: &mut CellSlice, max_len: usize) -> CellResult<Vec<bool>> {
    let label = if !slice.load_bit()? {
        let mut len = 0;
        while slice.load_bit()? {
            len += 1;
            if len > max_len {
                return Err(CellError::InvalidDictionary(format!(
                    "unary label longer than {max_len}"
                )));
            }
        }
        slice.load_bits(len)?
    } else if !slice.load_bit()? {
        let len = slice.load_uint(len_bits(max_len))? as usize;
        slice.load_bits(len)?
    } else {
        let value = slice.load_bit()?;
        let len = slice.load_uint(len_bits(max_len))? as usize;
        vec![value; len]
    };

    if label.len() > max_len {
        return Err(CellError::InvalidDictionary(format!(
            "label of {} bits with {max_len} key bits left",
            label.len()
        )));
    }
    Ok(label)
}

fn parse_node(
    cell: &Cell,
    prefix: &mut Vec<bool>,
    remaining: usize,
    entries: &mut BTreeMap<[u8; 32], Arc<Cell>>,
) -> CellResult<()> {
    let mut slice = CellSlice::new(cell);
    let label = load_label(&mut slice, remaining)?;
    let start = prefix.len();
    let rest = remaining - label.len();
    prefix.extend_from_slice(&label);

    if rest == 0 {
        let value = slice.load_ref()?.clone();
        entries.insert(bits_to_key(prefix), value);
    } else {
        let left = slice.load_ref()?;
        let right = slice.load_ref()?;
        for (bit, child) in [(false, left), (true, right)] {
            prefix.push(bit);
            parse_node(child, prefix, rest - 1, entries)?;
            prefix.pop();
        }
    }

    prefix.truncate(start);
    Ok(())
}

fn store_label(builder: &mut CellBuilder, label: &[bool], max_len: usize) -> CellResult<()> {
    let n = label.len();
    let k = len_bits(max_len);
    let short_cost = 2 * n + 2;
    let long_cost = 2 + k + n;
    let same_cost = match label.first() {
        Some(&first) if label.iter().all(|&b| b == first) => Some(3 + k),
        _ => None,
    };

    if let Some(cost) = same_cost
        && cost < short_cost.min(long_cost)
    {
        builder.store_uint(0b11, 2)?;
        builder.store_bit(label[0])?;
        builder.store_uint(n as u64, k)?;
    } else if short_cost <= long_cost {
        builder.store_bit(false)?;
        for _ in 0..n {
            builder.store_bit(true)?;
        }
        builder.store_bit(false)?;
        builder.store_bits(label)?;
    } else {
        builder.store_uint(0b10, 2)?;
        builder.store_uint(n as u64, k)?;
        builder.store_bits(label)?;
    }
    Ok(())
}

/// Build the subtree for `items`, which are sorted and share the first `offset` key bits.
fn build_node(items: &[(Vec<bool>, &Arc<Cell>)], offset: usize, remaining: usize) -> CellResult<Cell> {
    let first = &items[0].0[offset..];
    let last = &items[items.len() - 1].0[offset..];
    let common = first
        .iter()
        .zip(last)
        .take_while(|(a, b)| a == b)
        .count()
        .min(remaining);

    let mut builder = CellBuilder::new();
    store_label(&mut builder, &first[..common], remaining)?;

    let rest = remaining - common;
    if rest == 0 {
        builder.store_ref(items[0].1.clone())?;
    } else {
        let split_at = offset + common;
        let pivot = items.partition_point(|(bits, _)| !bits[split_at]);
        let (left, right) = items.split_at(pivot);
        builder.store_ref(Arc::new(build_node(left, split_at + 1, rest - 1)?))?;
        builder.store_ref(Arc::new(build_node(right, split_at + 1, rest - 1)?))?;
    }

    builder.build()
}

//! Snake-format byte strings.
//!
//! A long byte string is stored as the data of a chain of cells, each
//! holding as many whole bytes as fit and pointing to the next through its
//! first reference.

use std::sync::Arc;

use crate::{Cell, CellBuilder, CellError, CellResult, CellSlice, MAX_CELL_BITS};

/// Whole bytes that fit into an empty cell.
pub const BYTES_PER_CELL: usize = MAX_CELL_BITS / 8;

/// Append `data` to `builder`, spilling whatever does not fit into a chain
/// of referenced cells.
pub fn store_snake_bytes(builder: &mut CellBuilder, data: &[u8]) -> CellResult<()> {
    let head_len = (builder.bits_left() / 8).min(data.len());
    let (head, tail) = data.split_at(head_len);

    if tail.is_empty() {
        builder.store_bytes(head)?;
        return Ok(());
    }
    if builder.refs_left() == 0 {
        return Err(CellError::RefOverflow(builder.ref_count() + 1));
    }

    let next = build_chain(tail)?;
    builder.store_bytes(head)?;
    builder.store_ref(next)?;
    Ok(())
}

fn build_chain(data: &[u8]) -> CellResult<Arc<Cell>> {
    let mut next: Option<Arc<Cell>> = None;
    for chunk in data.chunks(BYTES_PER_CELL).rev() {
        let mut builder = CellBuilder::new();
        builder.store_bytes(chunk)?;
        if let Some(child) = next.take() {
            builder.store_ref(child)?;
        }
        next = Some(Arc::new(builder.build()?));
    }
    next.ok_or_else(|| CellError::InvalidBitLength(0))
}

/// Build a standalone snake cell, optionally starting with a one-byte prefix.
pub fn snake_cell(prefix: Option<u8>, data: &[u8]) -> CellResult<Cell> {
    let mut builder = CellBuilder::new();
    if let Some(prefix) = prefix {
        builder.store_u8(prefix)?;
    }
    store_snake_bytes(&mut builder, data)?;
    builder.build()
}

/// Read the remaining bytes of `slice` and of every cell chained after it.
pub fn load_snake_bytes(slice: &mut CellSlice) -> CellResult<Vec<u8>> {
    let mut out = slice.load_remaining_bytes()?;
    let mut next = if slice.refs_left() > 0 {
        Some(slice.load_ref()?)
    } else {
        None
    };

    while let Some(cell) = next {
        let mut part = CellSlice::new(cell);
        out.extend_from_slice(&part.load_remaining_bytes()?);
        next = if part.refs_left() > 0 {
            Some(part.load_ref()?)
        } else {
            None
        };
    }

    Ok(out)
}

/// Read a snake string and decode it as UTF-8.
pub fn load_snake_string(slice: &mut CellSlice) -> CellResult<String> {
    let bytes = load_snake_bytes(slice)?;
    String::from_utf8(bytes).map_err(|e| CellError::InvalidUtf8(e.to_string()))
}

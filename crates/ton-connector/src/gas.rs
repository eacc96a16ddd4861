//! Fee estimation from message size.
//!
//! Forward fee follows the network formula:
//! `lump_price + ceil((bit_price * bits + cell_price * cells) / 2^16)`,
//! counting every cell of the message except the root, once per reference,
//! so a message that encodes more cells never costs less. Compute fee is a
//! fixed gas allowance for a wallet transfer.

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;
use ton_cell::{Cell, CellStats, MsgAddress};
use ton_wallet::Transfer;

/// Basechain fee parameters, in nanotons. Bit and cell prices are per 2^16.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub gas_units: u64,
    pub gas_price: u64,
    pub lump_price: u64,
    pub bit_price: u64,
    pub cell_price: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            gas_units: 4_000,
            gas_price: 400,
            lump_price: 400_000,
            bit_price: 26_214_400,
            cell_price: 2_621_440_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub gas_fee: u128,
    pub forward_fee: u128,
    pub total: u128,
}

#[derive(Debug, Clone, Default)]
pub struct GasEstimator {
    schedule: FeeSchedule,
}

impl GasEstimator {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    pub fn gas_fee(&self) -> u128 {
        self.schedule.gas_units as u128 * self.schedule.gas_price as u128
    }

    /// Forward fee for a message whose non-root cells total `stats`.
    pub fn forward_fee(&self, stats: CellStats) -> u128 {
        let s = &self.schedule;
        let size = s.bit_price as u128 * stats.bits as u128 + s.cell_price as u128 * stats.cells as u128;
        s.lump_price as u128 + size.div_ceil(1 << 16)
    }

    /// Estimate the cost of sending `amount` to `destination` with an
    /// optional body.
    ///
    /// Never fails: if the message cannot be built the fixed part of the
    /// schedule is returned and the reason logged.
    pub fn estimate(
        &self,
        destination: &MsgAddress,
        amount: u128,
        body: Option<&Arc<Cell>>,
    ) -> FeeEstimate {
        let mut transfer = Transfer::new(destination.clone(), amount);
        if let Some(body) = body {
            transfer = transfer.with_payload(body.clone());
        }

        let stats = transfer
            .to_internal_message()
            .and_then(|message| message.tree_stats().map(|all| without_root(all, &message)));
        let stats = match stats {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "fee estimate falls back to fixed schedule");
                CellStats::default()
            }
        };

        let gas_fee = self.gas_fee();
        let forward_fee = self.forward_fee(stats);
        FeeEstimate {
            gas_fee,
            forward_fee,
            total: gas_fee + forward_fee,
        }
    }
}

fn without_root(all: CellStats, root: &Cell) -> CellStats {
    CellStats {
        cells: all.cells.saturating_sub(1),
        bits: all.bits.saturating_sub(root.bit_len()),
    }
}

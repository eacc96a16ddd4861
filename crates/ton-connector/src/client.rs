//! Chain access seam.
//!
//! Everything the connector needs from the network goes through
//! [`ChainClient`]. [`crate::toncenter::ToncenterClient`] is the HTTP
//! implementation; tests substitute an in-memory chain.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use ton_cell::{Cell, CellSlice, MsgAddress};

use crate::error::{ConnectorError, ConnectorResult};

/// A TVM stack entry passed to or returned from a get method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackValue {
    Int(i128),
    Cell(Arc<Cell>),
    Slice(Arc<Cell>),
    Null,
}

impl StackValue {
    /// Address argument, passed as a slice holding `MsgAddress`.
    pub fn address(address: &MsgAddress) -> ConnectorResult<Self> {
        let mut builder = ton_cell::CellBuilder::new();
        builder.store_address(address)?;
        Ok(StackValue::Slice(Arc::new(builder.build()?)))
    }
}

/// Outcome of a get-method execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMethodResult {
    pub exit_code: i32,
    pub stack: Vec<StackValue>,
}

impl GetMethodResult {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 || self.exit_code == 1
    }

    /// Fail unless the method exited normally.
    pub fn ensure_success(&self, method: &str) -> ConnectorResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(ConnectorError::Rpc(format!(
                "get method {method} exited with code {}",
                self.exit_code
            )))
        }
    }

    fn entry(&self, index: usize) -> ConnectorResult<&StackValue> {
        self.stack.get(index).ok_or_else(|| {
            ConnectorError::UnexpectedStack(format!(
                "entry {index} missing, stack has {}",
                self.stack.len()
            ))
        })
    }

    pub fn int(&self, index: usize) -> ConnectorResult<i128> {
        match self.entry(index)? {
            StackValue::Int(v) => Ok(*v),
            other => Err(unexpected(index, "int", other)),
        }
    }

    /// Non-negative integer, as used for balances and supplies.
    pub fn uint(&self, index: usize) -> ConnectorResult<u128> {
        let value = self.int(index)?;
        u128::try_from(value).map_err(|_| {
            ConnectorError::UnexpectedStack(format!("entry {index} is negative: {value}"))
        })
    }

    /// Cell or slice entry.
    pub fn cell(&self, index: usize) -> ConnectorResult<&Arc<Cell>> {
        match self.entry(index)? {
            StackValue::Cell(c) | StackValue::Slice(c) => Ok(c),
            other => Err(unexpected(index, "cell", other)),
        }
    }

    /// Slice entry holding an address.
    pub fn address(&self, index: usize) -> ConnectorResult<MsgAddress> {
        let cell = self.cell(index)?;
        Ok(CellSlice::new(cell).load_address()?)
    }
}

fn unexpected(index: usize, want: &str, got: &StackValue) -> ConnectorError {
    let got = match got {
        StackValue::Int(_) => "int",
        StackValue::Cell(_) => "cell",
        StackValue::Slice(_) => "slice",
        StackValue::Null => "null",
    };
    ConnectorError::UnexpectedStack(format!("entry {index}: expected {want}, got {got}"))
}

/// What the connector reads back from an account's transaction list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSummary {
    /// Transaction hash.
    pub hash: [u8; 32],
    pub lt: u64,
    pub utime: u64,
    /// Hash of the inbound message, when the node reports it.
    pub in_msg_hash: Option<[u8; 32]>,
    /// Total fees in nanotons.
    pub fee: u128,
    /// Value carried by the inbound message in nanotons.
    pub value: u128,
    /// Compute/action phase outcome, when the node reports it.
    pub success: Option<bool>,
}

/// Read and submit access to a TON node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Balance of `address` in nanotons. Unknown accounts have zero.
    async fn get_balance(&self, address: &MsgAddress) -> ConnectorResult<u128>;

    /// Newest-first transactions of `address`, at most `limit`.
    async fn get_transactions(
        &self,
        address: &MsgAddress,
        limit: usize,
    ) -> ConnectorResult<Vec<TransactionSummary>>;

    /// Execute a get method against the latest state.
    async fn run_get_method(
        &self,
        address: &MsgAddress,
        method: &str,
        stack: &[StackValue],
    ) -> ConnectorResult<GetMethodResult>;

    /// Broadcast a serialized external message.
    async fn send_boc(&self, boc: &[u8]) -> ConnectorResult<()>;

    /// Current wallet seqno. Undeployed wallets report zero.
    async fn get_seqno(&self, address: &MsgAddress) -> ConnectorResult<u32> {
        let result = self.run_get_method(address, "seqno", &[]).await?;
        if !result.is_success() {
            debug!(address = %address, exit_code = result.exit_code, "seqno unavailable, assuming undeployed");
            return Ok(0);
        }
        let seqno = result.int(0)?;
        u32::try_from(seqno)
            .map_err(|_| ConnectorError::UnexpectedStack(format!("seqno out of range: {seqno}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ton_cell::CellBuilder;

    fn addr() -> MsgAddress {
        MsgAddress::Internal {
            workchain: 0,
            address: [0x11; 32],
        }
    }

    #[test]
    fn test_stack_accessors() {
        let result = GetMethodResult {
            exit_code: 0,
            stack: vec![
                StackValue::Int(42),
                StackValue::address(&addr()).unwrap(),
                StackValue::Int(-1),
                StackValue::Null,
            ],
        };

        assert_eq!(result.uint(0).unwrap(), 42);
        assert_eq!(result.address(1).unwrap(), addr());
        assert_eq!(result.int(2).unwrap(), -1);
        assert!(matches!(result.uint(2), Err(ConnectorError::UnexpectedStack(_))));
        assert!(matches!(result.cell(3), Err(ConnectorError::UnexpectedStack(_))));
        assert!(matches!(result.int(9), Err(ConnectorError::UnexpectedStack(_))));
    }

    #[test]
    fn test_exit_codes() {
        let ok = GetMethodResult { exit_code: 1, stack: vec![] };
        assert!(ok.ensure_success("seqno").is_ok());

        let failed = GetMethodResult { exit_code: -13, stack: vec![] };
        assert!(matches!(failed.ensure_success("seqno"), Err(ConnectorError::Rpc(_))));
    }

    struct FixedSeqno(GetMethodResult);

    #[async_trait]
    impl ChainClient for FixedSeqno {
        async fn get_balance(&self, _: &MsgAddress) -> ConnectorResult<u128> {
            Ok(0)
        }
        async fn get_transactions(&self, _: &MsgAddress, _: usize) -> ConnectorResult<Vec<TransactionSummary>> {
            Ok(vec![])
        }
        async fn run_get_method(&self, _: &MsgAddress, _: &str, _: &[StackValue]) -> ConnectorResult<GetMethodResult> {
            Ok(self.0.clone())
        }
        async fn send_boc(&self, _: &[u8]) -> ConnectorResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_seqno() {
        let deployed = FixedSeqno(GetMethodResult { exit_code: 0, stack: vec![StackValue::Int(7)] });
        assert_eq!(deployed.get_seqno(&addr()).await.unwrap(), 7);

        let undeployed = FixedSeqno(GetMethodResult { exit_code: -13, stack: vec![] });
        assert_eq!(undeployed.get_seqno(&addr()).await.unwrap(), 0);

        let mut b = CellBuilder::new();
        b.store_u8(1).unwrap();
        let wrong = FixedSeqno(GetMethodResult {
            exit_code: 0,
            stack: vec![StackValue::Cell(Arc::new(b.build().unwrap()))],
        });
        assert!(wrong.get_seqno(&addr()).await.is_err());
    }
}

//! Confirmation polling.
//!
//! A submitted message is confirmed when the wallet seqno moves past the one
//! it was signed with. The poller then looks for the transaction that
//! consumed the message so the caller gets a real transaction hash.

use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ton_cell::MsgAddress;

use crate::client::{ChainClient, TransactionSummary};
use crate::config::ConfirmationConfig;
use crate::error::{ConnectorError, ConnectorResult};

/// How the reported hash was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HashSource {
    /// Transaction whose inbound message is the one we submitted.
    Matched,
    /// Newest wallet transaction; no inbound hash matched.
    MostRecent,
    /// Hash of the submitted message; the wallet had no visible transactions.
    MessageHash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub hash: [u8; 32],
    pub source: HashSource,
    /// Seqno observed after the advance.
    pub seqno: u32,
    pub attempts: u32,
    pub transaction: Option<TransactionSummary>,
}

impl Confirmation {
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmationPoller {
    interval: Duration,
    max_attempts: u32,
    history_depth: usize,
}

impl ConfirmationPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            history_depth: 10,
        }
    }

    pub fn from_config(config: &ConfirmationConfig) -> Self {
        Self::new(config.poll_interval(), config.max_attempts)
            .with_history_depth(config.history_depth)
    }

    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth.max(1);
        self
    }

    /// Upper bound on time spent waiting, excluding RPC latency.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }

    /// Wait until the seqno of `wallet` exceeds `seqno`.
    ///
    /// Checks once per interval, the first check one interval after the call.
    /// Failed checks count as attempts. Returns `ConfirmationTimeout` after
    /// `max_attempts` checks and `Cancelled` as soon as `cancel` fires.
    pub async fn wait(
        &self,
        client: &dyn ChainClient,
        wallet: &MsgAddress,
        seqno: u32,
        message_hash: [u8; 32],
        cancel: &CancellationToken,
    ) -> ConnectorResult<Confirmation> {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for attempt in 1..=self.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ConnectorError::Cancelled),
                _ = ticker.tick() => {}
            }

            let current = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ConnectorError::Cancelled),
                current = client.get_seqno(wallet) => current,
            };

            match current {
                Ok(current) if current > seqno => {
                    info!(address = %wallet, seqno, current, attempt, "Seqno advanced");
                    return Ok(self
                        .correlate(client, wallet, message_hash, current, attempt)
                        .await);
                }
                Ok(current) => {
                    debug!(address = %wallet, seqno, current, attempt, "Seqno not advanced yet");
                }
                Err(e) => {
                    warn!(address = %wallet, attempt, error = %e, "Seqno check failed");
                }
            }
        }

        warn!(address = %wallet, seqno, attempts = self.max_attempts, "Confirmation timed out");
        Err(ConnectorError::ConfirmationTimeout {
            seqno,
            attempts: self.max_attempts,
        })
    }

    async fn correlate(
        &self,
        client: &dyn ChainClient,
        wallet: &MsgAddress,
        message_hash: [u8; 32],
        seqno: u32,
        attempts: u32,
    ) -> Confirmation {
        let history = client
            .get_transactions(wallet, self.history_depth)
            .await
            .unwrap_or_else(|e| {
                warn!(address = %wallet, error = %e, "Transaction history unavailable");
                Vec::new()
            });

        let matched = history
            .iter()
            .find(|tx| tx.in_msg_hash == Some(message_hash))
            .map(|tx| (tx, HashSource::Matched));
        let (hash, source, transaction) = match matched.or_else(|| history.first().map(|tx| (tx, HashSource::MostRecent))) {
            Some((tx, source)) => {
                if source == HashSource::MostRecent {
                    warn!(address = %wallet, "No transaction matches the submitted message, reporting the most recent");
                }
                (tx.hash, source, Some(tx.clone()))
            }
            None => {
                warn!(address = %wallet, "No wallet transactions visible, reporting the message hash");
                (message_hash, HashSource::MessageHash, None)
            }
        };

        Confirmation {
            hash,
            source,
            seqno,
            attempts,
            transaction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{GetMethodResult, StackValue};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed sequence of seqno answers, repeating the last one.
    struct ScriptedChain {
        seqnos: Mutex<VecDeque<Option<u32>>>,
        history: Vec<TransactionSummary>,
    }

    impl ScriptedChain {
        fn new(seqnos: &[Option<u32>], history: Vec<TransactionSummary>) -> Self {
            Self {
                seqnos: Mutex::new(seqnos.iter().copied().collect()),
                history,
            }
        }
    }

    #[async_trait]
    impl ChainClient for ScriptedChain {
        async fn get_balance(&self, _: &MsgAddress) -> ConnectorResult<u128> {
            Ok(0)
        }

        async fn get_transactions(&self, _: &MsgAddress, limit: usize) -> ConnectorResult<Vec<TransactionSummary>> {
            Ok(self.history.iter().take(limit).cloned().collect())
        }

        async fn run_get_method(&self, _: &MsgAddress, _: &str, _: &[StackValue]) -> ConnectorResult<GetMethodResult> {
            let mut seqnos = self.seqnos.lock().unwrap();
            let next = if seqnos.len() > 1 {
                seqnos.pop_front().flatten()
            } else {
                seqnos.front().copied().flatten()
            };
            match next {
                Some(seqno) => Ok(GetMethodResult {
                    exit_code: 0,
                    stack: vec![StackValue::Int(seqno as i128)],
                }),
                None => Err(ConnectorError::Rpc("unavailable".into())),
            }
        }

        async fn send_boc(&self, _: &[u8]) -> ConnectorResult<()> {
            Ok(())
        }
    }

    fn wallet() -> MsgAddress {
        MsgAddress::Internal {
            workchain: 0,
            address: [0x44; 32],
        }
    }

    fn tx(hash: u8, in_msg: Option<u8>) -> TransactionSummary {
        TransactionSummary {
            hash: [hash; 32],
            lt: hash as u64,
            utime: 1_700_000_000,
            in_msg_hash: in_msg.map(|h| [h; 32]),
            fee: 1_000,
            value: 0,
            success: Some(true),
        }
    }

    fn poller() -> ConfirmationPoller {
        ConfirmationPoller::new(Duration::from_secs(2), 5)
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirms_with_matching_hash() {
        let chain = ScriptedChain::new(
            &[Some(3), Some(3), Some(4)],
            vec![tx(0xA1, Some(0x99)), tx(0xB2, Some(0x77))],
        );
        let start = Instant::now();
        let confirmation = poller()
            .wait(&chain, &wallet(), 3, [0x77; 32], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(confirmation.source, HashSource::Matched);
        assert_eq!(confirmation.hash, [0xB2; 32]);
        assert_eq!(confirmation.seqno, 4);
        assert_eq!(confirmation.attempts, 3);
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_max_attempts() {
        let chain = ScriptedChain::new(&[Some(3)], vec![]);
        let poller = poller();
        let start = Instant::now();
        let err = poller
            .wait(&chain, &wallet(), 3, [0; 32], &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ConnectorError::ConfirmationTimeout { seqno: 3, attempts: 5 }
        ));
        assert_eq!(start.elapsed(), poller.max_wait());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_checks_count_as_attempts() {
        let chain = ScriptedChain::new(&[None, None, Some(1)], vec![tx(0x10, None)]);
        let confirmation = poller()
            .wait(&chain, &wallet(), 0, [0x55; 32], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(confirmation.attempts, 3);
        assert_eq!(confirmation.source, HashSource::MostRecent);
        assert_eq!(confirmation.hash, [0x10; 32]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_history_reports_message_hash() {
        let chain = ScriptedChain::new(&[Some(1)], vec![]);
        let confirmation = poller()
            .wait(&chain, &wallet(), 0, [0x55; 32], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(confirmation.source, HashSource::MessageHash);
        assert_eq!(confirmation.hash_hex(), "55".repeat(32));
        assert!(confirmation.transaction.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_polling() {
        let chain = ScriptedChain::new(&[Some(0)], vec![]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = poller()
            .wait(&chain, &wallet(), 0, [0; 32], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Cancelled));
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }
}

//! End-to-end connector flows against an in-memory chain.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use ton_cell::{BagOfCells, Cell, CellBuilder, CellSlice, MsgAddress};
use ton_connector::{
    ChainClient, ConnectorConfig, ConnectorError, ConnectorResult, ContractCallResult,
    GetMethodResult, HashSource, MethodCall, MethodCallParam, MnemonicFailure, StackValue,
    TonConnector, TransactionIntent, TransactionStatus, TransactionSummary, computed_opcode,
};
use ton_jetton::{OP_BURN, OP_TRANSFER, build_onchain_content};
use ton_wallet::WALLET_V4R2_CODE_BOC;
use ton_wallet::message::state_init;

const PHRASE: &str = "acid absurd across accident about acquire acid across access absent access about accident account about above acid across abuse access account across acquire absent";

#[derive(Default)]
struct ChainState {
    seqno: u32,
    frozen: bool,
    sent: Vec<Arc<Cell>>,
    /// Newest first.
    transactions: Vec<TransactionSummary>,
    get_methods: HashMap<(String, String), GetMethodResult>,
}

/// Accepts every message. Each accepted message bumps the seqno and shows
/// up as a wallet transaction whose inbound hash is the message hash,
/// unless the chain is frozen.
#[derive(Default)]
struct MockChain {
    state: Mutex<ChainState>,
    calls: AtomicUsize,
}

impl MockChain {
    fn frozen() -> Self {
        let chain = Self::default();
        chain.state.lock().unwrap().frozen = true;
        chain
    }

    fn script(&self, address: &MsgAddress, method: &str, stack: Vec<StackValue>) {
        self.state.lock().unwrap().get_methods.insert(
            (address.to_raw_string(), method.to_string()),
            GetMethodResult {
                exit_code: 0,
                stack,
            },
        );
    }

    fn sent(&self) -> Vec<Arc<Cell>> {
        self.state.lock().unwrap().sent.clone()
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_balance(&self, _: &MsgAddress) -> ConnectorResult<u128> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(3_500_000_000)
    }

    async fn get_transactions(
        &self,
        _: &MsgAddress,
        limit: usize,
    ) -> ConnectorResult<Vec<TransactionSummary>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(state.transactions.iter().take(limit).cloned().collect())
    }

    async fn run_get_method(
        &self,
        address: &MsgAddress,
        method: &str,
        _: &[StackValue],
    ) -> ConnectorResult<GetMethodResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if method == "seqno" {
            return Ok(GetMethodResult {
                exit_code: 0,
                stack: vec![StackValue::Int(state.seqno as i128)],
            });
        }
        Ok(state
            .get_methods
            .get(&(address.to_raw_string(), method.to_string()))
            .cloned()
            .unwrap_or(GetMethodResult {
                exit_code: -13,
                stack: Vec::new(),
            }))
    }

    async fn send_boc(&self, boc: &[u8]) -> ConnectorResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let root = BagOfCells::deserialize(boc)
            .and_then(|b| b.single_root().cloned())
            .map_err(|e| ConnectorError::Rpc(e.to_string()))?;

        let mut state = self.state.lock().unwrap();
        state.sent.push(root.clone());
        if !state.frozen {
            state.seqno += 1;
            let n = state.seqno;
            state.transactions.insert(
                0,
                TransactionSummary {
                    hash: [n as u8; 32],
                    lt: n as u64 * 1000,
                    utime: 1_700_000_000 + n as u64,
                    in_msg_hash: Some(root.hash()),
                    fee: 2_000_000,
                    value: 0,
                    success: Some(true),
                },
            );
        }
        Ok(())
    }
}

fn code_boc() -> String {
    let mut builder = CellBuilder::new();
    builder.store_u32(0xFF00F4A4).unwrap();
    builder.store_u32(0x13F4BCA2).unwrap();
    BagOfCells::from_root(builder.build().unwrap())
        .serialize_to_hex()
        .unwrap()
}

fn config() -> ConnectorConfig {
    let mut config = ConnectorConfig::default();
    config.wallet.code_boc = Some(code_boc());
    config.wallet.strict_mnemonic = false;
    config.confirmation.poll_interval_ms = 2000;
    config.confirmation.max_attempts = 5;
    config
}

fn addr(byte: u8) -> MsgAddress {
    MsgAddress::Internal {
        workchain: 0,
        address: [byte; 32],
    }
}

async fn connector(chain: Arc<MockChain>) -> TonConnector {
    let connector = TonConnector::new(config(), chain).unwrap();
    connector.initialize(Some(PHRASE)).await.unwrap();
    connector
}

/// Cells of the tree under `root`, depth first.
fn walk(root: &Arc<Cell>) -> Vec<Arc<Cell>> {
    let mut out = vec![root.clone()];
    for child in root.references() {
        out.extend(walk(child));
    }
    out
}

/// The first cell under `root` starting with `op`.
fn find_body(root: &Arc<Cell>, op: u32) -> Option<Arc<Cell>> {
    walk(root).into_iter().find(|cell| {
        cell.bit_len() >= 96 && CellSlice::new(cell).load_u32().ok() == Some(op)
    })
}

#[tokio::test]
async fn test_short_mnemonic_rejected_without_network() {
    let chain = Arc::new(MockChain::default());
    let connector = TonConnector::new(config(), chain.clone()).unwrap();

    let eleven: Vec<&str> = PHRASE.split_whitespace().take(11).collect();
    let err = connector.initialize(Some(&eleven.join(" "))).await.unwrap_err();
    assert!(matches!(
        err,
        ConnectorError::InvalidMnemonic(MnemonicFailure::WordCount(11))
    ));

    assert!(matches!(
        connector.initialize(Some("   ")).await,
        Err(ConnectorError::MnemonicRequired)
    ));
    assert_eq!(chain.calls(), 0);
    assert!(connector.wallet_info().await.is_none());
}

#[tokio::test]
async fn test_default_wallet_code_is_published_v4r2() {
    let mut published = config();
    published.wallet.code_boc = None;
    let connector = TonConnector::new(published.clone(), Arc::new(MockChain::default())).unwrap();
    let info = connector.initialize(Some(PHRASE)).await.unwrap();
    assert_eq!(info.version, "v4r2");

    published.wallet.code_boc = Some(WALLET_V4R2_CODE_BOC.to_string());
    let explicit = TonConnector::new(published, Arc::new(MockChain::default())).unwrap();
    assert_eq!(explicit.initialize(Some(PHRASE)).await.unwrap().raw_address, info.raw_address);

    let custom = TonConnector::new(config(), Arc::new(MockChain::default())).unwrap();
    assert_ne!(custom.initialize(Some(PHRASE)).await.unwrap().raw_address, info.raw_address);

    assert!(matches!(
        connector.initialize(Some("acid absurd")).await,
        Err(ConnectorError::InvalidMnemonic(MnemonicFailure::WordCount(2)))
    ));
}

#[tokio::test]
async fn test_send_before_initialize() {
    let chain = Arc::new(MockChain::default());
    let connector = TonConnector::new(config(), chain.clone()).unwrap();

    let err = connector
        .send(TransactionIntent::new(addr(1), 1_000))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::WalletNotInitialized));
    assert!(matches!(
        connector.get_balance(None).await,
        Err(ConnectorError::WalletNotInitialized)
    ));
    assert_eq!(chain.calls(), 0);
}

#[tokio::test]
async fn test_initialize_reports_wallet() {
    let connector = connector(Arc::new(MockChain::default())).await;
    let info = connector.wallet_info().await.unwrap();

    assert_eq!(info.version, "v4r2");
    assert_eq!(info.workchain, 0);
    assert_eq!(info.subwallet_id, 698983191);
    assert_eq!(info.public_key.len(), 64);
    assert!(info.raw_address.starts_with("0:"));
    assert!(info.address.starts_with("UQ"));
}

#[tokio::test(start_paused = true)]
async fn test_first_send_confirms_and_deploys_wallet() {
    let chain = Arc::new(MockChain::default());
    let connector = connector(chain.clone()).await;

    let started = Instant::now();
    let result = connector
        .send(TransactionIntent::new(addr(7), 1_500_000_000).with_comment("hi").unwrap())
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(2));
    assert_eq!(result.status, TransactionStatus::Success);
    assert_eq!(result.hash_source, Some(HashSource::Matched));
    assert_eq!(result.hash, hex::encode([1u8; 32]));
    assert_eq!(result.seqno, 0);
    assert_eq!(result.amount, 1_500_000_000);
    assert_eq!(result.fee, Some(2_000_000));

    // Seqno 0: StateInit and body both referenced from the external message.
    let sent = chain.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].reference_count(), 2);
    assert!(find_body(&sent[0], 0).is_some());

    let second = connector
        .send(TransactionIntent::new(addr(7), 1))
        .await
        .unwrap();
    assert_eq!(second.seqno, 1);
    assert_eq!(chain.sent()[1].reference_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unconfirmed_send_times_out() {
    let chain = Arc::new(MockChain::frozen());
    let connector = connector(chain.clone()).await;

    let started = Instant::now();
    let err = connector
        .send(TransactionIntent::new(addr(7), 1))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(matches!(
        err,
        ConnectorError::ConfirmationTimeout {
            seqno: 0,
            attempts: 5
        }
    ));
    assert_eq!(started.elapsed(), Duration::from_secs(10));
    assert_eq!(chain.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_waiting() {
    let chain = Arc::new(MockChain::frozen());
    let connector = connector(chain).await;
    let token = connector.cancellation_token();

    let started = Instant::now();
    let (result, _) = tokio::join!(connector.send(TransactionIntent::new(addr(7), 1)), async {
        tokio::time::sleep(Duration::from_millis(4500)).await;
        token.cancel();
    });

    assert!(matches!(result, Err(ConnectorError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_no_wait_returns_pending() {
    let chain = Arc::new(MockChain::frozen());
    let mut config = config();
    config.confirmation.wait = false;
    let connector = TonConnector::new(config, chain.clone()).unwrap();
    connector.initialize(Some(PHRASE)).await.unwrap();

    let result = connector
        .send(TransactionIntent::new(addr(7), 42))
        .await
        .unwrap();
    assert_eq!(result.status, TransactionStatus::Pending);
    assert_eq!(result.hash, hex::encode(chain.sent()[0].hash()));
    assert!(result.hash_source.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_sends_use_distinct_seqnos() {
    let chain = Arc::new(MockChain::default());
    let connector = connector(chain.clone()).await;

    let (a, b) = tokio::join!(
        connector.send(TransactionIntent::new(addr(1), 10)),
        connector.send(TransactionIntent::new(addr(2), 20)),
    );
    let mut seqnos = [a.unwrap().seqno, b.unwrap().seqno];
    seqnos.sort();
    assert_eq!(seqnos, [0, 1]);
    assert_eq!(chain.sent().len(), 2);
}

#[tokio::test]
async fn test_read_only_call_needs_no_wallet() {
    let chain = Arc::new(MockChain::default());
    let connector = TonConnector::new(config(), chain.clone()).unwrap();
    chain.script(&addr(9), "get_counter", vec![StackValue::Int(17)]);

    let result = connector
        .call_method(MethodCall::new(addr(9), "get_counter"))
        .await
        .unwrap();
    match result {
        ContractCallResult::ReadOnly(stack) => assert_eq!(stack.int(0).unwrap(), 17),
        other => panic!("expected read-only result, got {other:?}"),
    }
    assert!(chain.sent().is_empty());

    let err = connector
        .call_method(MethodCall::new(addr(9), "increment").with_amount(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::WalletNotInitialized));
}

#[tokio::test(start_paused = true)]
async fn test_call_with_params_sends_crc_opcode() {
    let chain = Arc::new(MockChain::default());
    let connector = connector(chain.clone()).await;

    let call = MethodCall::new(addr(9), "increment")
        .with_params(vec![MethodCallParam::Uint { value: 5, bits: 32 }]);
    let result = connector.call_method(call).await.unwrap();
    assert!(matches!(result, ContractCallResult::Submitted(_)));

    let body = find_body(&chain.sent()[0], computed_opcode("increment")).unwrap();
    let mut slice = CellSlice::new(&body);
    slice.skip_bits(32 + 64).unwrap();
    assert_eq!(slice.load_u32().unwrap(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_deploy_address_is_state_init_hash() {
    let chain = Arc::new(MockChain::default());
    let connector = connector(chain.clone()).await;

    let code = Arc::new(Cell::empty());
    let mut data = CellBuilder::new();
    data.store_u64(0xC0FFEE).unwrap();
    let data = Arc::new(data.build().unwrap());
    let expected = state_init(code.clone(), data.clone()).unwrap().hash();

    let deployed = connector
        .deploy(code, data, 50_000_000)
        .await
        .unwrap();
    assert_eq!(deployed.raw_address, format!("0:{}", hex::encode(expected)));
    assert_eq!(deployed.transaction.status, TransactionStatus::Success);
    assert!(walk(&chain.sent()[0]).iter().any(|c| c.hash() == expected));
}

#[tokio::test(start_paused = true)]
async fn test_jetton_balance_and_transfer() {
    let chain = Arc::new(MockChain::default());
    let connector = connector(chain.clone()).await;
    let owner = MsgAddress::from_string(&connector.wallet_info().await.unwrap().raw_address).unwrap();
    let (master, jetton_wallet) = (addr(0xA1), addr(0xB2));

    let content = Arc::new(build_onchain_content(&[("symbol", "TST"), ("decimals", "6")]).unwrap());
    chain.script(
        &master,
        "get_jetton_data",
        vec![
            StackValue::Int(1_000_000_000),
            StackValue::Int(-1),
            StackValue::address(&addr(0xCC)).unwrap(),
            StackValue::Cell(content),
            StackValue::Cell(Arc::new(Cell::empty())),
        ],
    );
    chain.script(
        &master,
        "get_wallet_address",
        vec![StackValue::address(&jetton_wallet).unwrap()],
    );
    chain.script(
        &jetton_wallet,
        "get_wallet_data",
        vec![
            StackValue::Int(2_500_000),
            StackValue::address(&owner).unwrap(),
            StackValue::address(&master).unwrap(),
            StackValue::Cell(Arc::new(Cell::empty())),
        ],
    );

    let balance = connector
        .get_jetton_balance(&master.to_raw_string(), None)
        .await
        .unwrap();
    assert_eq!(balance.balance, 2_500_000);
    assert_eq!(balance.decimals, 6);
    assert_eq!(balance.formatted, "2.5");
    assert_eq!(balance.symbol, "TST");

    connector
        .send_jetton(&master.to_raw_string(), &addr(0x33).to_raw_string(), "1.25", None)
        .await
        .unwrap();
    let body = find_body(&chain.sent()[0], OP_TRANSFER).unwrap();
    let mut slice = CellSlice::new(&body);
    slice.skip_bits(32 + 64).unwrap();
    assert_eq!(slice.load_coins().unwrap(), 1_250_000);
    assert_eq!(slice.load_address().unwrap(), addr(0x33));
    assert_eq!(slice.load_address().unwrap(), owner);
}

#[tokio::test(start_paused = true)]
async fn test_burn_jetton() {
    let chain = Arc::new(MockChain::default());
    let connector = connector(chain.clone()).await;
    let owner = MsgAddress::from_string(&connector.wallet_info().await.unwrap().raw_address).unwrap();
    let (master, jetton_wallet) = (addr(0xA1), addr(0xB2));

    let content = Arc::new(build_onchain_content(&[("symbol", "TST"), ("decimals", "3")]).unwrap());
    chain.script(
        &master,
        "get_jetton_data",
        vec![
            StackValue::Int(1_000_000),
            StackValue::Int(-1),
            StackValue::address(&addr(0xCC)).unwrap(),
            StackValue::Cell(content),
            StackValue::Cell(Arc::new(Cell::empty())),
        ],
    );
    chain.script(
        &master,
        "get_wallet_address",
        vec![StackValue::address(&jetton_wallet).unwrap()],
    );

    let result = connector.burn_jetton(&master.to_raw_string(), "7.5").await.unwrap();
    assert_eq!(result.status, TransactionStatus::Success);

    let sent = chain.sent();
    assert_eq!(sent.len(), 1);
    assert!(find_body(&sent[0], OP_TRANSFER).is_none());
    let body = find_body(&sent[0], OP_BURN).unwrap();
    let mut slice = CellSlice::new(&body);
    slice.skip_bits(32 + 64).unwrap();
    assert_eq!(slice.load_coins().unwrap(), 7_500);
    assert_eq!(slice.load_address().unwrap(), owner);
}

#[tokio::test]
async fn test_undeployed_jetton_wallet_has_zero_balance() {
    let chain = Arc::new(MockChain::default());
    let connector = TonConnector::new(config(), chain.clone()).unwrap();
    let master = addr(0xA1);
    chain.script(
        &master,
        "get_wallet_address",
        vec![StackValue::address(&addr(0xB3)).unwrap()],
    );

    let balance = connector
        .get_jetton_balance(&master.to_raw_string(), Some(&addr(0x44).to_raw_string()))
        .await
        .unwrap();
    assert_eq!(balance.balance, 0);
    assert_eq!(balance.decimals, 9);
    assert_eq!(balance.formatted, "0");
}

#[tokio::test]
async fn test_balance_and_fee_estimate() {
    let connector = TonConnector::new(config(), Arc::new(MockChain::default())).unwrap();

    let balance = connector
        .get_balance(Some(&addr(5).to_raw_string()))
        .await
        .unwrap();
    assert_eq!(balance.nanotons, 3_500_000_000);
    assert_eq!(balance.ton, "3.5");
    assert!(matches!(
        connector.get_balance(Some("nope")).await,
        Err(ConnectorError::InvalidAddress(_))
    ));

    let estimate = connector
        .estimate_fee(&addr(5).to_raw_string(), "1", None)
        .unwrap();
    assert_eq!(estimate.total, estimate.gas_fee + estimate.forward_fee);
    assert!(estimate.gas_fee > 0);
}

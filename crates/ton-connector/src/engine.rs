//! The connector: wallet state, sends, contract calls and chain queries.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ton_cell::{BagOfCells, Cell, MsgAddress};
use ton_jetton::{JettonMetadata, MetadataDecoder, create_burn_body, create_transfer_body};
use ton_wallet::message::{contract_address, state_init};
use ton_wallet::{KeyManager, Transfer, Wallet, WalletV4R2, build_comment};
use zeroize::Zeroizing;

use crate::amount::{format_amount, format_ton, parse_amount, parse_ton};
use crate::client::{ChainClient, GetMethodResult, StackValue};
use crate::config::ConnectorConfig;
use crate::error::{ConnectorError, ConnectorResult};
use crate::gas::{FeeEstimate, GasEstimator};
use crate::jetton::{jetton_data_from_stack, jetton_wallet_from_stack};
use crate::method_call::{MethodCallEncoder, MethodCallParam};
use crate::nft::{NftInfo, create_nft_transfer_body};
use crate::poller::{Confirmation, ConfirmationPoller, HashSource};
use crate::query_id::QueryIdSource;
use crate::toncenter::ToncenterClient;

/// Environment variable read by [`TonConnector::initialize_from_env`].
pub const MNEMONIC_ENV: &str = "TON_MNEMONIC";

/// Parse an address, reporting any failure as `InvalidAddress`.
pub fn parse_address(address: &str) -> ConnectorResult<MsgAddress> {
    MsgAddress::from_string(address)
        .map_err(|e| ConnectorError::InvalidAddress(format!("{address:?}: {e}")))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionResult {
    /// Lowercase hex. For pending results this is the external message hash.
    pub hash: String,
    pub status: TransactionStatus,
    /// Nanotons sent.
    pub amount: u128,
    pub fee: Option<u128>,
    /// Unix seconds.
    pub timestamp: u64,
    /// Seqno the message was signed with.
    pub seqno: u32,
    pub hash_source: Option<HashSource>,
}

impl TransactionResult {
    fn pending(message_hash: [u8; 32], amount: u128, seqno: u32) -> Self {
        Self {
            hash: hex::encode(message_hash),
            status: TransactionStatus::Pending,
            amount,
            fee: None,
            timestamp: unix_now(),
            seqno,
            hash_source: None,
        }
    }

    fn confirmed(confirmation: Confirmation, amount: u128, seqno: u32) -> Self {
        let status = match confirmation.transaction.as_ref().and_then(|tx| tx.success) {
            Some(false) => TransactionStatus::Failed,
            _ => TransactionStatus::Success,
        };
        Self {
            hash: confirmation.hash_hex(),
            status,
            amount,
            fee: confirmation.transaction.as_ref().map(|tx| tx.fee),
            timestamp: confirmation
                .transaction
                .as_ref()
                .map_or_else(unix_now, |tx| tx.utime),
            seqno,
            hash_source: Some(confirmation.source),
        }
    }
}

/// A value transfer from the connector's wallet.
#[derive(Debug, Clone)]
pub struct TransactionIntent {
    pub destination: MsgAddress,
    /// Nanotons.
    pub amount: u128,
    pub body: Option<Arc<Cell>>,
    /// StateInit (code + data) deploying the destination.
    pub state_init: Option<Arc<Cell>>,
    pub bounce: bool,
}

impl TransactionIntent {
    pub fn new(destination: MsgAddress, amount: u128) -> Self {
        Self {
            destination,
            amount,
            body: None,
            state_init: None,
            bounce: true,
        }
    }

    /// From boundary strings: a user-friendly or raw address and an amount
    /// in TON. The bounce flag follows the address form.
    pub fn parse(destination: &str, amount: &str) -> ConnectorResult<Self> {
        let (destination, flags) = MsgAddress::parse_with_flags(destination)
            .map_err(|e| ConnectorError::InvalidAddress(format!("{destination:?}: {e}")))?;
        Ok(Self::new(destination, parse_ton(amount)?).with_bounce(flags.bounceable))
    }

    pub fn with_body(mut self, body: Arc<Cell>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_comment(self, comment: &str) -> ConnectorResult<Self> {
        Ok(self.with_body(Arc::new(build_comment(comment)?)))
    }

    /// Attaching a StateInit also clears the bounce flag so a failed deploy
    /// keeps its funds at the new address.
    pub fn with_state_init(mut self, state_init: Arc<Cell>) -> Self {
        self.state_init = Some(state_init);
        self.bounce = false;
        self
    }

    pub fn with_bounce(mut self, bounce: bool) -> Self {
        self.bounce = bounce;
        self
    }

    fn to_transfer(&self) -> Transfer {
        let mut transfer = Transfer::new(self.destination.clone(), self.amount).with_bounce(self.bounce);
        if let Some(body) = &self.body {
            transfer = transfer.with_payload(body.clone());
        }
        if let Some(init) = &self.state_init {
            transfer = transfer.with_state_init(init.clone());
        }
        transfer
    }
}

/// A contract method invocation.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub address: MsgAddress,
    pub method: String,
    pub params: Vec<MethodCallParam>,
    /// Nanotons attached. Zero or absent together with no params makes the
    /// call a read-only get method.
    pub amount: Option<u128>,
    pub opcode: Option<u32>,
}

impl MethodCall {
    pub fn new(address: MsgAddress, method: impl Into<String>) -> Self {
        Self {
            address,
            method: method.into(),
            params: Vec::new(),
            amount: None,
            opcode: None,
        }
    }

    pub fn with_params(mut self, params: Vec<MethodCallParam>) -> Self {
        self.params = params;
        self
    }

    pub fn with_amount(mut self, amount: u128) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_opcode(mut self, opcode: u32) -> Self {
        self.opcode = Some(opcode);
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.amount.unwrap_or(0) == 0 && self.params.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum ContractCallResult {
    /// Decoded stack of a get method; nothing was signed or sent.
    ReadOnly(GetMethodResult),
    Submitted(TransactionResult),
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployResult {
    /// User-friendly, bounceable.
    pub address: String,
    pub raw_address: String,
    pub transaction: TransactionResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletInfo {
    /// User-friendly, non-bounceable.
    pub address: String,
    pub raw_address: String,
    pub public_key: String,
    pub workchain: i32,
    pub subwallet_id: u32,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Balance {
    pub address: String,
    pub nanotons: u128,
    /// Decimal TON.
    pub ton: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JettonBalance {
    pub jetton_wallet: String,
    /// Minor units.
    pub balance: u128,
    pub decimals: u8,
    pub symbol: String,
    pub formatted: String,
}

/// Wallet and contract operations against one chain client.
///
/// Sends are serialized: the per-connector lock is held from the seqno read
/// until the confirmation poll returns, so no two messages are signed
/// against the same seqno.
pub struct TonConnector {
    config: ConnectorConfig,
    client: Arc<dyn ChainClient>,
    key_manager: KeyManager,
    wallet: RwLock<Option<Arc<Wallet>>>,
    send_lock: Mutex<()>,
    query_ids: Arc<QueryIdSource>,
    encoder: MethodCallEncoder,
    gas: GasEstimator,
    poller: ConfirmationPoller,
    shutdown: CancellationToken,
}

impl TonConnector {
    pub fn new(config: ConnectorConfig, client: Arc<dyn ChainClient>) -> ConnectorResult<Self> {
        config.validate()?;

        let template = match &config.wallet.code_boc {
            Some(code) => WalletV4R2::from_boc(code),
            None => WalletV4R2::published(),
        }
        .map_err(|e| ConnectorError::Config(format!("wallet.code_boc: {e}")))?;
        let key_manager = KeyManager::new(Arc::new(template))
            .with_workchain(config.wallet.workchain)
            .with_subwallet_id(config.wallet.subwallet_id)
            .with_strict_mnemonic(config.wallet.strict_mnemonic);

        let query_ids = Arc::new(QueryIdSource::new());
        Ok(Self {
            key_manager,
            client,
            wallet: RwLock::new(None),
            send_lock: Mutex::new(()),
            encoder: MethodCallEncoder::new(query_ids.clone()),
            query_ids,
            gas: GasEstimator::new(config.fees.clone()),
            poller: ConfirmationPoller::from_config(&config.confirmation),
            shutdown: CancellationToken::new(),
            config,
        })
    }

    /// Connector backed by the toncenter endpoint in `config`.
    pub fn with_toncenter(config: ConnectorConfig) -> ConnectorResult<Self> {
        let client = ToncenterClient::new(&config.network)?;
        Self::new(config, Arc::new(client))
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Cancelling this token aborts in-flight confirmation waits.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        debug!("Connector shutting down");
        self.shutdown.cancel();
    }

    fn render(&self, address: &MsgAddress, bounceable: bool) -> String {
        address
            .to_user_friendly(bounceable, self.config.network.testnet)
            .unwrap_or_else(|| address.to_raw_string())
    }

    // ========================================================================
    // Wallet
    // ========================================================================

    /// Derive the wallet from `mnemonic` and make it the sending wallet.
    ///
    /// Word count is checked before any key derivation or network access.
    pub async fn initialize(&self, mnemonic: Option<&str>) -> ConnectorResult<WalletInfo> {
        let phrase = mnemonic
            .filter(|p| !p.trim().is_empty())
            .ok_or(ConnectorError::MnemonicRequired)?;

        let wallet = self.key_manager.initialize(Some(phrase))?;
        let info = self.wallet_info_of(&wallet);
        *self.wallet.write().await = Some(Arc::new(wallet));
        Ok(info)
    }

    /// [`Self::initialize`] with the phrase from `TON_MNEMONIC`.
    pub async fn initialize_from_env(&self) -> ConnectorResult<WalletInfo> {
        let phrase = std::env::var(MNEMONIC_ENV).ok().map(Zeroizing::new);
        self.initialize(phrase.as_deref().map(String::as_str)).await
    }

    pub async fn wallet_info(&self) -> Option<WalletInfo> {
        self.wallet
            .read()
            .await
            .as_deref()
            .map(|w| self.wallet_info_of(w))
    }

    fn wallet_info_of(&self, wallet: &Wallet) -> WalletInfo {
        WalletInfo {
            address: self.render(wallet.address(), false),
            raw_address: wallet.address().to_raw_string(),
            public_key: hex::encode(wallet.public_key()),
            workchain: wallet.workchain(),
            subwallet_id: wallet.subwallet_id(),
            version: wallet.version(),
        }
    }

    async fn wallet(&self) -> ConnectorResult<Arc<Wallet>> {
        self.wallet
            .read()
            .await
            .clone()
            .ok_or(ConnectorError::WalletNotInitialized)
    }

    /// `true` when `address` parses as a raw or user-friendly address.
    pub fn validate_address(address: &str) -> bool {
        MsgAddress::from_string(address).is_ok()
    }

    /// Balance of `address`, or of the connector's wallet when `None`.
    pub async fn get_balance(&self, address: Option<&str>) -> ConnectorResult<Balance> {
        let address = match address {
            Some(a) => parse_address(a)?,
            None => self.wallet().await?.address().clone(),
        };
        let nanotons = self.client.get_balance(&address).await?;
        Ok(Balance {
            address: self.render(&address, true),
            nanotons,
            ton: format_ton(nanotons),
        })
    }

    // ========================================================================
    // Sending
    // ========================================================================

    pub async fn send(&self, intent: TransactionIntent) -> ConnectorResult<TransactionResult> {
        self.submit(&[intent.to_transfer()], intent.amount).await
    }

    /// Send TON with an optional text comment.
    pub async fn send_ton(
        &self,
        destination: &str,
        amount: &str,
        comment: Option<&str>,
    ) -> ConnectorResult<TransactionResult> {
        let mut intent = TransactionIntent::parse(destination, amount)?;
        if let Some(comment) = comment {
            intent = intent.with_comment(comment)?;
        }
        self.send(intent).await
    }

    async fn submit(&self, transfers: &[Transfer], amount: u128) -> ConnectorResult<TransactionResult> {
        let wallet = self.wallet().await?;
        let _guard = self.send_lock.lock().await;

        let seqno = self.client.get_seqno(wallet.address()).await?;
        let valid_until = (unix_now() as u32).saturating_add(self.config.wallet.message_ttl_secs);
        let message = wallet.create_external_message(seqno, valid_until, transfers)?;
        let message_hash = message.hash();
        let boc = BagOfCells::from_root(message).serialize()?;

        self.client.send_boc(&boc).await?;
        info!(
            address = %wallet.address(),
            seqno,
            message_hash = %hex::encode(message_hash),
            messages = transfers.len(),
            "External message submitted"
        );

        if !self.config.confirmation.wait {
            return Ok(TransactionResult::pending(message_hash, amount, seqno));
        }

        let confirmation = self
            .poller
            .wait(self.client.as_ref(), wallet.address(), seqno, message_hash, &self.shutdown)
            .await?;
        info!(hash = %confirmation.hash_hex(), source = ?confirmation.source, "Transaction confirmed");
        Ok(TransactionResult::confirmed(confirmation, amount, seqno))
    }

    // ========================================================================
    // Contracts
    // ========================================================================

    /// Run a get method, or send a call message when the call carries value
    /// or parameters.
    pub async fn call_method(&self, call: MethodCall) -> ConnectorResult<ContractCallResult> {
        if call.is_read_only() {
            let result = self.run_get_method(&call.address, &call.method, &[]).await?;
            return Ok(ContractCallResult::ReadOnly(result));
        }

        self.wallet().await?;
        let body = self.encoder.build(&call.method, &call.params, call.opcode)?;
        let amount = match call.amount {
            Some(amount) if amount > 0 => amount,
            _ => self.config.call_value()?,
        };
        let intent = TransactionIntent::new(call.address, amount).with_body(Arc::new(body));
        Ok(ContractCallResult::Submitted(self.send(intent).await?))
    }

    pub async fn run_get_method(
        &self,
        address: &MsgAddress,
        method: &str,
        stack: &[StackValue],
    ) -> ConnectorResult<GetMethodResult> {
        self.client.run_get_method(address, method, stack).await
    }

    /// Deploy a contract from its code and data, funding it with `amount`
    /// nanotons. The address is derived in the wallet's workchain.
    pub async fn deploy(
        &self,
        code: Arc<Cell>,
        data: Arc<Cell>,
        amount: u128,
    ) -> ConnectorResult<DeployResult> {
        let wallet = self.wallet().await?;
        let init = Arc::new(state_init(code, data)?);
        let address = contract_address(wallet.workchain(), &init);
        info!(address = %address, "Deploying contract");

        let intent = TransactionIntent::new(address.clone(), amount).with_state_init(init);
        let transaction = self.send(intent).await?;
        Ok(DeployResult {
            address: self.render(&address, true),
            raw_address: address.to_raw_string(),
            transaction,
        })
    }

    /// [`Self::deploy`] from hex or base64 BoCs and an amount in TON.
    pub async fn deploy_boc(&self, code: &str, data: &str, amount: &str) -> ConnectorResult<DeployResult> {
        let code = BagOfCells::decode_single_root(code)?;
        let data = BagOfCells::decode_single_root(data)?;
        self.deploy(code, data, parse_ton(amount)?).await
    }

    // ========================================================================
    // Jettons and NFTs
    // ========================================================================

    /// Jetton wallet of `owner` for the jetton `master`.
    pub async fn jetton_wallet_address(
        &self,
        master: &MsgAddress,
        owner: &MsgAddress,
    ) -> ConnectorResult<MsgAddress> {
        let result = self
            .client
            .run_get_method(master, "get_wallet_address", &[StackValue::address(owner)?])
            .await?;
        result.ensure_success("get_wallet_address")?;
        result.address(0)
    }

    pub async fn get_jetton_metadata(&self, master: &str) -> ConnectorResult<JettonMetadata> {
        let master = parse_address(master)?;
        self.jetton_metadata(&master).await
    }

    async fn jetton_metadata(&self, master: &MsgAddress) -> ConnectorResult<JettonMetadata> {
        let result = self.client.run_get_method(master, "get_jetton_data", &[]).await?;
        Ok(MetadataDecoder::parse(&jetton_data_from_stack(&result)?.content))
    }

    /// Jetton balance of `owner`, or of the connector's wallet when `None`.
    ///
    /// An undeployed jetton wallet has a zero balance.
    pub async fn get_jetton_balance(
        &self,
        master: &str,
        owner: Option<&str>,
    ) -> ConnectorResult<JettonBalance> {
        let master = parse_address(master)?;
        let owner = match owner {
            Some(o) => parse_address(o)?,
            None => self.wallet().await?.address().clone(),
        };

        let jetton_wallet = self.jetton_wallet_address(&master, &owner).await?;
        let data = self
            .client
            .run_get_method(&jetton_wallet, "get_wallet_data", &[])
            .await?;
        let balance = if data.is_success() {
            jetton_wallet_from_stack(&data)?.balance
        } else {
            debug!(jetton_wallet = %jetton_wallet, exit_code = data.exit_code, "Jetton wallet not deployed");
            0
        };

        let metadata = self.jetton_metadata(&master).await.unwrap_or_else(|e| {
            warn!(master = %master, error = %e, "Jetton metadata unavailable, using defaults");
            JettonMetadata::default()
        });

        Ok(JettonBalance {
            jetton_wallet: self.render(&jetton_wallet, true),
            balance,
            decimals: metadata.decimals,
            formatted: format_amount(balance, metadata.decimals as u32),
            symbol: metadata.symbol,
        })
    }

    /// Transfer `amount` jettons (major units) of `master` to `destination`.
    ///
    /// Excess TON returns to the connector's wallet.
    pub async fn send_jetton(
        &self,
        master: &str,
        destination: &str,
        amount: &str,
        comment: Option<&str>,
    ) -> ConnectorResult<TransactionResult> {
        let wallet = self.wallet().await?;
        let master = parse_address(master)?;
        let destination = parse_address(destination)?;

        let metadata = self.jetton_metadata(&master).await?;
        let units = parse_amount(amount, metadata.decimals as u32)?;
        let jetton_wallet = self.jetton_wallet_address(&master, wallet.address()).await?;

        let forward_payload = comment.map(build_comment).transpose()?.map(Arc::new);
        let body = create_transfer_body(
            self.query_ids.next_id(),
            units,
            &destination,
            wallet.address(),
            self.config.jetton_forward()?,
            forward_payload,
        )?;

        info!(symbol = %metadata.symbol, units = %units, destination = %destination, "Sending jettons");
        let intent = TransactionIntent::new(jetton_wallet, self.config.jetton_attached()?)
            .with_body(Arc::new(body));
        self.send(intent).await
    }

    /// Burn `amount` jettons (major units) of `master` held by the
    /// connector's wallet. Excess TON returns to the wallet.
    pub async fn burn_jetton(&self, master: &str, amount: &str) -> ConnectorResult<TransactionResult> {
        let wallet = self.wallet().await?;
        let master = parse_address(master)?;

        let metadata = self.jetton_metadata(&master).await?;
        let units = parse_amount(amount, metadata.decimals as u32)?;
        let jetton_wallet = self.jetton_wallet_address(&master, wallet.address()).await?;

        let body = create_burn_body(self.query_ids.next_id(), units, wallet.address())?;

        info!(symbol = %metadata.symbol, units = %units, "Burning jettons");
        let intent = TransactionIntent::new(jetton_wallet, self.config.jetton_attached()?)
            .with_body(Arc::new(body));
        self.send(intent).await
    }

    pub async fn get_nft_info(&self, address: &str) -> ConnectorResult<NftInfo> {
        let address = parse_address(address)?;
        let result = self.client.run_get_method(&address, "get_nft_data", &[]).await?;
        NftInfo::from_stack(address, &result)
    }

    /// Hand the NFT at `item` over to `new_owner`.
    pub async fn transfer_nft(&self, item: &str, new_owner: &str) -> ConnectorResult<TransactionResult> {
        let wallet = self.wallet().await?;
        let item = parse_address(item)?;
        let new_owner = parse_address(new_owner)?;

        let body = create_nft_transfer_body(
            self.query_ids.next_id(),
            &new_owner,
            wallet.address(),
            self.config.jetton_forward()?,
            None,
        )?;
        let intent = TransactionIntent::new(item, self.config.call_value()?).with_body(Arc::new(body));
        self.send(intent).await
    }

    // ========================================================================
    // Fees
    // ========================================================================

    /// Estimate of the fees for sending `amount` TON to `destination`. A
    /// heuristic from message size, not a simulation.
    pub fn estimate_fee(
        &self,
        destination: &str,
        amount: &str,
        body: Option<&Arc<Cell>>,
    ) -> ConnectorResult<FeeEstimate> {
        let destination = parse_address(destination)?;
        Ok(self.gas.estimate(&destination, parse_ton(amount)?, body))
    }
}

impl std::fmt::Debug for TonConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TonConnector")
            .field("endpoint", &self.config.network.endpoint)
            .field("custom_code", &self.config.wallet.code_boc.is_some())
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

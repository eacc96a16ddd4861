//! # ton-connector
//!
//! Wallet and smart-contract operations against a TON node.
//!
//! ## Overview
//!
//! [`TonConnector`] owns one V4R2 wallet derived from a mnemonic and a
//! [`ChainClient`] for node access (toncenter HTTP API by default). It covers:
//!
//! - **Transfers**: TON with an optional comment, jettons and jetton burns, NFTs
//! - **Contract calls**: read-only get methods, or signed call messages
//!   whose body is built by [`MethodCallEncoder`]
//! - **Deployment**: StateInit from code and data, address from its hash
//! - **Confirmation**: [`ConfirmationPoller`] waits for the wallet seqno
//!   to advance and correlates the transaction hash
//! - **Fees**: [`GasEstimator`] heuristic from message size
//!
//! ## Configuration
//!
//! ```rust
//! use ton_connector::ConnectorConfig;
//!
//! let config: ConnectorConfig = r#"
//!     [network]
//!     endpoint = "https://testnet.toncenter.com/api/v2"
//!     testnet = true
//!
//!     [confirmation]
//!     poll_interval_ms = 1500
//! "#
//! .parse()
//! .unwrap();
//! assert_eq!(config.confirmation.max_attempts, 30);
//! ```
//!
//! `${VAR}` references in a config file are replaced from the environment
//! before parsing.

pub mod amount;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod gas;
pub mod jetton;
pub mod method_call;
pub mod nft;
pub mod poller;
pub mod query_id;
pub mod toncenter;

pub use amount::{format_amount, format_ton, parse_amount, parse_ton, TON_DECIMALS};
pub use client::{ChainClient, GetMethodResult, StackValue, TransactionSummary};
pub use config::{
    ConfirmationConfig, ConnectorConfig, JettonConfig, NetworkConfig, WalletConfig,
};
pub use engine::{
    parse_address, Balance, ContractCallResult, DeployResult, JettonBalance, MethodCall,
    TonConnector, TransactionIntent, TransactionResult, TransactionStatus, WalletInfo,
    MNEMONIC_ENV,
};
pub use error::{ConnectorError, ConnectorResult, MnemonicFailure};
pub use gas::{FeeEstimate, FeeSchedule, GasEstimator};
pub use method_call::{
    computed_opcode, resolve_opcode, standard_opcode, LegacyValue, MethodCallEncoder,
    MethodCallParam, OpcodeSource,
};
pub use nft::{create_nft_transfer_body, NftInfo};
pub use poller::{Confirmation, ConfirmationPoller, HashSource};
pub use query_id::QueryIdSource;
pub use toncenter::ToncenterClient;

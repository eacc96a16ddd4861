//! Integration tests against the public toncenter API
//!
//! Run with: cargo test -p ton-connector --features live-tests --test toncenter_live

#![cfg(feature = "live-tests")]

use ton_cell::MsgAddress;
use ton_connector::{ChainClient, NetworkConfig, ToncenterClient};

/// Elector contract, present on every network.
const ELECTOR: &str = "-1:3333333333333333333333333333333333333333333333333333333333333333";

fn client() -> ToncenterClient {
    let config = NetworkConfig {
        api_key: std::env::var("TONCENTER_API_KEY").ok(),
        ..NetworkConfig::default()
    };
    ToncenterClient::new(&config).expect("Failed to build client")
}

#[tokio::test]
async fn test_get_balance_elector() {
    let elector = MsgAddress::from_string(ELECTOR).unwrap();
    let balance = client()
        .get_balance(&elector)
        .await
        .expect("Failed to get balance");

    assert!(balance > 0, "Elector should hold funds");
    println!("Elector balance: {balance}");
}

#[tokio::test]
async fn test_get_transactions_elector() {
    let elector = MsgAddress::from_string(ELECTOR).unwrap();
    let txs = client()
        .get_transactions(&elector, 3)
        .await
        .expect("Failed to get transactions");

    assert!(!txs.is_empty());
    assert!(txs.len() <= 3);
    assert!(txs.windows(2).all(|w| w[0].lt >= w[1].lt), "Newest first");
    println!("Latest elector transaction lt={}", txs[0].lt);
}

#[tokio::test]
async fn test_seqno_of_unused_address_is_zero() {
    let unused = MsgAddress::Internal {
        workchain: 0,
        address: [0x5A; 32],
    };
    let seqno = client()
        .get_seqno(&unused)
        .await
        .expect("Failed to query seqno");
    assert_eq!(seqno, 0);
}

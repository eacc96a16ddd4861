//! toncenter v2 HTTP client.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, trace};
use ton_cell::{BagOfCells, Cell, MsgAddress};

use crate::client::{ChainClient, GetMethodResult, StackValue, TransactionSummary};
use crate::config::NetworkConfig;
use crate::error::{ConnectorError, ConnectorResult};

const API_KEY_HEADER: &str = "X-API-Key";

/// Response envelope shared by every v2 method.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error: Option<String>,
    code: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RunGetMethodResponse {
    exit_code: i32,
    #[serde(default)]
    stack: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawTransactionId {
    lt: String,
    hash: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawMessage {
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    transaction_id: RawTransactionId,
    #[serde(default)]
    utime: u64,
    #[serde(default)]
    fee: Option<String>,
    #[serde(default)]
    in_msg: Option<RawMessage>,
}

/// [`ChainClient`] over the toncenter v2 JSON API.
#[derive(Debug, Clone)]
pub struct ToncenterClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ToncenterClient {
    pub fn new(config: &NetworkConfig) -> ConnectorResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.endpoint)
    }

    async fn get<T: DeserializeOwned>(&self, method: &str, query: &[(&str, String)]) -> ConnectorResult<T> {
        let mut request = self.http.get(self.url(method)).query(query);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        trace!(method, "toncenter GET");
        Self::read_response(method, request.send().await?).await
    }

    async fn post<T: DeserializeOwned>(&self, method: &str, body: &Value) -> ConnectorResult<T> {
        let mut request = self.http.post(self.url(method)).json(body);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        trace!(method, "toncenter POST");
        Self::read_response(method, request.send().await?).await
    }

    async fn read_response<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> ConnectorResult<T> {
        let status = response.status();
        let body = response.text().await?;
        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            ConnectorError::Rpc(format!("{method}: HTTP {status}, unreadable body: {e}"))
        })?;

        match envelope {
            ApiResponse { ok: true, result: Some(result), .. } => Ok(result),
            ApiResponse { error, code, .. } => Err(ConnectorError::Rpc(format!(
                "{method}: {} (code {})",
                error.unwrap_or_else(|| "no result".to_string()),
                code.map_or_else(|| status.as_u16().to_string(), |c| c.to_string()),
            ))),
        }
    }
}

#[async_trait]
impl ChainClient for ToncenterClient {
    async fn get_balance(&self, address: &MsgAddress) -> ConnectorResult<u128> {
        let balance: String = self
            .get("getAddressBalance", &[("address", address.to_raw_string())])
            .await?;
        parse_decimal(&balance)
    }

    async fn get_transactions(
        &self,
        address: &MsgAddress,
        limit: usize,
    ) -> ConnectorResult<Vec<TransactionSummary>> {
        let raw: Vec<RawTransaction> = self
            .get(
                "getTransactions",
                &[
                    ("address", address.to_raw_string()),
                    ("limit", limit.to_string()),
                    ("archival", "false".to_string()),
                ],
            )
            .await?;
        raw.into_iter().map(summarize).collect()
    }

    async fn run_get_method(
        &self,
        address: &MsgAddress,
        method: &str,
        stack: &[StackValue],
    ) -> ConnectorResult<GetMethodResult> {
        let body = json!({
            "address": address.to_raw_string(),
            "method": method,
            "stack": encode_stack(stack)?,
        });
        let response: RunGetMethodResponse = self.post("runGetMethod", &body).await?;
        debug!(address = %address, method, exit_code = response.exit_code, "get method executed");
        Ok(GetMethodResult {
            exit_code: response.exit_code,
            stack: decode_stack(&response.stack)?,
        })
    }

    async fn send_boc(&self, boc: &[u8]) -> ConnectorResult<()> {
        let body = json!({ "boc": STANDARD.encode(boc) });
        let _: Value = self.post("sendBoc", &body).await?;
        Ok(())
    }
}

fn summarize(raw: RawTransaction) -> ConnectorResult<TransactionSummary> {
    let in_msg = raw.in_msg.unwrap_or_default();
    Ok(TransactionSummary {
        hash: decode_hash(&raw.transaction_id.hash)?,
        lt: raw
            .transaction_id
            .lt
            .parse()
            .map_err(|_| ConnectorError::Rpc(format!("bad lt {}", raw.transaction_id.lt)))?,
        utime: raw.utime,
        in_msg_hash: in_msg.hash.as_deref().map(decode_hash).transpose()?,
        fee: raw.fee.as_deref().map(parse_decimal).transpose()?.unwrap_or(0),
        value: in_msg.value.as_deref().map(parse_decimal).transpose()?.unwrap_or(0),
        success: None,
    })
}

fn decode_hash(encoded: &str) -> ConnectorResult<[u8; 32]> {
    let bytes = STANDARD
        .decode(encoded)
        .or_else(|_| URL_SAFE.decode(encoded))
        .map_err(|e| ConnectorError::Rpc(format!("bad hash {encoded:?}: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| ConnectorError::Rpc(format!("hash {encoded:?} is not 32 bytes")))
}

fn parse_decimal(text: &str) -> ConnectorResult<u128> {
    text.parse()
        .map_err(|_| ConnectorError::Rpc(format!("bad amount {text:?}")))
}

/// TVM integers arrive as `0x`-prefixed hex, optionally negative.
fn parse_int(text: &str) -> ConnectorResult<i128> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits.strip_prefix("0x") {
        Some(hex) => i128::from_str_radix(hex, 16),
        None => digits.parse(),
    }
    .map_err(|_| ConnectorError::UnexpectedStack(format!("integer {text:?} out of range")))?;
    Ok(if negative { -value } else { value })
}

fn encode_cell(cell: &Arc<Cell>) -> ConnectorResult<String> {
    Ok(BagOfCells::new(vec![cell.clone()]).serialize_to_base64()?)
}

fn encode_stack(stack: &[StackValue]) -> ConnectorResult<Vec<Value>> {
    stack
        .iter()
        .map(|entry| {
            Ok(match entry {
                StackValue::Int(v) => json!(["num", v.to_string()]),
                StackValue::Cell(c) => json!(["tvm.Cell", encode_cell(c)?]),
                StackValue::Slice(c) => json!(["tvm.Slice", encode_cell(c)?]),
                StackValue::Null => json!(["null", Value::Null]),
            })
        })
        .collect()
}

fn decode_stack(stack: &[Value]) -> ConnectorResult<Vec<StackValue>> {
    stack.iter().map(decode_entry).collect()
}

fn decode_entry(entry: &Value) -> ConnectorResult<StackValue> {
    let kind = entry.get(0).and_then(Value::as_str).unwrap_or_default();
    let payload = entry.get(1);

    let boc = || -> ConnectorResult<Arc<Cell>> {
        let encoded = payload
            .and_then(|p| p.get("bytes"))
            .and_then(Value::as_str)
            .ok_or_else(|| ConnectorError::UnexpectedStack(format!("{kind} entry without bytes")))?;
        Ok(BagOfCells::deserialize_from_base64(encoded)?.into_single_root()?)
    };

    match kind {
        "num" => {
            let text = payload
                .and_then(Value::as_str)
                .ok_or_else(|| ConnectorError::UnexpectedStack("num entry without value".into()))?;
            Ok(StackValue::Int(parse_int(text)?))
        }
        "cell" => Ok(StackValue::Cell(boc()?)),
        "slice" => Ok(StackValue::Slice(boc()?)),
        "null" => Ok(StackValue::Null),
        other => {
            debug!(kind = other, "unsupported stack entry mapped to null");
            Ok(StackValue::Null)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ton_cell::CellBuilder;

    fn cell() -> Arc<Cell> {
        let mut b = CellBuilder::new();
        b.store_u32(0xCAFE).unwrap();
        Arc::new(b.build().unwrap())
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("0x2a").unwrap(), 42);
        assert_eq!(parse_int("-0x1").unwrap(), -1);
        assert_eq!(parse_int("17").unwrap(), 17);
        assert!(parse_int("0xzz").is_err());
    }

    #[test]
    fn test_decode_stack() {
        let b64 = encode_cell(&cell()).unwrap();
        let stack = vec![
            json!(["num", "0x7"]),
            json!(["cell", { "bytes": b64, "object": {} }]),
            json!(["slice", { "bytes": b64 }]),
            json!(["list", { "elements": [] }]),
        ];
        let decoded = decode_stack(&stack).unwrap();
        assert_eq!(decoded[0], StackValue::Int(7));
        assert_eq!(decoded[1], StackValue::Cell(cell()));
        assert_eq!(decoded[2], StackValue::Slice(cell()));
        assert_eq!(decoded[3], StackValue::Null);

        assert!(decode_stack(&[json!(["cell", {}])]).is_err());
    }

    #[test]
    fn test_encode_stack() {
        let encoded = encode_stack(&[StackValue::Int(-5), StackValue::Slice(cell())]).unwrap();
        assert_eq!(encoded[0], json!(["num", "-5"]));
        assert_eq!(encoded[1][0], "tvm.Slice");
        let root = BagOfCells::deserialize_from_base64(encoded[1][1].as_str().unwrap())
            .unwrap()
            .into_single_root()
            .unwrap();
        assert_eq!(root.hash(), cell().hash());
    }

    #[test]
    fn test_summarize_transaction() {
        let hash = STANDARD.encode([0xAB; 32]);
        let msg_hash = STANDARD.encode([0xCD; 32]);
        let raw: RawTransaction = serde_json::from_value(json!({
            "@type": "raw.transaction",
            "utime": 1700000000,
            "transaction_id": { "lt": "4500000000001", "hash": hash },
            "fee": "2500000",
            "in_msg": { "hash": msg_hash, "value": "0", "source": "" },
            "out_msgs": []
        }))
        .unwrap();

        let tx = summarize(raw).unwrap();
        assert_eq!(tx.hash, [0xAB; 32]);
        assert_eq!(tx.lt, 4_500_000_000_001);
        assert_eq!(tx.in_msg_hash, Some([0xCD; 32]));
        assert_eq!(tx.fee, 2_500_000);
    }

    #[test]
    fn test_error_envelope() {
        let envelope: ApiResponse<String> =
            serde_json::from_str(r#"{"ok":false,"error":"rate limit","code":429}"#).unwrap();
        assert!(!envelope.ok);
        assert_eq!(envelope.code, Some(429));
        assert!(envelope.result.is_none());
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let config = NetworkConfig {
            endpoint: "https://testnet.toncenter.com/api/v2/".into(),
            ..NetworkConfig::default()
        };
        let client = ToncenterClient::new(&config).unwrap();
        assert_eq!(client.url("sendBoc"), "https://testnet.toncenter.com/api/v2/sendBoc");
    }
}

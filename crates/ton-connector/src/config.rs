//! Connector configuration.
//!
//! Loaded from TOML. `${VAR}` and `${VAR:-default}` placeholders are
//! replaced from the environment before parsing, so secrets such as the API
//! key can stay out of the file. The mnemonic is never part of the config.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::amount::parse_ton;
use crate::error::{ConnectorError, ConnectorResult};
use crate::gas::FeeSchedule;

/// Public toncenter v2 endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://toncenter.com/api/v2";

/// Larger inputs are rejected before placeholder substitution.
const MAX_CONFIG_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub network: NetworkConfig,
    pub wallet: WalletConfig,
    pub confirmation: ConfirmationConfig,
    pub fees: FeeSchedule,
    pub jetton: JettonConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// toncenter v2 base URL.
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Render user-friendly addresses with the testnet flag.
    pub testnet: bool,
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            testnet: false,
            request_timeout_secs: 10,
        }
    }
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub workchain: i32,
    /// Defaults to 698983191 + workchain.
    pub subwallet_id: Option<u32>,
    /// Require phrases to pass the TON seed check.
    pub strict_mnemonic: bool,
    /// Wallet contract code as a hex or base64 BoC. The published V4R2
    /// code when unset.
    pub code_boc: Option<String>,
    /// Seconds an external message stays valid.
    pub message_ttl_secs: u32,
    /// TON attached to state-changing contract calls that name no amount.
    pub call_value: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            workchain: 0,
            subwallet_id: None,
            strict_mnemonic: true,
            code_boc: None,
            message_ttl_secs: 60,
            call_value: "0.05".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
    /// Wallet transactions scanned when matching the submitted message.
    pub history_depth: usize,
    /// When false, sends return `Pending` right after submission.
    pub wait: bool,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            max_attempts: 30,
            history_depth: 10,
            wait: true,
        }
    }
}

impl ConfirmationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JettonConfig {
    /// TON sent along with a jetton transfer to pay for its processing.
    pub attached_ton: String,
    /// TON forwarded to the recipient with the transfer notification.
    pub forward_ton: String,
}

impl Default for JettonConfig {
    fn default() -> Self {
        Self {
            attached_ton: "0.05".to_string(),
            forward_ton: "0.000000001".to_string(),
        }
    }
}

impl ConnectorConfig {
    /// Read and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConnectorResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConnectorError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        contents.parse()
    }

    pub fn validate(&self) -> ConnectorResult<()> {
        if self.network.endpoint.trim().is_empty() {
            return Err(ConnectorError::Config("network.endpoint cannot be empty".into()));
        }
        if self.confirmation.poll_interval_ms == 0 {
            return Err(ConnectorError::Config(
                "confirmation.poll_interval_ms must be positive".into(),
            ));
        }
        if self.confirmation.max_attempts == 0 {
            return Err(ConnectorError::Config(
                "confirmation.max_attempts must be positive".into(),
            ));
        }
        if self.wallet.message_ttl_secs == 0 {
            return Err(ConnectorError::Config(
                "wallet.message_ttl_secs must be positive".into(),
            ));
        }
        for (key, value) in [
            ("wallet.call_value", &self.wallet.call_value),
            ("jetton.attached_ton", &self.jetton.attached_ton),
            ("jetton.forward_ton", &self.jetton.forward_ton),
        ] {
            parse_ton(value).map_err(|e| ConnectorError::Config(format!("{key}: {e}")))?;
        }
        Ok(())
    }

    pub fn call_value(&self) -> ConnectorResult<u128> {
        parse_ton(&self.wallet.call_value)
    }

    pub fn jetton_attached(&self) -> ConnectorResult<u128> {
        parse_ton(&self.jetton.attached_ton)
    }

    pub fn jetton_forward(&self) -> ConnectorResult<u128> {
        parse_ton(&self.jetton.forward_ton)
    }
}

impl FromStr for ConnectorConfig {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let resolved = resolve_env_vars(s)?;
        let config: ConnectorConfig =
            toml::from_str(&resolved).map_err(|e| ConnectorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Replace `${VAR}` and `${VAR:-default}` with environment values.
///
/// A placeholder without a default whose variable is unset is an error.
pub fn resolve_env_vars(input: &str) -> ConnectorResult<String> {
    if input.len() > MAX_CONFIG_SIZE {
        return Err(ConnectorError::Config(format!(
            "configuration too large: {} bytes (max {MAX_CONFIG_SIZE})",
            input.len()
        )));
    }

    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
        .map_err(|e| ConnectorError::Config(format!("regex error: {e}")))?;

    let mut result = String::with_capacity(input.len());
    let mut last = 0;
    for cap in re.captures_iter(input) {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let value = match std::env::var(name.as_str()) {
            Ok(v) => v,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                None => {
                    return Err(ConnectorError::Config(format!(
                        "environment variable '{}' not set",
                        name.as_str()
                    )));
                }
            },
        };
        result.push_str(&input[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }
    result.push_str(&input[last..]);

    Ok(result)
}

//! Decoding of TEP-74 get-method results.

use ton_jetton::{JettonData, JettonWalletData};

use crate::client::GetMethodResult;
use crate::error::ConnectorResult;

/// `get_jetton_data`: `[total_supply, mintable, admin, content, wallet_code]`.
pub fn jetton_data_from_stack(result: &GetMethodResult) -> ConnectorResult<JettonData> {
    result.ensure_success("get_jetton_data")?;
    Ok(JettonData {
        total_supply: result.uint(0)?,
        mintable: result.int(1)? != 0,
        admin_address: result.address(2)?,
        content: result.cell(3)?.clone(),
    })
}

/// `get_wallet_data`: `[balance, owner, master, wallet_code]`.
pub fn jetton_wallet_from_stack(result: &GetMethodResult) -> ConnectorResult<JettonWalletData> {
    result.ensure_success("get_wallet_data")?;
    Ok(JettonWalletData {
        balance: result.uint(0)?,
        owner: result.address(1)?,
        jetton_master: result.address(2)?,
    })
}

//! Wallet V4R2 template

use std::sync::Arc;

use tracing::warn;
use ton_cell::{BagOfCells, Cell, CellBuilder};

use crate::error::{WalletError, WalletResult};
use crate::message::Transfer;
use crate::template::WalletTemplate;

/// Representation hash of the published V4R2 code.
pub const WALLET_V4R2_CODE_HASH: &str =
    "feb5ff6820e2ff0d9483e7e0d62c817d846789fb4ae580c878866d959dabd5c0";

/// Published V4R2 code as a base64 BoC.
pub const WALLET_V4R2_CODE_BOC: &str = concat!(
    "te6cckECFAEAAtQAART/APSkE/S88sgLAQIBIAIDAgFIBAUE+PKDCNcYINMf0x/THwL4I7vyZO1E0NMf",
    "0x/T//QE0VFDuvKhUVG68qIF+QFUEGT5EPKj+AAkpMjLH1JAyx9SMMv/UhD0AMntVPgPAdMHIcAAn2xR",
    "kyDXSpbTB9QC+wDoMOAhwAHjACHAAuMAAcADkTDjDQOkyMsfEssfy/8QERITAubQAdDTAyFxsJJfBOAi",
    "10nBIJJfBOAC0x8hghBwbHVnvSKCEGRzdHK9sJJfBeAD+kAwIPpEAcjKB8v/ydDtRNCBAUDXIfQEMFyB",
    "AQj0Cm+hMbOSXwfgBdM/yCWCEHBsdWe6kjgw4w0DghBkc3RyupJfBuMNBgcCASAICQB4AfoA9AQw+Cdv",
    "IjBQCqEhvvLgUIIQcGx1Z4MesXCAGFAEywUmzxZY+gIZ9ADLaRfLH1Jgyz8gyYBA+wAGAIpQBIEBCPRZ",
    "MO1E0IEBQNcgyAHPFvQAye1UAXKwjiOCEGRzdHKDHrFwgBhQBcsFUAPPFiP6AhPLassfyz/JgED7AJJf",
    "A+ICASAKCwBZvSQrb2omhAgKBrkPoCGEcNQICEekk30pkQzmkD6f+YN4EoAbeBAUiYcVnzGEAgFYDA0A",
    "EbjJftRNDXCx+AA9sp37UTQgQFA1yH0BDACyMoHy//J0AGBAQj0Cm+hMYAIBIA4PABmtznaiaEAga5Dr",
    "hf/AABmvHfaiaEAQa5DrhY/AAG7SB/oA1NQi+QAFyMoHFcv/ydB3dIAYyMsFywIizxZQBfoCFMtrEszM",
    "yXP7AMhAFIEBCPRR8qcCAHCBAQjXGPoA0z/IVCBHgQEI9FHyp4IQbm90ZXB0gBjIywXLAlAGzxZQBPoC",
    "FMtqEssfyz/Jc/sAAgBsgQEI1xj6ANM/MFIkgQEI9Fnyp4IQZHN0cnB0gBjIywXLAlAFzxZQA/oCE8tq",
    "yx8Syz/Jc/sAAAr0AMntVGliJeU=",
);

/// Base subwallet id; the workchain is added to it.
pub const DEFAULT_WALLET_ID: u32 = 698983191;

const MAX_MESSAGES: usize = 4;

/// Wallet V4 revision 2.
///
/// Data: `seqno:uint32 subwallet_id:uint32 public_key:bits256 plugins:(HashmapE 256 ...)`.
/// Body: `subwallet_id:uint32 valid_until:uint32 seqno:uint32 op:uint8 (mode:uint8 ^Message)*`.
#[derive(Debug, Clone)]
pub struct WalletV4R2 {
    code: Arc<Cell>,
}

impl WalletV4R2 {
    /// Use `code` as the contract code.
    ///
    /// Code whose hash differs from the published V4R2 code is accepted with
    /// a warning; addresses derived from it will not match other wallets.
    pub fn new(code: Arc<Cell>) -> Self {
        let template = Self { code };
        if !template.is_published_code() {
            warn!(
                code_hash = %hex::encode(template.code.hash()),
                "Wallet code does not match the published V4R2 code"
            );
        }
        template
    }

    /// Template on the published V4R2 code.
    pub fn published() -> WalletResult<Self> {
        Self::from_boc(WALLET_V4R2_CODE_BOC)
    }

    /// Load the code from a hex or base64 BoC.
    pub fn from_boc(encoded: &str) -> WalletResult<Self> {
        let code = BagOfCells::decode_single_root(encoded)
            .map_err(|e| WalletError::InvalidCode(e.to_string()))?;
        Ok(Self::new(code))
    }

    pub fn is_published_code(&self) -> bool {
        hex::encode(self.code.hash()) == WALLET_V4R2_CODE_HASH
    }
}

impl WalletTemplate for WalletV4R2 {
    fn version(&self) -> &'static str {
        "v4r2"
    }

    fn code(&self) -> Arc<Cell> {
        self.code.clone()
    }

    fn default_subwallet_id(&self, workchain: i32) -> u32 {
        DEFAULT_WALLET_ID.wrapping_add_signed(workchain)
    }

    fn max_messages(&self) -> usize {
        MAX_MESSAGES
    }

    fn initial_data(&self, public_key: &[u8; 32], subwallet_id: u32) -> WalletResult<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_u32(0)?; // seqno
        builder.store_u32(subwallet_id)?;
        builder.store_bytes(public_key)?;
        builder.store_bit(false)?; // no plugins
        Ok(builder.build()?)
    }

    fn create_transfer_body(
        &self,
        subwallet_id: u32,
        seqno: u32,
        valid_until: u32,
        transfers: &[Transfer],
    ) -> WalletResult<Cell> {
        if transfers.len() > MAX_MESSAGES {
            return Err(WalletError::TooManyTransfers {
                max: MAX_MESSAGES,
                got: transfers.len(),
            });
        }

        let mut builder = CellBuilder::new();
        builder.store_u32(subwallet_id)?;
        builder.store_u32(valid_until)?;
        builder.store_u32(seqno)?;
        builder.store_u8(0)?; // op = 0 (simple send)

        for transfer in transfers {
            builder.store_u8(transfer.mode)?;
            builder.store_ref(Arc::new(transfer.to_internal_message()?))?;
        }

        Ok(builder.build()?)
    }
}

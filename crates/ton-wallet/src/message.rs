//! Message structures: internal messages, external wrappers, StateInit and comments.
//!
//! TL-B references:
//! ```text
//! int_msg_info$0 ihr_disabled:Bool bounce:Bool bounced:Bool
//!   src:MsgAddress dest:MsgAddressInt value:CurrencyCollection
//!   ihr_fee:Grams fwd_fee:Grams created_lt:uint64 created_at:uint32 = CommonMsgInfoRelaxed;
//! ext_in_msg_info$10 src:MsgAddressExt dest:MsgAddressInt import_fee:Grams = CommonMsgInfo;
//! message$_ info:CommonMsgInfo init:(Maybe (Either StateInit ^StateInit))
//!   body:(Either X ^X) = Message X;
//! ```

use std::sync::Arc;

use ton_cell::{Cell, CellBuilder, CellResult, MsgAddress, MAX_CELL_BITS, snake};
use ton_crypto::Ed25519Keypair;

use crate::error::{WalletError, WalletResult};

/// Default send mode: pay fees separately, ignore action errors.
pub const DEFAULT_SEND_MODE: u8 = 3;

const SIGNATURE_BITS: usize = 512;

/// A transfer to be sent from a wallet
#[derive(Debug, Clone)]
pub struct Transfer {
    /// Destination address
    pub to: MsgAddress,
    /// Amount in nanotons
    pub amount: u128,
    /// Optional message body
    pub payload: Option<Arc<Cell>>,
    /// Optional StateInit, for deploying the destination contract
    pub state_init: Option<Arc<Cell>>,
    /// Bounce flag
    pub bounce: bool,
    /// Send mode (default: 3)
    pub mode: u8,
}

impl Transfer {
    /// Create a simple transfer
    pub fn new(to: MsgAddress, amount: u128) -> Self {
        Self {
            to,
            amount,
            payload: None,
            state_init: None,
            bounce: true,
            mode: DEFAULT_SEND_MODE,
        }
    }

    /// Set payload
    pub fn with_payload(mut self, payload: Arc<Cell>) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_state_init(mut self, state_init: Arc<Cell>) -> Self {
        self.state_init = Some(state_init);
        self
    }

    /// Set bounce flag
    pub fn with_bounce(mut self, bounce: bool) -> Self {
        self.bounce = bounce;
        self
    }

    /// Set send mode
    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = mode;
        self
    }

    /// Serialize as an internal message with zeroed fees and timestamps,
    /// which the sending wallet fills in.
    pub fn to_internal_message(&self) -> CellResult<Cell> {
        let mut builder = CellBuilder::new();

        builder.store_bit(false)?; // int_msg_info$0
        builder.store_bit(true)?; // ihr_disabled
        builder.store_bit(self.bounce)?;
        builder.store_bit(false)?; // bounced

        builder.store_address(&MsgAddress::Null)?;
        builder.store_address(&self.to)?;
        builder.store_coins(self.amount)?;
        builder.store_bit(false)?; // no extra currencies

        builder.store_coins(0)?; // ihr_fee
        builder.store_coins(0)?; // fwd_fee
        builder.store_u64(0)?; // created_lt
        builder.store_u32(0)?; // created_at

        store_init(&mut builder, self.state_init.clone())?;
        store_body(&mut builder, self.payload.clone())?;

        builder.build()
    }
}

fn store_init(builder: &mut CellBuilder, state_init: Option<Arc<Cell>>) -> CellResult<()> {
    match state_init {
        Some(init) => {
            builder.store_bit(true)?;
            builder.store_bit(true)?; // as reference
            builder.store_ref(init)?;
        }
        None => {
            builder.store_bit(false)?;
        }
    }
    Ok(())
}

fn store_body(builder: &mut CellBuilder, body: Option<Arc<Cell>>) -> CellResult<()> {
    match body {
        Some(body) => {
            builder.store_bit(true)?;
            builder.store_ref(body)?;
        }
        None => {
            builder.store_bit(false)?;
        }
    }
    Ok(())
}

/// Build `StateInit` with code and data references only.
pub fn state_init(code: Arc<Cell>, data: Arc<Cell>) -> CellResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_bit(false)?; // split_depth
    builder.store_bit(false)?; // special
    builder.store_maybe_ref(Some(code))?;
    builder.store_maybe_ref(Some(data))?;
    builder.store_bit(false)?; // library
    builder.build()
}

/// Address of the contract deployed with `state_init` on `workchain`.
pub fn contract_address(workchain: i32, state_init: &Cell) -> MsgAddress {
    MsgAddress::Internal {
        workchain,
        address: state_init.hash(),
    }
}

/// Wrap a signed body into an inbound external message for `dest`.
pub fn external_message(
    dest: &MsgAddress,
    state_init: Option<Arc<Cell>>,
    body: Arc<Cell>,
) -> CellResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_uint(0b10, 2)?; // ext_in_msg_info$10
    builder.store_address(&MsgAddress::Null)?;
    builder.store_address(dest)?;
    builder.store_coins(0)?; // import_fee
    store_init(&mut builder, state_init)?;
    builder.store_bit(true)?;
    builder.store_ref(body)?;
    builder.build()
}

/// Prepend an Ed25519 signature of `body`'s hash to its contents.
pub fn sign_body(keypair: &Ed25519Keypair, body: &Cell) -> WalletResult<Cell> {
    if body.bit_len() + SIGNATURE_BITS > MAX_CELL_BITS {
        return Err(WalletError::BodyTooLarge(body.bit_len()));
    }
    let signature = keypair.sign(&body.hash());

    let mut builder = CellBuilder::new();
    builder.store_bytes(&signature)?;
    builder.store_slice(&ton_cell::CellSlice::new(body))?;
    Ok(builder.build()?)
}

/// Build a text comment body (op = 0, then the text as a snake string).
pub fn build_comment(text: &str) -> CellResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u32(0)?;
    snake::store_snake_bytes(&mut builder, text.as_bytes())?;
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ton_cell::CellSlice;

    fn dest() -> MsgAddress {
        MsgAddress::Internal {
            workchain: 0,
            address: [0x11; 32],
        }
    }

    #[test]
    fn test_transfer_builder() {
        let transfer = Transfer::new(dest(), 1_000_000_000)
            .with_bounce(false)
            .with_mode(128);

        assert_eq!(transfer.amount, 1_000_000_000);
        assert!(!transfer.bounce);
        assert_eq!(transfer.mode, 128);
    }

    #[test]
    fn test_internal_message_layout() {
        let body = Arc::new(build_comment("hi").unwrap());
        let msg = Transfer::new(dest(), 5)
            .with_payload(body.clone())
            .to_internal_message()
            .unwrap();

        let mut s = CellSlice::new(&msg);
        assert!(!s.load_bit().unwrap());
        assert!(s.load_bit().unwrap()); // ihr_disabled
        assert!(s.load_bit().unwrap()); // bounce
        assert!(!s.load_bit().unwrap());
        assert_eq!(s.load_address().unwrap(), MsgAddress::Null);
        assert_eq!(s.load_address().unwrap(), dest());
        assert_eq!(s.load_coins().unwrap(), 5);
        assert!(!s.load_bit().unwrap());
        assert_eq!(s.load_coins().unwrap(), 0);
        assert_eq!(s.load_coins().unwrap(), 0);
        assert_eq!(s.load_u64().unwrap(), 0);
        assert_eq!(s.load_u32().unwrap(), 0);
        assert!(!s.load_bit().unwrap()); // no init
        assert!(s.load_bit().unwrap()); // body as ref
        assert_eq!(s.load_ref().unwrap().hash(), body.hash());
        assert!(s.is_empty());
    }

    #[test]
    fn test_state_init_bits() {
        let code = Arc::new(Cell::empty());
        let mut data = CellBuilder::new();
        data.store_u8(1).unwrap();
        let si = state_init(code, Arc::new(data.build().unwrap())).unwrap();
        assert_eq!(si.bit_len(), 5);
        assert_eq!(si.data(), &[0b0011_0000]);
        assert_eq!(si.reference_count(), 2);
    }

    #[test]
    fn test_external_message_carries_body() {
        let body = Arc::new(build_comment("x").unwrap());
        let init = Arc::new(Cell::empty());
        let ext = external_message(&dest(), Some(init.clone()), body.clone()).unwrap();

        let mut s = CellSlice::new(&ext);
        assert_eq!(s.load_uint(2).unwrap(), 0b10);
        assert_eq!(s.load_address().unwrap(), MsgAddress::Null);
        assert_eq!(s.load_address().unwrap(), dest());
        assert_eq!(s.load_coins().unwrap(), 0);
        assert!(s.load_bit().unwrap());
        assert!(s.load_bit().unwrap());
        assert_eq!(s.load_ref().unwrap().hash(), init.hash());
        assert!(s.load_bit().unwrap());
        assert_eq!(s.load_ref().unwrap().hash(), body.hash());
    }

    #[test]
    fn test_signature_covers_body_hash() {
        let keypair = Ed25519Keypair::from_seed([3; 32]);
        let mut b = CellBuilder::new();
        b.store_u32(698983191).unwrap();
        b.store_ref(Arc::new(Cell::empty())).unwrap();
        let body = b.build().unwrap();

        let signed = sign_body(&keypair, &body).unwrap();
        assert_eq!(signed.bit_len(), 512 + 32);
        assert_eq!(signed.reference_count(), 1);

        let mut s = CellSlice::new(&signed);
        let sig: [u8; 64] = s.load_bytes(64).unwrap().try_into().unwrap();
        assert!(keypair.verify(&body.hash(), &sig).is_ok());
        assert_eq!(s.load_u32().unwrap(), 698983191);
    }

    #[test]
    fn test_oversized_body_rejected() {
        let mut b = CellBuilder::new();
        b.store_bytes(&[0; 64]).unwrap();
        let body = b.build().unwrap();
        let keypair = Ed25519Keypair::from_seed([3; 32]);
        assert!(matches!(
            sign_body(&keypair, &body),
            Err(WalletError::BodyTooLarge(512))
        ));
    }

    #[test]
    fn test_comment_roundtrip() {
        let text = "thanks for the coffee ☕ ".repeat(10);
        let cell = build_comment(&text).unwrap();
        let mut s = CellSlice::new(&cell);
        assert_eq!(s.load_u32().unwrap(), 0);
        assert_eq!(snake::load_snake_string(&mut s).unwrap(), text);
    }
}

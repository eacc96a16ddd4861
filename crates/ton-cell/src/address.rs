//! TON Message Address types.
//!
//! `MsgAddress` covers the TL-B address forms a message can carry. Internal
//! addresses parse from the raw `workchain:hex` form and from the 48-character
//! user-friendly base64 form (tag, workchain, hash, CRC16-XMODEM).

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

use crate::{CellError, CellResult};

const CRC16: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_XMODEM);

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TESTNET: u8 = 0x80;

/// Length of a user-friendly address string.
pub const USER_FRIENDLY_LEN: usize = 48;

/// TON Message Address.
///
/// # Example
///
/// ```
/// use ton_cell::MsgAddress;
///
/// let addr = MsgAddress::from_string(
///     "0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8",
/// ).unwrap();
/// let friendly = addr.to_user_friendly(true, false).unwrap();
/// assert_eq!(MsgAddress::from_string(&friendly).unwrap(), addr);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MsgAddress {
    /// No address (addr_none$00).
    #[default]
    Null,

    /// External address (addr_extern$01).
    External {
        /// Length in bits.
        len: u16,
        /// Address data.
        data: Vec<u8>,
    },

    /// Internal address (addr_std$10).
    Internal {
        /// Workchain ID (-1 for masterchain, 0 for basechain).
        workchain: i32,
        /// 256-bit address (account ID).
        address: [u8; 32],
    },
}

/// Flags carried by the tag byte of a user-friendly address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressFlags {
    pub bounceable: bool,
    pub testnet: bool,
}

impl Default for AddressFlags {
    fn default() -> Self {
        Self {
            bounceable: true,
            testnet: false,
        }
    }
}

impl MsgAddress {
    /// Parse an internal address from a string.
    ///
    /// Supported formats:
    /// - Raw: "workchain:hex_address" (e.g., "0:abc123...")
    /// - User-friendly base64, standard or URL-safe alphabet
    pub fn from_string(s: &str) -> CellResult<Self> {
        Self::parse_with_flags(s).map(|(addr, _)| addr)
    }

    /// Parse an address and report the flags of its user-friendly form.
    ///
    /// Raw addresses carry no flags and report the bounceable default.
    pub fn parse_with_flags(s: &str) -> CellResult<(Self, AddressFlags)> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CellError::InvalidAddress("empty address".to_string()));
        }

        if let Some((workchain_str, address_str)) = s.split_once(':') {
            let workchain: i8 = workchain_str
                .parse()
                .map_err(|_| CellError::InvalidAddress(format!("Invalid workchain: {workchain_str}")))?;

            let mut address = [0u8; 32];
            hex::decode_to_slice(address_str, &mut address).map_err(|e| {
                CellError::InvalidAddress(format!("Address hex must be 64 hex characters: {e}"))
            })?;

            return Ok((
                MsgAddress::Internal {
                    workchain: workchain as i32,
                    address,
                },
                AddressFlags::default(),
            ));
        }

        Self::from_user_friendly(s)
    }

    /// Parse a user-friendly address (base64 format).
    ///
    /// Format: 1 byte tag + 1 byte workchain + 32 bytes address + 2 bytes CRC16
    pub fn from_user_friendly(s: &str) -> CellResult<(Self, AddressFlags)> {
        if s.len() != USER_FRIENDLY_LEN {
            return Err(CellError::InvalidAddress(format!(
                "User-friendly address must be {USER_FRIENDLY_LEN} characters, got {}",
                s.len()
            )));
        }

        let standard_b64: String = s
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                c => c,
            })
            .collect();

        let bytes = STANDARD
            .decode(&standard_b64)
            .map_err(|e| CellError::InvalidBase64(e.to_string()))?;

        if bytes.len() != 36 {
            return Err(CellError::InvalidAddress(format!(
                "User-friendly address must be 36 bytes, got {}",
                bytes.len()
            )));
        }

        let expected_crc = u16::from_be_bytes([bytes[34], bytes[35]]);
        let actual_crc = CRC16.checksum(&bytes[..34]);
        if expected_crc != actual_crc {
            return Err(CellError::InvalidAddress(format!(
                "CRC16 mismatch: expected {expected_crc:04x}, got {actual_crc:04x}"
            )));
        }

        let tag = bytes[0];
        let bounceable = match tag & !TAG_TESTNET {
            TAG_BOUNCEABLE => true,
            TAG_NON_BOUNCEABLE => false,
            other => {
                return Err(CellError::InvalidAddress(format!("Unknown address tag 0x{other:02x}")));
            }
        };
        let flags = AddressFlags {
            bounceable,
            testnet: tag & TAG_TESTNET != 0,
        };

        let workchain = bytes[1] as i8 as i32;
        let mut address = [0u8; 32];
        address.copy_from_slice(&bytes[2..34]);

        Ok((MsgAddress::Internal { workchain, address }, flags))
    }

    /// Convert to raw string representation ("workchain:hex_address").
    pub fn to_raw_string(&self) -> String {
        match self {
            MsgAddress::Null => String::new(),
            MsgAddress::External { len, data } => format!("extern:{}:{}", len, hex::encode(data)),
            MsgAddress::Internal { workchain, address } => {
                format!("{}:{}", workchain, hex::encode(address))
            }
        }
    }

    /// Convert to the URL-safe user-friendly form. `None` for non-internal addresses.
    pub fn to_user_friendly(&self, bounceable: bool, testnet: bool) -> Option<String> {
        match self {
            MsgAddress::Internal { workchain, address } => {
                let mut data = Vec::with_capacity(36);

                let mut tag = if bounceable { TAG_BOUNCEABLE } else { TAG_NON_BOUNCEABLE };
                if testnet {
                    tag |= TAG_TESTNET;
                }
                data.push(tag);
                data.push(*workchain as i8 as u8);
                data.extend_from_slice(address);
                data.extend_from_slice(&CRC16.checksum(&data).to_be_bytes());

                Some(URL_SAFE_NO_PAD.encode(&data))
            }
            _ => None,
        }
    }

    /// Get the workchain ID (if internal address).
    pub fn workchain(&self) -> Option<i32> {
        match self {
            MsgAddress::Internal { workchain, .. } => Some(*workchain),
            _ => None,
        }
    }

    /// Get the 256-bit address hash (if internal address).
    pub fn hash_part(&self) -> Option<&[u8; 32]> {
        match self {
            MsgAddress::Internal { address, .. } => Some(address),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MsgAddress::Null)
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, MsgAddress::Internal { .. })
    }
}

impl std::fmt::Display for MsgAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_raw_string())
    }
}

impl std::str::FromStr for MsgAddress {
    type Err = CellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

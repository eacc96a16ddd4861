//! SHA256 hashing.

use sha2::{Digest, Sha256};

/// Compute SHA256 hash of the input data.
///
/// # Example
/// ```
/// use ton_crypto::sha256::sha256;
///
/// let hash = sha256(b"name");
/// assert_eq!(hash[0], 0x82);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

//! HMAC-SHA512 and PBKDF2-SHA512, the primitives behind TON mnemonic seeds.

use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Derive `output.len()` bytes with PBKDF2-HMAC-SHA512.
///
/// # Example
/// ```
/// use ton_crypto::kdf::pbkdf2_sha512;
///
/// let mut seed = [0u8; 64];
/// pbkdf2_sha512(b"entropy", b"TON default seed", 1, &mut seed);
/// assert_ne!(seed, [0u8; 64]);
/// ```
pub fn pbkdf2_sha512(password: &[u8], salt: &[u8], iterations: u32, output: &mut [u8]) {
    pbkdf2::pbkdf2_hmac::<Sha512>(password, salt, iterations, output);
}

/// Compute HMAC-SHA512 of `data` under `key`.
pub fn hmac_sha512(key: &[u8], data: &[u8]) -> [u8; 64] {
    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC can be initialized with any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_sha512_rfc4231_case_2() {
        let mac = hmac_sha512(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            hex::encode(mac),
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea2505549758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }

    #[test]
    fn test_pbkdf2_sha512_known_vector() {
        let mut out = [0u8; 64];
        pbkdf2_sha512(b"password", b"salt", 1, &mut out);
        assert_eq!(
            hex::encode(out),
            "867f70cf1ade02cff3752599a3a53dc4af34c7a669815ae5d513554e1c8cf252c02d470a285a0501bad999bfe943c08f050235d7d68b1da55e63f73b60a57fce"
        );
    }

    #[test]
    fn test_pbkdf2_prefix_stability() {
        let mut short = [0u8; 16];
        let mut long = [0u8; 64];
        pbkdf2_sha512(b"phrase", b"TON seed version", 3, &mut short);
        pbkdf2_sha512(b"phrase", b"TON seed version", 3, &mut long);
        assert_eq!(short, long[..16]);
    }
}

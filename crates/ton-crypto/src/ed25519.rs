//! Ed25519 signatures for TON wallets.
//!
//! Wallet contracts check an Ed25519 signature over the hash of the signed
//! part of every external message.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Errors that can occur during Ed25519 operations.
#[derive(Debug, Error)]
pub enum Ed25519Error {
    /// The provided key bytes are invalid.
    #[error("Invalid key bytes: {0}")]
    InvalidKey(String),

    /// The signature verification failed.
    #[error("Signature verification failed")]
    VerificationFailed,
}

/// An Ed25519 keypair derived from a 32-byte seed.
///
/// The seed is zeroized on drop and never printed by `Debug`.
///
/// # Example
/// ```
/// use ton_crypto::ed25519::Ed25519Keypair;
///
/// let keypair = Ed25519Keypair::from_seed([1u8; 32]);
/// let signature = keypair.sign(b"Hello, TON!");
/// assert!(keypair.verify(b"Hello, TON!", &signature).is_ok());
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Ed25519Keypair {
    seed: [u8; 32],
    #[zeroize(skip)]
    pub public_key: [u8; 32],
    /// `SigningKey` zeroizes itself on drop.
    #[zeroize(skip)]
    signing_key: SigningKey,
}

impl Ed25519Keypair {
    /// Generate a new random keypair from the OS RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        Self::from_seed(signing_key.to_bytes())
    }

    /// Create a keypair from a 32-byte seed (the first half of a TON private key).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let public_key = signing_key.verifying_key().to_bytes();
        Self {
            seed,
            public_key,
            signing_key,
        }
    }

    /// Create a keypair from a seed slice, which must be 32 bytes.
    pub fn from_seed_slice(bytes: &[u8]) -> Result<Self, Ed25519Error> {
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Ed25519Error::InvalidKey(format!("Expected 32 bytes, got {}", bytes.len())))?;
        Ok(Self::from_seed(seed))
    }

    /// Sign a message, returning the 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verify a signature against this keypair's public key.
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> Result<(), Ed25519Error> {
        verify_signature(&self.public_key, message, signature)
    }

    pub fn public_key_bytes(&self) -> &[u8; 32] {
        &self.public_key
    }

    /// The secret seed. Callers must not log or persist it.
    pub fn seed_bytes(&self) -> &[u8; 32] {
        &self.seed
    }
}

impl std::fmt::Debug for Ed25519Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Keypair")
            .field("public_key", &hex::encode(self.public_key))
            .field("seed", &"<redacted>")
            .finish()
    }
}

/// Verify a signature using only a public key.
pub fn verify_signature(
    public_key: &[u8; 32],
    message: &[u8],
    signature: &[u8; 64],
) -> Result<(), Ed25519Error> {
    let verifying_key =
        VerifyingKey::from_bytes(public_key).map_err(|e| Ed25519Error::InvalidKey(e.to_string()))?;
    verifying_key
        .verify(message, &Signature::from_bytes(signature))
        .map_err(|_| Ed25519Error::VerificationFailed)
}

//! TON Cryptography Library
//!
//! Primitives needed to own and operate a TON wallet:
//!
//! - **Ed25519**: signing external messages with the wallet key
//! - **SHA256**: cell hashes, metadata attribute keys
//! - **HMAC / PBKDF2 (SHA512)**: mnemonic-to-seed derivation
//!
//! # Example
//!
//! ```
//! use ton_crypto::{sha256, Ed25519Keypair};
//!
//! let keypair = Ed25519Keypair::from_seed([7u8; 32]);
//! let digest = sha256(b"body cell hash input");
//! let signature = keypair.sign(&digest);
//! assert!(keypair.verify(&digest, &signature).is_ok());
//! ```

pub mod ed25519;
pub mod kdf;
pub mod sha256;

pub use ed25519::{verify_signature, Ed25519Error, Ed25519Keypair};
pub use kdf::{hmac_sha512, pbkdf2_sha512};
pub use sha256::sha256;

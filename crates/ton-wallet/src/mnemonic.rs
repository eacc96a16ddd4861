//! TON mnemonic validation and key derivation
//!
//! TON phrases use the BIP39 English wordlist but not its checksum. The
//! phrase is turned into entropy with HMAC-SHA512, and a phrase without a
//! password is valid when PBKDF2 of that entropy under "TON seed version"
//! starts with a zero byte. The signing seed is PBKDF2 under
//! "TON default seed" with 100 000 iterations.

use bip39::Language;
use rand::Rng;
use rand::rngs::OsRng;
use ton_crypto::{Ed25519Keypair, hmac_sha512, pbkdf2_sha512};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{WalletError, WalletResult};

/// Phrase lengths accepted by TON wallets.
pub const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

const PBKDF2_ITERATIONS: u32 = 100_000;
const BASIC_SEED_ITERATIONS: u32 = PBKDF2_ITERATIONS / 256;
const SEED_SALT: &[u8] = b"TON default seed";
const BASIC_SEED_SALT: &[u8] = b"TON seed version";

/// Mnemonic phrase for wallet key derivation
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Mnemonic {
    words: Vec<String>,
}

impl Mnemonic {
    /// Generate a random phrase that passes the TON seed check.
    pub fn generate(word_count: usize) -> WalletResult<Self> {
        check_word_count(word_count)?;
        let wordlist = Language::English.word_list();
        let mut rng = OsRng;

        loop {
            let words = (0..word_count)
                .map(|_| wordlist[rng.gen_range(0..wordlist.len())].to_string())
                .collect();
            let mnemonic = Self { words };
            if mnemonic.is_basic_seed() {
                return Ok(mnemonic);
            }
        }
    }

    /// Parse a phrase, checking its length and every word.
    ///
    /// The word count is checked first, so a phrase of the wrong length is
    /// rejected without any hashing.
    pub fn from_phrase(phrase: &str) -> WalletResult<Self> {
        let words: Vec<String> = phrase
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();
        check_word_count(words.len())?;

        if let Some(bad) = words
            .iter()
            .find(|w| Language::English.find_word(w).is_none())
        {
            return Err(WalletError::InvalidWord(bad.clone()));
        }

        Ok(Self { words })
    }

    /// Parse a phrase and require it to pass the TON seed check.
    pub fn from_phrase_strict(phrase: &str) -> WalletResult<Self> {
        let mnemonic = Self::from_phrase(phrase)?;
        if !mnemonic.is_basic_seed() {
            return Err(WalletError::InvalidMnemonic(
                "phrase is not a TON seed (basic seed check failed)".to_string(),
            ));
        }
        Ok(mnemonic)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Convert to phrase string
    pub fn to_phrase(&self) -> Zeroizing<String> {
        Zeroizing::new(self.words.join(" "))
    }

    fn entropy(&self) -> Zeroizing<[u8; 64]> {
        Zeroizing::new(hmac_sha512(self.to_phrase().as_bytes(), b""))
    }

    /// TON's check for a phrase generated without a password.
    pub fn is_basic_seed(&self) -> bool {
        let entropy = self.entropy();
        let mut out = Zeroizing::new([0u8; 64]);
        pbkdf2_sha512(
            entropy.as_slice(),
            BASIC_SEED_SALT,
            BASIC_SEED_ITERATIONS,
            out.as_mut_slice(),
        );
        out[0] == 0
    }

    /// Derive the 64-byte TON seed.
    pub fn to_seed(&self) -> Zeroizing<[u8; 64]> {
        let entropy = self.entropy();
        let mut seed = Zeroizing::new([0u8; 64]);
        pbkdf2_sha512(
            entropy.as_slice(),
            SEED_SALT,
            PBKDF2_ITERATIONS,
            seed.as_mut_slice(),
        );
        seed
    }

    /// Derive the Ed25519 keypair from the first half of the seed.
    pub fn to_keypair(&self) -> Ed25519Keypair {
        let seed = self.to_seed();
        let mut ed_seed = [0u8; 32];
        ed_seed.copy_from_slice(&seed[..32]);
        let keypair = Ed25519Keypair::from_seed(ed_seed);
        ed_seed.zeroize();
        keypair
    }
}

fn check_word_count(count: usize) -> WalletResult<()> {
    if VALID_WORD_COUNTS.contains(&count) {
        Ok(())
    } else {
        Err(WalletError::WrongWordCount(count))
    }
}

impl std::fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mnemonic")
            .field("words", &"[REDACTED]")
            .field("word_count", &self.words.len())
            .finish()
    }
}

//! Message body encryption compatible with the Pincho mobile apps.
//!
//! AES-128-CBC with PKCS#7 padding. The key is the first half of the
//! lowercase hex SHA-1 digest of the passphrase, and the ciphertext is
//! emitted in a URL-safe Base64 variant (`+` → `-`, `/` → `.`, `=` → `_`).
//! The apps decrypt with exactly this scheme, so none of it can change.

use aes::cipher::BlockEncryptMut;
use aes::cipher::KeyIvInit;
use aes::cipher::block_padding::Pkcs7;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha1::Digest;
use sha1::Sha1;
use thiserror::Error;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

/// AES block size; also the IV length.
pub const BLOCK_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("failed to decode derived key: {0}")]
    KeyDecode(#[from] hex::FromHexError),
    #[error("invalid cipher parameters: {0}")]
    Cipher(String),
    #[error("failed to generate IV: {0}")]
    RandomSource(String),
}

/// Source of initialization vectors. One IV per encryption, never reused.
pub trait IvSource: Send + Sync {
    fn generate_iv(&self) -> Result<[u8; BLOCK_SIZE], CryptoError>;
}

/// IVs from the operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsIvSource;

impl IvSource for OsIvSource {
    fn generate_iv(&self) -> Result<[u8; BLOCK_SIZE], CryptoError> {
        let mut iv = [0u8; BLOCK_SIZE];
        OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|e| CryptoError::RandomSource(e.to_string()))?;
        Ok(iv)
    }
}

/// Ciphertext plus the hex IV the receiver needs to decrypt it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedMessage {
    pub ciphertext: String,
    pub iv_hex: String,
}

/// Standard padded Base64 with the three special characters swapped.
pub fn custom_base64_encode(data: &[u8]) -> String {
    STANDARD
        .encode(data)
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '.',
            '=' => '_',
            other => other,
        })
        .collect()
}

/// SHA-1(passphrase) → lowercase hex → first 32 hex chars → 16 key bytes.
pub fn derive_key(passphrase: &str) -> Result<[u8; BLOCK_SIZE], CryptoError> {
    let digest = Sha1::digest(passphrase.as_bytes());
    let hex_digest = hex::encode(digest);
    let mut key = [0u8; BLOCK_SIZE];
    hex::decode_to_slice(&hex_digest[..BLOCK_SIZE * 2], &mut key)?;
    Ok(key)
}

/// Encrypt `plaintext` under `passphrase` with the given IV.
///
/// Deterministic for fixed inputs. `iv` must be exactly [`BLOCK_SIZE`] bytes.
pub fn encrypt_message(plaintext: &str, passphrase: &str, iv: &[u8]) -> Result<String, CryptoError> {
    let key = derive_key(passphrase)?;
    let cipher = Aes128CbcEnc::new_from_slices(&key, iv)
        .map_err(|e| CryptoError::Cipher(e.to_string()))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
    Ok(custom_base64_encode(&ciphertext))
}

/// Encrypt with a fresh IV drawn from `source`.
pub fn encrypt_with_fresh_iv(
    plaintext: &str,
    passphrase: &str,
    source: &dyn IvSource,
) -> Result<EncryptedMessage, CryptoError> {
    let iv = source.generate_iv()?;
    Ok(EncryptedMessage {
        ciphertext: encrypt_message(plaintext, passphrase, &iv)?,
        iv_hex: hex::encode(iv),
    })
}

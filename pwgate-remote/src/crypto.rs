//! Symmetric primitives behind the AES Crypto Provider.
//!
//! Keys are 64 bytes: a 32-byte AES-256 encryption key followed by a 32-byte
//! HMAC-SHA256 key. Every ciphertext is encrypt-then-MAC.

use aes::Aes256;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cbc::{Decryptor, Encryptor};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use pwgate_core::CryptoError;

type HmacSha256 = Hmac<Sha256>;
type Aes256CbcDec = Decryptor<Aes256>;
type Aes256CbcEnc = Encryptor<Aes256>;

pub const KEY_LEN: usize = 64;
pub const IV_LEN: usize = 16;

/// Salt for the master key derivation. The passphrase is the only secret
/// input, so the salt only separates this use of PBKDF2 from others.
const MASTER_KEY_SALT: &[u8] = b"pwgate/master-key/v1";

/// A 64-byte key pair: 32 bytes encryption key + 32 bytes MAC key.
#[derive(Clone)]
pub struct Keys {
    data: Zeroizing<Vec<u8>>,
}

impl Keys {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError(format!(
                "expected {KEY_LEN}-byte key, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            data: Zeroizing::new(bytes.to_vec()),
        })
    }

    /// Fresh random key material.
    pub fn generate() -> Self {
        let mut data = Zeroizing::new(vec![0u8; KEY_LEN]);
        rand::rng().fill_bytes(&mut data);
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The 32-byte encryption key.
    pub fn enc_key(&self) -> &[u8] {
        &self.data[..32]
    }

    /// The 32-byte MAC key.
    pub fn mac_key(&self) -> &[u8] {
        &self.data[32..]
    }
}

impl std::fmt::Debug for Keys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Keys([redacted])")
    }
}

/// Stretch the passphrase into a 32-byte PBKDF2-HMAC-SHA256 key.
pub fn derive_master_key(
    passphrase: &[u8],
    iterations: u32,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if passphrase.is_empty() {
        return Err(CryptoError::new("master key passphrase is empty"));
    }
    if iterations == 0 {
        return Err(CryptoError::new("kdf iterations must be positive"));
    }
    let mut master_key = Zeroizing::new(vec![0u8; 32]);
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, MASTER_KEY_SALT, iterations, &mut master_key);
    Ok(master_key)
}

/// Expand the 32-byte master key into enc_key + mac_key via HKDF-SHA256.
pub fn expand_master_key(master_key: &[u8]) -> Result<Keys, CryptoError> {
    use hkdf::Hkdf;

    let hkdf = Hkdf::<Sha256>::from_prk(master_key)
        .map_err(|e| CryptoError(format!("hkdf from_prk: {e}")))?;

    let mut combined = Zeroizing::new(vec![0u8; KEY_LEN]);
    hkdf.expand(b"enc", &mut combined[..32])
        .map_err(|e| CryptoError(format!("hkdf expand enc: {e}")))?;
    hkdf.expand(b"mac", &mut combined[32..])
        .map_err(|e| CryptoError(format!("hkdf expand mac: {e}")))?;

    Keys::from_bytes(&combined)
}

/// AES-256-CBC encryption result: (IV, ciphertext, MAC).
pub type EncryptResult = (Vec<u8>, Vec<u8>, Vec<u8>);

/// Encrypt data using AES-256-CBC + HMAC-SHA256 over `iv || ciphertext`.
pub fn encrypt_symmetric(keys: &Keys, plaintext: &[u8]) -> Result<EncryptResult, CryptoError> {
    let mut iv = vec![0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    let pad_len = 16 - (plaintext.len() % 16);
    let mut buf = Zeroizing::new(vec![0u8; plaintext.len() + pad_len]);
    buf[..plaintext.len()].copy_from_slice(plaintext);

    let encryptor = Aes256CbcEnc::new_from_slices(keys.enc_key(), &iv)
        .map_err(|e| CryptoError(format!("aes init: {e}")))?;
    let ciphertext = encryptor
        .encrypt_padded_mut::<Pkcs7>(&mut buf, plaintext.len())
        .map_err(|e| CryptoError(format!("aes encrypt: {e}")))?
        .to_vec();

    let mut hmac = HmacSha256::new_from_slice(keys.mac_key())
        .map_err(|e| CryptoError(format!("hmac init: {e}")))?;
    hmac.update(&iv);
    hmac.update(&ciphertext);
    let mac = hmac.finalize().into_bytes().to_vec();

    Ok((iv, ciphertext, mac))
}

/// Decrypt data using AES-256-CBC after verifying the HMAC-SHA256 tag.
pub fn decrypt_symmetric(
    keys: &Keys,
    iv: &[u8],
    ciphertext: &[u8],
    mac: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let mut hmac = HmacSha256::new_from_slice(keys.mac_key())
        .map_err(|e| CryptoError(format!("hmac init: {e}")))?;
    hmac.update(iv);
    hmac.update(ciphertext);
    hmac.verify_slice(mac)
        .map_err(|_| CryptoError::new("MAC verification failed"))?;

    // buf holds plaintext after in-place decryption
    let mut buf = Zeroizing::new(ciphertext.to_vec());
    let decryptor = Aes256CbcDec::new_from_slices(keys.enc_key(), iv)
        .map_err(|e| CryptoError(format!("aes init: {e}")))?;
    let plaintext = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|e| CryptoError(format!("aes decrypt: {e}")))?;

    Ok(Zeroizing::new(plaintext.to_vec()))
}

pub fn b64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn b64_decode(s: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(s)
        .map_err(|e| CryptoError(format!("base64 decode: {e}")))
}

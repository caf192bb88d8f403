//! AES-256-CBC + HMAC-SHA256 implementation of [`CryptoProvider`].

use tracing::trace;
use zeroize::Zeroizing;

use pwgate_core::config::DEFAULT_KDF_ITERATIONS;
use pwgate_core::{CryptoError, CryptoProvider, Key};

use crate::cipher::CipherString;
use crate::crypto::{self, Keys};

/// Client-side crypto for vaults with a master key.
///
/// [`Key::ServerManaged`] maps to plain standard base64, the transport
/// encoding the server expects for data it encrypts itself.
#[derive(Debug, Clone)]
pub struct AesCryptoProvider {
    kdf_iterations: u32,
}

impl AesCryptoProvider {
    pub fn new(kdf_iterations: u32) -> Self {
        Self { kdf_iterations }
    }

    fn keys(key: &Key) -> Result<Option<Keys>, CryptoError> {
        key.material().map(Keys::from_bytes).transpose()
    }
}

impl Default for AesCryptoProvider {
    fn default() -> Self {
        Self::new(DEFAULT_KDF_ITERATIONS)
    }
}

impl CryptoProvider for AesCryptoProvider {
    fn encrypt(&self, plaintext: &[u8], key: &Key) -> Result<String, CryptoError> {
        match Self::keys(key)? {
            None => Ok(crypto::b64_encode(plaintext)),
            Some(keys) => Ok(CipherString::encrypt(&keys, plaintext)?.to_string()),
        }
    }

    fn decrypt(&self, ciphertext: &str, key: &Key) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        match Self::keys(key)? {
            None => crypto::b64_decode(ciphertext).map(Zeroizing::new),
            Some(keys) => CipherString::parse(ciphertext)?.decrypt(&keys),
        }
    }

    fn generate_key(&self) -> Result<Key, CryptoError> {
        let keys = Keys::generate();
        Ok(Key::symmetric(keys.as_bytes()))
    }

    fn derive_master_key(&self, passphrase: &str) -> Result<Key, CryptoError> {
        trace!(iterations = self.kdf_iterations, "deriving master key");
        let stretched = crypto::derive_master_key(passphrase.as_bytes(), self.kdf_iterations)?;
        let keys = crypto::expand_master_key(&stretched)?;
        Ok(Key::symmetric(keys.as_bytes()))
    }

    fn key_from_bytes(&self, bytes: &[u8]) -> Result<Key, CryptoError> {
        let keys = Keys::from_bytes(bytes)?;
        Ok(Key::symmetric(keys.as_bytes()))
    }
}

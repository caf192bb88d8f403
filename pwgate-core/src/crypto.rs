//! Crypto Provider boundary and key types.
//!
//! The orchestration layer never touches cipher primitives directly. It asks a
//! [`CryptoProvider`] to encrypt, decrypt and generate keys, and passes
//! [`Key`] values around for the duration of a single operation.

use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Raw symmetric key material, scrubbed on drop.
#[derive(Clone)]
pub struct KeyMaterial(Zeroizing<Vec<u8>>);

impl KeyMaterial {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(Zeroizing::new(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial([redacted])")
    }
}

/// A working key for one cryptographic step.
#[derive(Clone, Debug)]
pub enum Key {
    /// The server owns encryption for this vault; the client only applies the
    /// server's transport encoding.
    ServerManaged,
    /// Client-held symmetric key material.
    Symmetric(KeyMaterial),
}

impl Key {
    pub fn symmetric(bytes: &[u8]) -> Self {
        Self::Symmetric(KeyMaterial::from_slice(bytes))
    }

    pub fn is_server_managed(&self) -> bool {
        matches!(self, Self::ServerManaged)
    }

    /// Key bytes, or `None` for the server-managed sentinel.
    pub fn material(&self) -> Option<&[u8]> {
        match self {
            Self::ServerManaged => None,
            Self::Symmetric(m) => Some(m.as_bytes()),
        }
    }
}

/// A key encrypted under another key, in the provider's ciphertext format.
#[derive(Clone, PartialEq, Eq)]
pub struct WrappedKey(String);

impl WrappedKey {
    pub fn new(ciphertext: String) -> Self {
        Self(ciphertext)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for WrappedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WrappedKey([redacted])")
    }
}

/// Cryptographic primitives used by the envelope-key layer.
///
/// Implementations must accept [`Key::ServerManaged`] for `encrypt` and
/// `decrypt`, applying whatever reversible encoding the server expects for
/// data it encrypts itself.
pub trait CryptoProvider: Send + Sync {
    /// Encrypt `plaintext` under `key`, returning the serialized ciphertext.
    fn encrypt(&self, plaintext: &[u8], key: &Key) -> Result<String, CryptoError>;

    /// Decrypt a serialized ciphertext produced by [`encrypt`](Self::encrypt).
    fn decrypt(&self, ciphertext: &str, key: &Key) -> Result<Zeroizing<Vec<u8>>, CryptoError>;

    /// Generate a fresh random symmetric key.
    fn generate_key(&self) -> Result<Key, CryptoError>;

    /// Turn the user-supplied master key passphrase into key material.
    fn derive_master_key(&self, passphrase: &str) -> Result<Key, CryptoError>;

    /// Build a key from raw unwrapped bytes, checking the expected length.
    fn key_from_bytes(&self, bytes: &[u8]) -> Result<Key, CryptoError>;
}

//! Cipher string encoding.
//!
//! Ciphertext travels as `2.{iv_b64}|{ct_b64}|{mac_b64}`: type 2 is
//! AES-256-CBC + HMAC-SHA256. The MAC part is mandatory.

use std::fmt;

use zeroize::Zeroizing;

use pwgate_core::CryptoError;

use crate::crypto::{self, Keys};

const AES_CBC_HMAC: u8 = 2;

/// A parsed type-2 cipher string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherString {
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    mac: Vec<u8>,
}

impl CipherString {
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        let (type_str, data) = s
            .split_once('.')
            .ok_or_else(|| CryptoError::new("cipher string: missing type separator"))?;

        let cipher_type: u8 = type_str
            .parse()
            .map_err(|_| CryptoError(format!("cipher string: invalid type {type_str:?}")))?;
        if cipher_type != AES_CBC_HMAC {
            return Err(CryptoError(format!(
                "cipher string: unsupported type {cipher_type}"
            )));
        }

        let parts: Vec<&str> = data.split('|').collect();
        let [iv, ct, mac] = parts.as_slice() else {
            return Err(CryptoError(format!(
                "cipher string has {} parts, expected 3",
                parts.len()
            )));
        };

        let iv = crypto::b64_decode(iv)?;
        if iv.len() != crypto::IV_LEN {
            return Err(CryptoError(format!(
                "cipher string: expected {}-byte IV, got {}",
                crypto::IV_LEN,
                iv.len()
            )));
        }
        Ok(Self {
            iv,
            ciphertext: crypto::b64_decode(ct)?,
            mac: crypto::b64_decode(mac)?,
        })
    }

    /// Encrypt `plaintext` under `keys` with a fresh IV.
    pub fn encrypt(keys: &Keys, plaintext: &[u8]) -> Result<Self, CryptoError> {
        let (iv, ciphertext, mac) = crypto::encrypt_symmetric(keys, plaintext)?;
        Ok(Self {
            iv,
            ciphertext,
            mac,
        })
    }

    pub fn decrypt(&self, keys: &Keys) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        crypto::decrypt_symmetric(keys, &self.iv, &self.ciphertext, &self.mac)
    }
}

impl fmt::Display for CipherString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{AES_CBC_HMAC}.{}|{}|{}",
            crypto::b64_encode(&self.iv),
            crypto::b64_encode(&self.ciphertext),
            crypto::b64_encode(&self.mac),
        )
    }
}

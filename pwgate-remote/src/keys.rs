//! Envelope-key manager.
//!
//! master key -> vault key -> optional per-item key -> secret fields.
//! Keys are derived for the operation at hand and dropped with it.

use tracing::{debug, trace};

use pwgate_core::args::{AttachmentInput, CustomFieldInput, SecretFields, SecretString};
use pwgate_core::{
    Attachment, CryptoProvider, CustomField, EncryptedPayload, Key, KeyEncryptionMode,
    PlainAttachment, PlainCustomField, PlaintextSecret, Secret, Vault, VaultError, WrappedKey,
};
use zeroize::Zeroizing;

/// Unwrap the vault key with the master key.
///
/// Without a master key, or for a vault that carries no wrapped key, the
/// vault is server-managed and the sentinel key is returned.
pub fn vault_key(
    crypto: &dyn CryptoProvider,
    vault: &Vault,
    master: Option<&Key>,
) -> Result<Key, VaultError> {
    let wrapped = vault.encrypted_key.as_deref().filter(|k| !k.is_empty());
    let (Some(master), Some(wrapped)) = (master, wrapped) else {
        trace!(vault = %vault.name, "server-managed vault key");
        return Ok(Key::ServerManaged);
    };

    let bytes = crypto.decrypt(wrapped, master).map_err(|e| {
        VaultError::KeyDerivation(format!("unwrapping key of vault {:?}: {e}", vault.name))
    })?;
    crypto.key_from_bytes(&bytes).map_err(|e| {
        VaultError::KeyDerivation(format!("unwrapping key of vault {:?}: {e}", vault.name))
    })
}

/// The key a stored secret's fields are encrypted with: its own item key if
/// it carries one, otherwise the vault key.
pub fn read_key(
    crypto: &dyn CryptoProvider,
    secret: &Secret,
    vault_key: &Key,
) -> Result<Key, VaultError> {
    if vault_key.is_server_managed() {
        return Ok(Key::ServerManaged);
    }
    match secret.crypted_key.as_deref().filter(|k| !k.is_empty()) {
        None => Ok(vault_key.clone()),
        Some(wrapped) => {
            let unwrap_err = |e| {
                VaultError::KeyDerivation(format!("unwrapping item key of {:?}: {e}", secret.name))
            };
            let bytes = crypto.decrypt(wrapped, vault_key).map_err(unwrap_err)?;
            crypto.key_from_bytes(&bytes).map_err(unwrap_err)
        }
    }
}

/// The key new secret material is encrypted with.
///
/// Vaults in item-key mode get a fresh random key per write, returned along
/// with its wrapping under the vault key.
pub fn write_key(
    crypto: &dyn CryptoProvider,
    vault: &Vault,
    vault_key: &Key,
) -> Result<(Key, Option<WrappedKey>), VaultError> {
    if vault_key.is_server_managed() || vault.key_encryption_mode != KeyEncryptionMode::ItemKey {
        return Ok((vault_key.clone(), None));
    }
    let (item_key, wrapped) = item_key(crypto, vault_key)?;
    debug!(vault = %vault.name, "generated item key");
    Ok((item_key, Some(wrapped)))
}

/// A fresh random item key and its wrapping under `vault_key`.
pub fn item_key(
    crypto: &dyn CryptoProvider,
    vault_key: &Key,
) -> Result<(Key, WrappedKey), VaultError> {
    let key = crypto
        .generate_key()
        .map_err(|e| VaultError::KeyDerivation(format!("generating item key: {e}")))?;
    let wrapped = wrap_key(crypto, &key, vault_key)?;
    Ok((key, wrapped))
}

fn wrap_key(crypto: &dyn CryptoProvider, key: &Key, under: &Key) -> Result<WrappedKey, VaultError> {
    let material = key.material().ok_or_else(|| {
        VaultError::KeyDerivation("cannot wrap the server-managed key".to_string())
    })?;
    crypto
        .encrypt(material, under)
        .map(WrappedKey::new)
        .map_err(|e| VaultError::KeyDerivation(format!("wrapping key: {e}")))
}

/// A fresh vault key wrapped under the master key, for vault creation.
/// `None` without a master key: the server manages the new vault's key.
pub fn new_vault_key(
    crypto: &dyn CryptoProvider,
    master: Option<&Key>,
) -> Result<Option<WrappedKey>, VaultError> {
    let Some(master) = master else {
        return Ok(None);
    };
    let key = crypto
        .generate_key()
        .map_err(|e| VaultError::KeyDerivation(format!("generating vault key: {e}")))?;
    wrap_key(crypto, &key, master).map(Some)
}

fn decrypt_field(
    crypto: &dyn CryptoProvider,
    ciphertext: &str,
    key: &Key,
    what: &str,
) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    crypto
        .decrypt(ciphertext, key)
        .map_err(|e| VaultError::Decryption(format!("{what}: {e}")))
}

fn decrypt_text(
    crypto: &dyn CryptoProvider,
    ciphertext: &str,
    key: &Key,
    what: &str,
) -> Result<Zeroizing<String>, VaultError> {
    let bytes = decrypt_field(crypto, ciphertext, key, what)?;
    let text = std::str::from_utf8(&bytes)
        .map_err(|e| VaultError::Decryption(format!("{what}: invalid UTF-8: {e}")))?;
    Ok(Zeroizing::new(text.to_string()))
}

/// Decrypt every secret-bearing field. Any failure fails the whole secret.
pub fn decrypt_secret(
    crypto: &dyn CryptoProvider,
    secret: Secret,
    key: &Key,
) -> Result<PlaintextSecret, VaultError> {
    let password = secret
        .crypted_password
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| decrypt_text(crypto, p, key, "password"))
        .transpose()?;

    let custom = secret
        .custom
        .iter()
        .map(|c| {
            Ok(PlainCustomField {
                name: c.name.clone(),
                value: decrypt_text(crypto, &c.value, key, &format!("custom field {:?}", c.name))?,
                field_type: c.field_type.clone(),
            })
        })
        .collect::<Result<Vec<_>, VaultError>>()?;

    let attachments = secret
        .attachments
        .iter()
        .map(|a| {
            Ok(PlainAttachment {
                id: a.id.clone(),
                name: a.name.clone(),
                data: decrypt_field(
                    crypto,
                    &a.encrypted_data,
                    key,
                    &format!("attachment {:?}", a.name),
                )?,
            })
        })
        .collect::<Result<Vec<_>, VaultError>>()?;

    trace!(secret = %secret.name, "decrypted secret");
    Ok(PlaintextSecret {
        secret,
        password,
        custom,
        attachments,
    })
}

/// Encrypt the supplied secret-bearing fields under `key`.
///
/// Custom fields are validated before anything is encrypted.
pub fn encrypt_secret(
    crypto: &dyn CryptoProvider,
    fields: &SecretFields,
    key: &Key,
    wrapped_key: Option<WrappedKey>,
) -> Result<EncryptedPayload, VaultError> {
    fields.validate()?;
    encrypt_fields(crypto, fields, key, wrapped_key)
}

/// Encrypt fields as given, without the input shape check.
fn encrypt_fields(
    crypto: &dyn CryptoProvider,
    fields: &SecretFields,
    key: &Key,
    wrapped_key: Option<WrappedKey>,
) -> Result<EncryptedPayload, VaultError> {
    let encrypt = |plaintext: &[u8], what: &str| {
        crypto
            .encrypt(plaintext, key)
            .map_err(|e| VaultError::KeyDerivation(format!("encrypting {what}: {e}")))
    };

    let crypted_password = fields
        .password
        .as_ref()
        .map(|p| encrypt(p.as_str().as_bytes(), "password"))
        .transpose()?;

    let custom = fields
        .custom
        .as_ref()
        .map(|list| {
            list.iter()
                .map(|c| {
                    Ok(CustomField {
                        name: c.name.clone(),
                        value: encrypt(c.value.as_str().as_bytes(), "custom field")?,
                        field_type: c.field_type.clone(),
                    })
                })
                .collect::<Result<Vec<_>, VaultError>>()
        })
        .transpose()?;

    let attachments = fields
        .attachments
        .as_ref()
        .map(|list| {
            list.iter()
                .map(|a| {
                    Ok(Attachment {
                        id: None,
                        name: a.name.clone(),
                        encrypted_data: encrypt(&a.data, "attachment")?,
                    })
                })
                .collect::<Result<Vec<_>, VaultError>>()
        })
        .transpose()?;

    Ok(EncryptedPayload {
        crypted_password,
        crypted_key: wrapped_key.map(WrappedKey::into_string),
        custom,
        attachments,
    })
}

/// Merge `changes` over the stored material of `secret` and encrypt the
/// result under `new_key`, so the record never mixes keys.
///
/// Only `changes` is validated. Stored fields are carried over as they are.
pub fn reencrypt_secret(
    crypto: &dyn CryptoProvider,
    secret: &Secret,
    old_key: &Key,
    changes: &SecretFields,
    new_key: &Key,
    wrapped_key: Option<WrappedKey>,
) -> Result<EncryptedPayload, VaultError> {
    changes.validate()?;
    let stored = decrypt_secret(crypto, secret.clone(), old_key)?;

    let stored_password = stored
        .password
        .as_ref()
        .map(|p| SecretString::new(p.as_str()));
    let merged = SecretFields {
        password: changes.password.clone().or(stored_password),
        custom: Some(match &changes.custom {
            Some(custom) => custom.clone(),
            None => stored
                .custom
                .iter()
                .map(|c| CustomFieldInput::new(&c.name, &c.value, &c.field_type))
                .collect(),
        }),
        attachments: Some(match &changes.attachments {
            Some(attachments) => attachments.clone(),
            None => stored
                .attachments
                .iter()
                .map(|a| AttachmentInput {
                    name: a.name.clone(),
                    data: a.data.clone(),
                })
                .collect(),
        }),
    };

    encrypt_fields(crypto, &merged, new_key, wrapped_key)
}

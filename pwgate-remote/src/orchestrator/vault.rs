//! Vault operations.

use tracing::info;

use pwgate_core::args::{Addressing, NewVault};
use pwgate_core::{KeyEncryptionMode, Vault, VaultError, VaultPayload};

use crate::keys;
use crate::resolver;
use crate::session::Session;

pub async fn list(session: &Session) -> Result<Vec<Vault>, VaultError> {
    session.api().list_vaults().await
}

pub async fn get(session: &Session, target: Addressing<String>) -> Result<Vault, VaultError> {
    match target {
        Addressing::Id(id) => session.api().get_vault(&id).await,
        Addressing::Search(name) => resolver::find_vault(session.api(), &name).await,
    }
}

/// Create a vault. With a master key the new vault key is generated and
/// wrapped client-side; without one the server manages it.
pub async fn create(session: &Session, new: NewVault) -> Result<Vault, VaultError> {
    let master = session.master_key()?;
    let wrapped = keys::new_vault_key(session.crypto(), master.as_ref())?;
    let payload = VaultPayload {
        name: new.name,
        encrypted_key: wrapped.map(|w| w.into_string()),
        key_encryption_mode: if new.per_item_keys {
            KeyEncryptionMode::ItemKey
        } else {
            KeyEncryptionMode::VaultKey
        },
    };
    let vault = session.api().create_vault(&payload).await?;
    info!(vault = %vault.name, id = %vault.id, "vault created");
    Ok(vault)
}

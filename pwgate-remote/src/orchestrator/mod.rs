//! Entity orchestrators.
//!
//! Every operation runs in two phases on an open [`Session`]: first resolve
//! names to IDs and build the outgoing request (all local and resolution
//! failures happen here, before anything is changed), then make the call and
//! decrypt what comes back.

pub mod folder;
pub mod secret;
pub mod vault;

use pwgate_core::{Key, Vault, VaultError};

use crate::keys;
use crate::session::Session;

/// Derive the key of `vault` for this operation.
pub(crate) fn unlock(session: &Session, vault: &Vault) -> Result<Key, VaultError> {
    let master = session.master_key()?;
    keys::vault_key(session.crypto(), vault, master.as_ref())
}

/// Fetch a vault by ID and derive its key.
pub(crate) async fn unlock_by_id(
    session: &Session,
    vault_id: &str,
) -> Result<(Vault, Key), VaultError> {
    let vault = session.api().get_vault(vault_id).await?;
    let key = unlock(session, &vault)?;
    Ok((vault, key))
}

//! Secret operations.
//!
//! Reads come back decrypted. Writes encrypt under a key derived for the
//! call: the vault key, or a fresh item key for vaults in item-key mode.

use tracing::{debug, info};

use pwgate_core::args::{
    Addressing, NewSecret, SecretFields, SecretMove, SecretSearch, SecretTarget, SecretUpdate,
};
use pwgate_core::{
    EncryptedPayload, Key, MovePayload, PlaintextSecret, Secret, SecretPath,
    SecretPayload, Vault, VaultError, WrappedKey,
};

use crate::keys;
use crate::orchestrator::{unlock, unlock_by_id};
use crate::resolver;
use crate::session::Session;

/// Server-side search. Results are metadata only, in relevance order.
pub async fn search(session: &Session, search: SecretSearch) -> Result<Vec<Secret>, VaultError> {
    let api = session.api();
    let query = resolver::secret_query(api, &search).await?;
    let found = api.search_secrets(&query).await?;
    debug!(query = %query.query, count = found.len(), "secret search");
    Ok(found)
}

/// Decrypt a fetched secret with its vault's key.
async fn reveal(session: &Session, secret: Secret) -> Result<PlaintextSecret, VaultError> {
    let (_, vault_key) = unlock_by_id(session, &secret.vault_id).await?;
    let key = keys::read_key(session.crypto(), &secret, &vault_key)?;
    keys::decrypt_secret(session.crypto(), secret, &key)
}

pub async fn get(session: &Session, id: String) -> Result<PlaintextSecret, VaultError> {
    let secret = session.api().get_secret(&id).await?;
    reveal(session, secret).await
}

/// Read the secret a path names. `None` when the leaf does not exist.
pub async fn get_by_path(
    session: &Session,
    path: &SecretPath,
) -> Result<Option<PlaintextSecret>, VaultError> {
    match resolver::lookup_path(session.api(), path).await? {
        Some(secret) => reveal(session, secret).await.map(Some),
        None => Ok(None),
    }
}

async fn target(session: &Session, target: &SecretTarget) -> Result<Secret, VaultError> {
    match target {
        Addressing::Id(id) => session.api().get_secret(id).await,
        Addressing::Search(search) => resolver::find_secret(session.api(), search).await,
    }
}

/// Folder ID for an optional folder reference inside `vault_id`.
async fn folder_id(
    session: &Session,
    reference: Option<&str>,
    vault_id: &str,
) -> Result<Option<String>, VaultError> {
    match reference {
        Some(r) => Ok(Some(resolver::find_folder_ref(session.api(), r, vault_id).await?.id)),
        None => Ok(None),
    }
}

pub async fn create(session: &Session, new: NewSecret) -> Result<Secret, VaultError> {
    let api = session.api();
    let vault = resolver::find_vault(api, &new.vault).await?;
    let folder_id = folder_id(session, new.folder.as_deref(), &vault.id).await?;

    let vault_key = unlock(session, &vault)?;
    let (key, wrapped) = keys::write_key(session.crypto(), &vault, &vault_key)?;
    let encrypted = keys::encrypt_secret(session.crypto(), &new.fields, &key, wrapped)?;

    let payload = SecretPayload::builder()
        .vault_id(vault.id.as_str())
        .folder_id(folder_id)
        .name(Some(new.name))
        .login(new.login)
        .url(new.url)
        .description(new.description)
        .tags((!new.tags.is_empty()).then_some(new.tags))
        .color(new.color)
        .shortcut_id(new.shortcut_id)
        .snapshot(new.snapshot)
        .encrypted(encrypted)
        .build();
    let secret = api.create_secret(&payload).await?;
    info!(secret = %secret.name, id = %secret.id, vault = %vault.name, "secret created");
    Ok(secret)
}

/// Key for rewriting `secret` into `vault`.
///
/// A secret that already carries an item key keeps one even in a vault
/// that no longer requires it: a partial update cannot clear `cryptedKey`.
fn rewrite_key(
    session: &Session,
    vault: &Vault,
    vault_key: &Key,
    secret: &Secret,
) -> Result<(Key, Option<WrappedKey>), VaultError> {
    let (key, wrapped) = keys::write_key(session.crypto(), vault, vault_key)?;
    let has_item_key = secret.crypted_key.as_deref().is_some_and(|k| !k.is_empty());
    if wrapped.is_none() && has_item_key && !vault_key.is_server_managed() {
        let (key, wrapped) = keys::item_key(session.crypto(), vault_key)?;
        return Ok((key, Some(wrapped)));
    }
    Ok((key, wrapped))
}

/// Apply `update.changes` to the targeted secret.
///
/// Changing any secret-bearing field re-encrypts all of them under a fresh
/// write key.
pub async fn update(session: &Session, update: SecretUpdate) -> Result<Secret, VaultError> {
    let api = session.api();
    let secret = target(session, &update.target).await?;
    let changes = update.changes;

    let folder = match changes.folder {
        None => None,
        Some(reference) => Some(folder_id(session, reference.as_deref(), &secret.vault_id).await?),
    };

    let encrypted = if changes.fields.is_empty() {
        EncryptedPayload::default()
    } else {
        let (vault, vault_key) = unlock_by_id(session, &secret.vault_id).await?;
        let old_key = keys::read_key(session.crypto(), &secret, &vault_key)?;
        let (new_key, wrapped) = rewrite_key(session, &vault, &vault_key, &secret)?;
        keys::reencrypt_secret(
            session.crypto(),
            &secret,
            &old_key,
            &changes.fields,
            &new_key,
            wrapped,
        )?
    };

    let mut builder = SecretPayload::builder()
        .name(changes.name)
        .login(changes.login)
        .url(changes.url)
        .description(changes.description)
        .tags(changes.tags)
        .color(changes.color)
        .encrypted(encrypted);
    if let Some(folder) = folder {
        builder = builder.folder_id(folder);
    }

    let updated = api.update_secret(&secret.id, &builder.build()).await?;
    info!(secret = %updated.name, id = %updated.id, "secret updated");
    Ok(updated)
}

/// Delete the targeted secret. Returns its ID.
pub async fn delete(session: &Session, target_ref: SecretTarget) -> Result<String, VaultError> {
    let id = match target_ref {
        Addressing::Id(id) => id,
        search => target(session, &search).await?.id,
    };
    session.api().delete_secret(&id).await?;
    info!(id = %id, "secret deleted");
    Ok(id)
}

/// Move the targeted secret to another vault and/or folder.
///
/// Crossing vaults re-encrypts the secret under the destination's write key
/// unless both vaults are server-managed.
pub async fn move_to(session: &Session, request: SecretMove) -> Result<Secret, VaultError> {
    let api = session.api();
    let secret = target(session, &request.target).await?;
    let dest = resolver::find_vault(api, &request.vault).await?;
    let folder_id = folder_id(session, request.folder.as_deref(), &dest.id).await?;

    let mut payload = MovePayload::new(dest.id.as_str(), folder_id);
    if dest.id != secret.vault_id {
        let (_, source_key) = unlock_by_id(session, &secret.vault_id).await?;
        let dest_key = unlock(session, &dest)?;
        let both_server_managed = source_key.is_server_managed() && dest_key.is_server_managed();
        if !both_server_managed && secret.has_secret_material() {
            let old_key = keys::read_key(session.crypto(), &secret, &source_key)?;
            let (new_key, wrapped) = rewrite_key(session, &dest, &dest_key, &secret)?;
            let encrypted = keys::reencrypt_secret(
                session.crypto(),
                &secret,
                &old_key,
                &SecretFields::default(),
                &new_key,
                wrapped,
            )?;
            payload = payload.with_encrypted(encrypted);
            debug!(id = %secret.id, "re-encrypted for destination vault");
        }
    }

    let moved = api.move_secret(&secret.id, &payload).await?;
    info!(id = %moved.id, vault = %dest.name, "secret moved");
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::vault;
    use crate::testing::MemoryServer;
    use pwgate_core::args::{CustomFieldInput, NewVault, SecretChanges, SecretString};
    use pwgate_core::KeyEncryptionMode;

    fn new_secret(vault: &str, folder: Option<&str>, name: &str, password: &str) -> NewSecret {
        NewSecret {
            vault: vault.to_string(),
            folder: folder.map(str::to_string),
            name: name.to_string(),
            login: Some("root".to_string()),
            url: None,
            description: None,
            shortcut_id: None,
            tags: vec![],
            snapshot: None,
            color: None,
            fields: SecretFields {
                password: Some(SecretString::new(password)),
                custom: Some(vec![CustomFieldInput::new("port", "3306", "text")]),
                attachments: None,
            },
        }
    }

    fn by_name(query: &str) -> SecretTarget {
        Addressing::Search(SecretSearch {
            query: query.to_string(),
            ..SecretSearch::default()
        })
    }

    fn password(plain: &PlaintextSecret) -> Option<&str> {
        plain.password.as_ref().map(|p| p.as_str())
    }

    /// Vault "Infra" with a root folder "DB", server-managed.
    fn infra() -> (MemoryServer, String, String) {
        let server = MemoryServer::new();
        let v = server.add_vault("Infra", None, KeyEncryptionMode::VaultKey);
        let db = server.add_folder("DB", &v, None);
        (server, v, db)
    }

    #[tokio::test]
    async fn path_resolves_to_secret_and_decrypts() {
        let (server, _, db) = infra();
        let s = server.session(None);
        let created = create(&s, new_secret("Infra", Some("DB"), "prod-mysql", "hunter2"))
            .await
            .unwrap();
        assert_eq!(created.folder_id.as_deref(), Some(db.as_str()));
        assert_eq!(created.crypted_password.as_deref(), Some("aHVudGVyMg=="));

        let path = SecretPath::parse("Infra/DB/prod-mysql").unwrap();
        let plain = get_by_path(&s, &path).await.unwrap().unwrap();
        assert_eq!(plain.secret.id, created.id);
        assert_eq!(password(&plain), Some("hunter2"));
        assert_eq!(plain.custom[0].value.as_str(), "3306");
        s.release().await.unwrap();
    }

    #[tokio::test]
    async fn missing_leaf_is_empty_but_missing_folder_is_not() {
        let (server, v, db) = infra();
        server.add_secret("prod-mysql", &v, Some(&db));
        let s = server.session(None);

        let missing = SecretPath::parse("Infra/DB/missing").unwrap();
        assert!(get_by_path(&s, &missing).await.unwrap().is_none());

        let no_folder = SecretPath::parse("Infra/Web/prod-mysql").unwrap();
        let err = get_by_path(&s, &no_folder).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
        s.release().await.unwrap();
    }

    #[tokio::test]
    async fn leaf_must_sit_in_the_named_folder() {
        let (server, v, _) = infra();
        server.add_secret("prod-mysql", &v, None);
        let s = server.session(None);

        let path = SecretPath::parse("Infra/DB/prod-mysql").unwrap();
        assert!(get_by_path(&s, &path).await.unwrap().is_none());
        let root = SecretPath::parse("Infra/prod-mysql").unwrap();
        assert!(get_by_path(&s, &root).await.unwrap().is_some());
        s.release().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_root_folder_is_ambiguous() {
        let (server, v, db) = infra();
        server.add_secret("prod-mysql", &v, Some(&db));
        server.add_folder("DB", &v, None);
        let s = server.session(None);

        let path = SecretPath::parse("Infra/DB/prod-mysql").unwrap();
        match get_by_path(&s, &path).await.unwrap_err() {
            VaultError::AmbiguousEntity { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        s.release().await.unwrap();
    }

    #[tokio::test]
    async fn unresolvable_folder_prevents_create() {
        let (server, _, _) = infra();
        let s = server.session(None);
        let err = create(&s, new_secret("Infra", Some("Web"), "nginx", "pw"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert!(server.mutations().is_empty());
        s.release().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_custom_field_prevents_create() {
        let (server, _, _) = infra();
        let s = server.session(None);
        let mut new = new_secret("Infra", None, "nginx", "pw");
        new.fields.custom = Some(vec![CustomFieldInput::new("port", "", "text")]);
        let err = create(&s, new).await.unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(server.mutations().is_empty());
        s.release().await.unwrap();
    }

    #[tokio::test]
    async fn item_key_vault_round_trip() {
        let server = MemoryServer::new();
        let s = server.session(Some("correct horse"));
        vault::create(
            &s,
            NewVault {
                name: "Infra".to_string(),
                per_item_keys: true,
            },
        )
        .await
        .unwrap();

        let created = create(&s, new_secret("Infra", None, "prod-mysql", "hunter2"))
            .await
            .unwrap();
        let stored = server.secret(&created.id).unwrap();
        assert!(stored.crypted_key.is_some());
        assert!(stored.crypted_password.as_deref().unwrap().starts_with("2."));

        let plain = get(&s, created.id.clone()).await.unwrap();
        assert_eq!(password(&plain), Some("hunter2"));
        assert_eq!(plain.custom[0].value.as_str(), "3306");
        s.release().await.unwrap();
    }

    #[tokio::test]
    async fn wrong_master_key_fails_key_derivation() {
        let server = MemoryServer::new();
        let s = server.session(Some("correct horse"));
        vault::create(
            &s,
            NewVault {
                name: "Infra".to_string(),
                per_item_keys: false,
            },
        )
        .await
        .unwrap();
        let created = create(&s, new_secret("Infra", None, "prod-mysql", "hunter2"))
            .await
            .unwrap();
        s.release().await.unwrap();

        let other = server.session(Some("battery staple"));
        let err = get(&other, created.id).await.unwrap_err();
        assert_eq!(err.kind(), "key_derivation");
        other.release().await.unwrap();
    }

    #[tokio::test]
    async fn password_update_keeps_other_fields_readable() {
        let server = MemoryServer::new();
        let s = server.session(Some("correct horse"));
        vault::create(
            &s,
            NewVault {
                name: "Infra".to_string(),
                per_item_keys: true,
            },
        )
        .await
        .unwrap();
        let created = create(&s, new_secret("Infra", None, "prod-mysql", "hunter2"))
            .await
            .unwrap();
        let old_item_key = server.secret(&created.id).unwrap().crypted_key;

        update(
            &s,
            SecretUpdate {
                target: by_name("prod-mysql"),
                changes: SecretChanges {
                    fields: SecretFields {
                        password: Some(SecretString::new("rotated")),
                        ..SecretFields::default()
                    },
                    ..SecretChanges::default()
                },
            },
        )
        .await
        .unwrap();

        assert_ne!(server.secret(&created.id).unwrap().crypted_key, old_item_key);
        let plain = get(&s, created.id).await.unwrap();
        assert_eq!(password(&plain), Some("rotated"));
        assert_eq!(plain.custom[0].value.as_str(), "3306");
        s.release().await.unwrap();
    }

    #[tokio::test]
    async fn search_target_needs_exact_name() {
        let (server, v, _) = infra();
        let exact = server.add_secret("prod", &v, None);
        server.add_secret("prod-mysql", &v, None);
        let s = server.session(None);

        let id = delete(&s, by_name("prod")).await.unwrap();
        assert_eq!(id, exact);

        let err = delete(&s, by_name("prod")).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(server.mutations(), vec![format!("delete_secret {exact}")]);
        s.release().await.unwrap();
    }

    #[tokio::test]
    async fn ambiguous_search_target_changes_nothing() {
        let (server, v, db) = infra();
        server.add_secret("prod", &v, None);
        server.add_secret("prod", &v, Some(&db));
        let s = server.session(None);

        let err = delete(&s, by_name("prod")).await.unwrap_err();
        assert_eq!(err.kind(), "ambiguous_entity");
        assert!(server.mutations().is_empty());
        s.release().await.unwrap();
    }

    #[tokio::test]
    async fn update_can_move_to_vault_root() {
        let (server, v, db) = infra();
        let id = server.add_secret("prod-mysql", &v, Some(&db));
        let s = server.session(None);

        let updated = update(
            &s,
            SecretUpdate {
                target: Addressing::Id(id),
                changes: SecretChanges {
                    folder: Some(None),
                    description: Some("primary".to_string()),
                    ..SecretChanges::default()
                },
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.folder_id, None);
        assert_eq!(updated.description.as_deref(), Some("primary"));
        s.release().await.unwrap();
    }

    #[tokio::test]
    async fn move_across_vaults_reencrypts() {
        let server = MemoryServer::new();
        let s = server.session(Some("correct horse"));
        for (name, per_item_keys) in [("Infra", false), ("Archive", true)] {
            vault::create(
                &s,
                NewVault {
                    name: name.to_string(),
                    per_item_keys,
                },
            )
            .await
            .unwrap();
        }
        let archive = resolver::find_vault(s.api(), "Archive").await.unwrap();
        let old = server.add_folder("2024", &archive.id, None);

        let created = create(&s, new_secret("Infra", None, "prod-mysql", "hunter2"))
            .await
            .unwrap();
        let moved = move_to(
            &s,
            SecretMove {
                target: Addressing::Id(created.id.clone()),
                vault: "Archive".to_string(),
                folder: Some("2024".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(moved.vault_id, archive.id);
        assert_eq!(moved.folder_id.as_deref(), Some(old.as_str()));
        assert!(moved.crypted_key.is_some());

        let plain = get(&s, created.id).await.unwrap();
        assert_eq!(password(&plain), Some("hunter2"));
        assert_eq!(plain.custom[0].value.as_str(), "3306");
        s.release().await.unwrap();
    }

    #[tokio::test]
    async fn move_between_server_managed_vaults_keeps_ciphertext() {
        let (server, _, _) = infra();
        server.add_vault("Archive", None, KeyEncryptionMode::VaultKey);
        let s = server.session(None);
        let created = create(&s, new_secret("Infra", None, "prod-mysql", "hunter2"))
            .await
            .unwrap();

        let moved = move_to(
            &s,
            SecretMove {
                target: by_name("prod-mysql"),
                vault: "Archive".to_string(),
                folder: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(moved.crypted_password, created.crypted_password);
        assert_eq!(moved.folder_id, None);
        s.release().await.unwrap();
    }
}

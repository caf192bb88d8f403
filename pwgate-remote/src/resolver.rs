//! Entity resolver: human names and paths to unique server entities.
//!
//! Server-side searches may be fuzzy. Every lookup here is followed by a
//! local exact-match filter, and anything but exactly one survivor is an
//! error (except [`lookup_path`], which reports zero matches as `None`).

use tracing::debug;

use pwgate_core::args::SecretSearch;
use pwgate_core::{
    EntityKind, Folder, FolderQuery, RemoteApi, Secret, SecretPath, SecretQuery, Vault, VaultError,
};

/// Exactly one element, or `NotFound` / `AmbiguousEntity`.
fn exactly_one<T>(
    mut matches: Vec<T>,
    kind: EntityKind,
    name: &str,
    describe: impl Fn(&T) -> String,
) -> Result<T, VaultError> {
    match matches.len() {
        0 => Err(VaultError::NotFound {
            kind,
            name: name.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(VaultError::AmbiguousEntity {
            kind,
            name: name.to_string(),
            candidates: matches.iter().map(describe).collect(),
        }),
    }
}

/// The one visible vault called `name`.
pub async fn find_vault(api: &dyn RemoteApi, name: &str) -> Result<Vault, VaultError> {
    let matches: Vec<Vault> = api
        .list_vaults()
        .await?
        .into_iter()
        .filter(|v| v.name == name)
        .collect();
    let vault = exactly_one(matches, EntityKind::Vault, name, |v| v.id.clone())?;
    debug!(vault = %vault.name, id = %vault.id, "resolved vault");
    Ok(vault)
}

/// Folders named exactly `name` in `vault_id`, under any parent, or under
/// `parent_id` when one is given.
pub async fn folders_named(
    api: &dyn RemoteApi,
    name: &str,
    vault_id: &str,
    parent_id: Option<&str>,
) -> Result<Vec<Folder>, VaultError> {
    let query = FolderQuery::new(name, vault_id).with_parent(parent_id.map(str::to_string));
    Ok(api
        .search_folders(&query)
        .await?
        .into_iter()
        .filter(|f| f.vault_id == vault_id && f.name == name)
        .filter(|f| parent_id.is_none_or(|p| f.parent_id.as_deref() == Some(p)))
        .collect())
}

/// The one folder called `name` directly under `parent_id` in `vault_id`.
/// No parent means the vault root.
pub async fn find_folder(
    api: &dyn RemoteApi,
    name: &str,
    vault_id: &str,
    parent_id: Option<&str>,
) -> Result<Folder, VaultError> {
    let matches: Vec<Folder> = folders_named(api, name, vault_id, parent_id)
        .await?
        .into_iter()
        .filter(|f| f.parent_id.as_deref() == parent_id)
        .collect();
    let folder = exactly_one(matches, EntityKind::Folder, name, describe_folder)?;
    debug!(folder = %folder.name, id = %folder.id, "resolved folder");
    Ok(folder)
}

fn describe_folder(f: &Folder) -> String {
    match &f.parent_id {
        Some(parent) => format!("{} (parent {parent})", f.id),
        None => f.id.clone(),
    }
}

/// Resolve a chain of folder names from the vault root, each scoped to the
/// previous one. Returns the innermost folder, or `None` for an empty chain.
pub async fn find_folder_chain<S: AsRef<str>>(
    api: &dyn RemoteApi,
    names: &[S],
    vault_id: &str,
) -> Result<Option<Folder>, VaultError> {
    let mut current: Option<Folder> = None;
    for name in names {
        let parent = current.as_ref().map(|f| f.id.as_str());
        let folder = find_folder(api, name.as_ref(), vault_id, parent).await?;
        current = Some(folder);
    }
    Ok(current)
}

/// Resolve a `Parent/Child` folder reference inside a vault.
pub async fn find_folder_ref(
    api: &dyn RemoteApi,
    reference: &str,
    vault_id: &str,
) -> Result<Folder, VaultError> {
    let names: Vec<&str> = reference.split('/').collect();
    if names.iter().any(|n| n.trim().is_empty()) {
        return Err(VaultError::validation(
            "folder",
            format!("{reference:?} contains an empty folder name"),
        ));
    }
    find_folder_chain(api, names.as_slice(), vault_id)
        .await?
        .ok_or_else(|| VaultError::validation("folder", "empty folder reference"))
}

/// Look up the secret a path names.
///
/// Vault and folders must each resolve uniquely. The secret itself may be
/// absent (`Ok(None)`) but not ambiguous.
pub async fn lookup_path(
    api: &dyn RemoteApi,
    path: &SecretPath,
) -> Result<Option<Secret>, VaultError> {
    let vault = find_vault(api, path.vault()).await?;
    let folder = find_folder_chain(api, path.folders(), &vault.id).await?;
    let folder_id = folder.as_ref().map(|f| f.id.as_str());

    let name = path.secret_name();
    let query = SecretQuery::by_name(name).in_vault(vault.id.as_str());
    let mut matches: Vec<Secret> = api
        .search_secrets(&query)
        .await?
        .into_iter()
        .filter(|s| {
            s.name == name && s.vault_id == vault.id && s.folder_id.as_deref() == folder_id
        })
        .collect();

    match matches.len() {
        0 => {
            debug!(path = %path, "no secret at path");
            Ok(None)
        }
        1 => Ok(Some(matches.remove(0))),
        _ => Err(VaultError::AmbiguousEntity {
            kind: EntityKind::Secret,
            name: path.to_string(),
            candidates: matches.into_iter().map(|s| s.id).collect(),
        }),
    }
}

/// Like [`lookup_path`], but a missing secret is `NotFound`.
pub async fn resolve_path(api: &dyn RemoteApi, path: &SecretPath) -> Result<Secret, VaultError> {
    lookup_path(api, path).await?.ok_or_else(|| VaultError::NotFound {
        kind: EntityKind::Secret,
        name: path.to_string(),
    })
}

/// Build the server query for a secret search, resolving the vault name.
pub async fn secret_query(
    api: &dyn RemoteApi,
    search: &SecretSearch,
) -> Result<SecretQuery, VaultError> {
    let vault_id = match &search.vault {
        Some(name) => Some(find_vault(api, name).await?.id),
        None => None,
    };
    Ok(SecretQuery {
        query: search.query.clone(),
        vault_id,
        tags: search.tags.clone(),
        colors: search.colors.clone(),
        include_shared: search.include_shared,
        include_shortcuts: search.include_shortcuts,
    })
}

/// The one secret a search names exactly.
///
/// The server search narrows by query, tags, colors and vault; of its
/// results only those whose name equals the query count.
pub async fn find_secret(
    api: &dyn RemoteApi,
    search: &SecretSearch,
) -> Result<Secret, VaultError> {
    let query = secret_query(api, search).await?;
    let matches: Vec<Secret> = api
        .search_secrets(&query)
        .await?
        .into_iter()
        .filter(|s| s.name == query.query)
        .filter(|s| query.vault_id.as_ref().is_none_or(|v| &s.vault_id == v))
        .collect();
    let secret = exactly_one(matches, EntityKind::Secret, &search.query, |s| s.id.clone())?;
    debug!(secret = %secret.name, id = %secret.id, "resolved secret");
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryServer;
    use pwgate_core::KeyEncryptionMode;

    /// Vault "Infra" / root folder "DB" / secret "prod-mysql", plus
    /// near-miss names the server's fuzzy search also returns.
    fn infra() -> (MemoryServer, String, String, String) {
        let server = MemoryServer::new();
        let v = server.add_vault("Infra", None, KeyEncryptionMode::VaultKey);
        server.add_vault("Infra-staging", None, KeyEncryptionMode::VaultKey);
        let db = server.add_folder("DB", &v, None);
        server.add_folder("DB-old", &v, None);
        let s = server.add_secret("prod-mysql", &v, Some(&db));
        server.add_secret("prod-mysql-replica", &v, Some(&db));
        (server, v, db, s)
    }

    #[tokio::test]
    async fn path_resolves_through_folder_chain() {
        let (server, _, _, secret) = infra();
        let api = server.api();
        let path = SecretPath::parse("Infra/DB/prod-mysql").unwrap();
        assert_eq!(resolve_path(&api, &path).await.unwrap().id, secret);

        let missing = SecretPath::parse("Infra/DB/missing").unwrap();
        assert!(lookup_path(&api, &missing).await.unwrap().is_none());
        let err = resolve_path(&api, &missing).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn second_root_folder_makes_lookup_ambiguous() {
        let (server, v, _, _) = infra();
        server.add_folder("DB", &v, None);
        let api = server.api();
        let err = find_folder(&api, "DB", &v, None).await.unwrap_err();
        match err {
            VaultError::AmbiguousEntity { kind, candidates, .. } => {
                assert_eq!(kind, EntityKind::Folder);
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn same_name_under_different_parents_is_not_ambiguous() {
        let server = MemoryServer::new();
        let v = server.add_vault("Infra", None, KeyEncryptionMode::VaultKey);
        let db = server.add_folder("DB", &v, None);
        let web = server.add_folder("Web", &v, None);
        let db_prod = server.add_folder("prod", &v, Some(&db));
        server.add_folder("prod", &v, Some(&web));
        let api = server.api();

        let f = find_folder_chain(&api, &["DB", "prod"], &v).await.unwrap().unwrap();
        assert_eq!(f.id, db_prod);
        let f = find_folder_ref(&api, "DB/prod", &v).await.unwrap();
        assert_eq!(f.id, db_prod);
        let err = find_folder(&api, "prod", &v, None).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn nested_namesake_does_not_shadow_root_folder() {
        let (server, v, db, secret) = infra();
        let archive = server.add_folder("Archive", &v, None);
        let old_db = server.add_folder("DB", &v, Some(&archive));
        let old = server.add_secret("prod-mysql", &v, Some(&old_db));
        let api = server.api();

        assert_eq!(find_folder(&api, "DB", &v, None).await.unwrap().id, db);
        let path = SecretPath::parse("Infra/DB/prod-mysql").unwrap();
        assert_eq!(resolve_path(&api, &path).await.unwrap().id, secret);
        let path = SecretPath::parse("Infra/Archive/DB/prod-mysql").unwrap();
        assert_eq!(resolve_path(&api, &path).await.unwrap().id, old);

        let all = folders_named(&api, "DB", &v, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn folder_lookup_stays_inside_the_vault() {
        let (server, _, _, _) = infra();
        let other = server.add_vault("Web", None, KeyEncryptionMode::VaultKey);
        let api = server.api();
        let err = find_folder(&api, "DB", &other, None).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn empty_folder_reference_segment_is_rejected() {
        let (server, v, _, _) = infra();
        let api = server.api();
        for reference in ["", "DB/", "/DB", "DB//x"] {
            let err = find_folder_ref(&api, reference, &v).await.unwrap_err();
            assert_eq!(err.kind(), "validation", "{reference:?}");
        }
    }

    #[tokio::test]
    async fn vault_names_match_exactly() {
        let (server, v, _, _) = infra();
        let api = server.api();
        assert_eq!(find_vault(&api, "Infra").await.unwrap().id, v);
        assert_eq!(find_vault(&api, "infra").await.unwrap_err().kind(), "not_found");
    }

    #[tokio::test]
    async fn secret_search_filters_by_vault() {
        let (server, v, _, secret) = infra();
        let staging = server.add_vault("Staging", None, KeyEncryptionMode::VaultKey);
        server.add_secret("prod-mysql", &staging, None);
        let api = server.api();

        let mut search = SecretSearch {
            query: "prod-mysql".to_string(),
            ..SecretSearch::default()
        };
        assert_eq!(find_secret(&api, &search).await.unwrap_err().kind(), "ambiguous_entity");

        search.vault = Some("Infra".to_string());
        let found = find_secret(&api, &search).await.unwrap();
        assert_eq!(found.id, secret);
        assert_eq!(found.vault_id, v);
    }
}

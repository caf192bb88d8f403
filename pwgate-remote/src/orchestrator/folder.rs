//! Folder operations.

use std::collections::HashSet;

use tracing::info;

use pwgate_core::args::{FolderAddressing, FolderSearch, FolderUpdate, NewFolder};
use pwgate_core::{Folder, FolderPayload, FolderQuery, VaultError};

use crate::resolver;
use crate::session::Session;

/// Resolve a folder addressed by ID, or by a `Parent/Child` reference from
/// the root of a named vault.
pub async fn resolve(session: &Session, target: &FolderAddressing) -> Result<Folder, VaultError> {
    let api = session.api();
    match target {
        FolderAddressing::Id(id) => api.get_folder(id).await,
        FolderAddressing::Named { vault, name } => {
            let vault = resolver::find_vault(api, vault).await?;
            resolver::find_folder_ref(api, name, &vault.id).await
        }
    }
}

pub async fn create(session: &Session, new: NewFolder) -> Result<Folder, VaultError> {
    let api = session.api();
    let vault = resolver::find_vault(api, &new.vault).await?;
    let parent_id = match &new.parent {
        Some(parent) => Some(resolver::find_folder_ref(api, parent, &vault.id).await?.id),
        None => None,
    };
    let payload = FolderPayload::create(new.name, vault.id, parent_id);
    let folder = api.create_folder(&payload).await?;
    info!(folder = %folder.name, id = %folder.id, "folder created");
    Ok(folder)
}

/// Search folders in a vault.
///
/// With a parent name, every folder of that exact name is a candidate
/// parent, and only results directly under one of them are kept.
pub async fn search(session: &Session, search: FolderSearch) -> Result<Vec<Folder>, VaultError> {
    let api = session.api();
    let vault = resolver::find_vault(api, &search.vault).await?;
    let found: Vec<Folder> = api
        .search_folders(&FolderQuery::new(search.query, vault.id.as_str()))
        .await?
        .into_iter()
        .filter(|f| f.vault_id == vault.id)
        .collect();

    let Some(parent) = search.parent else {
        return Ok(found);
    };
    let parents: HashSet<String> = resolver::folders_named(api, &parent, &vault.id, None)
        .await?
        .into_iter()
        .map(|f| f.id)
        .collect();
    Ok(found
        .into_iter()
        .filter(|f| f.parent_id.as_ref().is_some_and(|p| parents.contains(p)))
        .collect())
}

pub async fn get(session: &Session, id: String) -> Result<Folder, VaultError> {
    session.api().get_folder(&id).await
}

/// Rename and/or re-parent a folder.
pub async fn update(session: &Session, update: FolderUpdate) -> Result<Folder, VaultError> {
    let api = session.api();
    let folder = resolve(session, &update.target).await?;

    let parent = match update.parent {
        None => None,
        Some(None) => Some(None),
        Some(Some(reference)) => {
            let parent = resolver::find_folder_ref(api, &reference, &folder.vault_id).await?;
            if parent.id == folder.id {
                return Err(VaultError::validation(
                    "parent",
                    "a folder cannot be its own parent",
                ));
            }
            Some(Some(parent.id))
        }
    };

    let payload = FolderPayload::update(update.name, parent);
    let updated = api.update_folder(&folder.id, &payload).await?;
    info!(folder = %updated.name, id = %updated.id, "folder updated");
    Ok(updated)
}

/// Delete a folder. Returns its ID.
pub async fn delete(session: &Session, target: FolderAddressing) -> Result<String, VaultError> {
    let id = match target {
        FolderAddressing::Id(id) => id,
        named => resolve(session, &named).await?.id,
    };
    session.api().delete_folder(&id).await?;
    info!(id = %id, "folder deleted");
    Ok(id)
}

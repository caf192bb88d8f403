//! In-memory [`RemoteApi`] for tests.
//!
//! Searches are case-insensitive substring matches, like a real server's
//! fuzzy search, so callers' exact-match filtering is exercised. Every
//! mutating call is appended to a log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use pwgate_core::{
    ApiGeneration, Folder, FolderPayload, FolderQuery, KeyEncryptionMode, MovePayload, RemoteApi,
    Secret, SecretPayload, SecretQuery, Vault, VaultError, VaultPayload,
};

use crate::client::Connect;
use crate::provider::AesCryptoProvider;
use crate::session::Session;

#[derive(Default)]
pub struct State {
    pub vaults: Vec<Vault>,
    pub folders: Vec<Folder>,
    pub secrets: Vec<Secret>,
    pub mutations: Vec<String>,
    pub opened: usize,
    pub released: usize,
    pub fail_release: bool,
    next_id: usize,
}

impl State {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }
}

fn fuzzy(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn not_found(what: &str, id: &str) -> VaultError {
    VaultError::Remote {
        status: Some(404),
        body: format!(r#"{{"status":"error","code":"{what}NotFound","id":"{id}"}}"#),
    }
}

/// Overlay the fields of `patch` on `base` and read the result back.
fn merge<T, P>(base: &T, patch: &P) -> T
where
    T: serde::Serialize + serde::de::DeserializeOwned,
    P: serde::Serialize,
{
    let mut value = serde_json::to_value(base).unwrap();
    if let (Value::Object(target), Value::Object(fields)) =
        (&mut value, serde_json::to_value(patch).unwrap())
    {
        target.extend(fields);
    }
    serde_json::from_value(value).unwrap()
}

/// Shared fake server. Clone it to keep a handle for assertions.
#[derive(Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<State>>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_vault(
        &self,
        name: &str,
        encrypted_key: Option<String>,
        mode: KeyEncryptionMode,
    ) -> String {
        let mut st = self.state();
        let id = st.id("v");
        st.vaults.push(Vault {
            id: id.clone(),
            name: name.to_string(),
            encrypted_key,
            key_encryption_mode: mode,
        });
        id
    }

    pub fn add_folder(&self, name: &str, vault_id: &str, parent_id: Option<&str>) -> String {
        let mut st = self.state();
        let id = st.id("f");
        st.folders.push(Folder {
            id: id.clone(),
            name: name.to_string(),
            vault_id: vault_id.to_string(),
            parent_id: parent_id.map(str::to_string),
        });
        id
    }

    pub fn add_secret(&self, name: &str, vault_id: &str, folder_id: Option<&str>) -> String {
        let mut st = self.state();
        let id = st.id("s");
        let secret = serde_json::from_value(serde_json::json!({
            "id": id, "vaultId": vault_id, "folderId": folder_id, "name": name
        }))
        .unwrap();
        st.secrets.push(secret);
        id
    }

    pub fn insert_secret(&self, secret: Secret) {
        self.state().secrets.push(secret);
    }

    pub fn secret(&self, id: &str) -> Option<Secret> {
        self.state().secrets.iter().find(|s| s.id == id).cloned()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.state().mutations.clone()
    }

    pub fn api(&self) -> MemoryApi {
        self.state().opened += 1;
        MemoryApi {
            server: self.clone(),
            released: AtomicBool::new(false),
        }
    }

    /// A session over this server with a fast KDF.
    pub fn session(&self, master_key: Option<&str>) -> Session {
        Session::new(
            Box::new(self.api()),
            Arc::new(AesCryptoProvider::new(1000)),
            master_key.map(|k| zeroize::Zeroizing::new(k.to_string())),
        )
    }

    pub fn connector(&self, master_key: Option<&str>) -> MemoryConnector {
        MemoryConnector {
            server: self.clone(),
            master_key: master_key.map(str::to_string),
        }
    }
}

pub struct MemoryConnector {
    server: MemoryServer,
    master_key: Option<String>,
}

#[async_trait::async_trait]
impl Connect for MemoryConnector {
    async fn connect(&self) -> Result<Session, VaultError> {
        Ok(self.server.session(self.master_key.as_deref()))
    }
}

pub struct MemoryApi {
    server: MemoryServer,
    released: AtomicBool,
}

impl MemoryApi {
    fn state(&self) -> Result<MutexGuard<'_, State>, VaultError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(VaultError::Session("session has been released".to_string()));
        }
        Ok(self.server.state())
    }
}

#[async_trait::async_trait]
impl RemoteApi for MemoryApi {
    fn generation(&self) -> ApiGeneration {
        ApiGeneration::Current
    }

    async fn list_vaults(&self) -> Result<Vec<Vault>, VaultError> {
        Ok(self.state()?.vaults.clone())
    }

    async fn get_vault(&self, id: &str) -> Result<Vault, VaultError> {
        let st = self.state()?;
        st.vaults
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .ok_or_else(|| not_found("vault", id))
    }

    async fn create_vault(&self, payload: &VaultPayload) -> Result<Vault, VaultError> {
        let mut st = self.state()?;
        let vault = Vault {
            id: st.id("v"),
            name: payload.name.clone(),
            encrypted_key: payload.encrypted_key.clone(),
            key_encryption_mode: payload.key_encryption_mode,
        };
        st.mutations.push(format!("create_vault {}", vault.name));
        st.vaults.push(vault.clone());
        Ok(vault)
    }

    async fn search_folders(&self, query: &FolderQuery) -> Result<Vec<Folder>, VaultError> {
        let st = self.state()?;
        Ok(st
            .folders
            .iter()
            .filter(|f| f.vault_id == query.vault_id && fuzzy(&f.name, &query.query))
            .filter(|f| query.parent_id.is_none() || f.parent_id == query.parent_id)
            .cloned()
            .collect())
    }

    async fn get_folder(&self, id: &str) -> Result<Folder, VaultError> {
        let st = self.state()?;
        st.folders
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| not_found("folder", id))
    }

    async fn create_folder(&self, payload: &FolderPayload) -> Result<Folder, VaultError> {
        let mut st = self.state()?;
        let folder = Folder {
            id: st.id("f"),
            name: payload.name().unwrap_or_default().to_string(),
            vault_id: payload.vault_id().unwrap_or_default().to_string(),
            parent_id: payload.parent_id().flatten().map(str::to_string),
        };
        st.mutations.push(format!("create_folder {}", folder.name));
        st.folders.push(folder.clone());
        Ok(folder)
    }

    async fn update_folder(&self, id: &str, payload: &FolderPayload) -> Result<Folder, VaultError> {
        let mut st = self.state()?;
        st.mutations.push(format!("update_folder {id}"));
        let folder = st
            .folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| not_found("folder", id))?;
        if let Some(name) = payload.name() {
            folder.name = name.to_string();
        }
        if let Some(parent) = payload.parent_id() {
            folder.parent_id = parent.map(str::to_string);
        }
        Ok(folder.clone())
    }

    async fn delete_folder(&self, id: &str) -> Result<(), VaultError> {
        let mut st = self.state()?;
        st.mutations.push(format!("delete_folder {id}"));
        let before = st.folders.len();
        st.folders.retain(|f| f.id != id);
        if st.folders.len() == before {
            return Err(not_found("folder", id));
        }
        Ok(())
    }

    async fn search_secrets(&self, query: &SecretQuery) -> Result<Vec<Secret>, VaultError> {
        let st = self.state()?;
        Ok(st
            .secrets
            .iter()
            .filter(|s| fuzzy(&s.name, &query.query))
            .filter(|s| query.vault_id.as_ref().is_none_or(|v| &s.vault_id == v))
            .filter(|s| query.tags.iter().all(|t| s.tags.contains(t)))
            .filter(|s| {
                query.colors.is_empty() || s.color.is_some_and(|c| query.colors.contains(&c))
            })
            .cloned()
            .collect())
    }

    async fn get_secret(&self, id: &str) -> Result<Secret, VaultError> {
        let st = self.state()?;
        st.secrets
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| not_found("password", id))
    }

    async fn create_secret(&self, payload: &SecretPayload) -> Result<Secret, VaultError> {
        let mut st = self.state()?;
        let mut value = serde_json::to_value(payload).unwrap();
        value["id"] = Value::String(st.id("s"));
        let secret: Secret = serde_json::from_value(value).unwrap();
        st.mutations.push(format!("create_secret {}", secret.name));
        st.secrets.push(secret.clone());
        Ok(secret)
    }

    async fn update_secret(&self, id: &str, payload: &SecretPayload) -> Result<Secret, VaultError> {
        let mut st = self.state()?;
        st.mutations.push(format!("update_secret {id}"));
        let slot = st
            .secrets
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| not_found("password", id))?;
        *slot = merge(&*slot, payload);
        Ok(slot.clone())
    }

    async fn delete_secret(&self, id: &str) -> Result<(), VaultError> {
        let mut st = self.state()?;
        st.mutations.push(format!("delete_secret {id}"));
        let before = st.secrets.len();
        st.secrets.retain(|s| s.id != id);
        if st.secrets.len() == before {
            return Err(not_found("password", id));
        }
        Ok(())
    }

    async fn move_secret(&self, id: &str, payload: &MovePayload) -> Result<Secret, VaultError> {
        let mut st = self.state()?;
        st.mutations.push(format!("move_secret {id}"));
        let slot = st
            .secrets
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| not_found("password", id))?;
        *slot = merge(&*slot, payload);
        Ok(slot.clone())
    }

    async fn release(&self) -> Result<(), VaultError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut st = self.server.state();
        st.released += 1;
        if st.fail_release {
            return Err(VaultError::Remote {
                status: Some(500),
                body: "logout failed".to_string(),
            });
        }
        Ok(())
    }
}

//! Current API generation (`/api/v1`).
//!
//! Authenticates with an externally issued access token; a refresh token may
//! be held alongside it. Lists come back as `{"items": [...]}`, creates as
//! `{"id": ...}` followed by a fetch. Nothing is invalidated server-side on
//! release: the tokens are dropped and scrubbed locally.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use pwgate_core::{
    ApiGeneration, ConnectionConfig, Credentials, Folder, FolderPayload, FolderQuery, MovePayload,
    RemoteApi, Secret, SecretPayload, SecretQuery, Vault, VaultError, VaultPayload,
};

use crate::error::ApiError;
use crate::http::{Auth, Created, HttpClient, TokenSlot, decode};

pub const API_PREFIX: &str = "/api/v1";

#[derive(Deserialize)]
struct Items<T> {
    items: Vec<T>,
}

type Query = Vec<(String, String)>;

fn folder_query(q: &FolderQuery) -> Query {
    let mut pairs = vec![
        ("query".to_string(), q.query.clone()),
        ("vaultId".to_string(), q.vault_id.clone()),
    ];
    if let Some(parent) = &q.parent_id {
        pairs.push(("parentFolderId".to_string(), parent.clone()));
    }
    pairs
}

fn secret_query(q: &SecretQuery) -> Query {
    let mut pairs = vec![("query".to_string(), q.query.clone())];
    if let Some(vault) = &q.vault_id {
        pairs.push(("vaultId".to_string(), vault.clone()));
    }
    pairs.extend(q.tags.iter().map(|t| ("tags[]".to_string(), t.clone())));
    pairs.extend(q.colors.iter().map(|c| ("colors[]".to_string(), c.to_string())));
    if q.include_shared {
        pairs.push(("includeShared".to_string(), "true".to_string()));
    }
    if q.include_shortcuts {
        pairs.push(("includeShortcuts".to_string(), "true".to_string()));
    }
    pairs
}

pub struct CurrentApi {
    http: HttpClient,
    access: TokenSlot,
    refresh: Option<TokenSlot>,
}

impl std::fmt::Debug for CurrentApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentApi")
            .field("base", &self.http.base())
            .field("access", &self.access)
            .field("refresh", &self.refresh)
            .finish()
    }
}

impl CurrentApi {
    /// No handshake: the access token is already issued. Only the client
    /// itself is built here.
    pub fn open(config: &ConnectionConfig) -> Result<Self, VaultError> {
        let Credentials::TokenPair { access, refresh } = &config.credentials else {
            return Err(VaultError::missing("access_token"));
        };
        let http =
            HttpClient::new(config, API_PREFIX).map_err(ApiError::into_handshake_error)?;
        info!(base = %http.base(), "current session opened");
        Ok(Self {
            http,
            access: TokenSlot::new(access.clone()),
            refresh: refresh.clone().map(TokenSlot::new),
        })
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&B>,
    ) -> Result<String, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let token = self.access.get().await?;
        self.http
            .send(method, path, Auth::Bearer(&token), query, body)
            .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let text = self.send::<()>(Method::GET, path, &[], None).await?;
        decode(&text)
    }

    async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query,
    ) -> Result<Vec<T>, ApiError> {
        let text = self.send::<()>(Method::GET, path, query, None).await?;
        let items: Items<T> = decode(&text)?;
        Ok(items.items)
    }

    /// Send a mutating request and return the ID it names, if any.
    async fn mutate<T, B>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Created<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let text = self.send(method, path, &[], Some(body)).await?;
        decode(&text)
    }
}

#[async_trait::async_trait]
impl RemoteApi for CurrentApi {
    fn generation(&self) -> ApiGeneration {
        ApiGeneration::Current
    }

    async fn list_vaults(&self) -> Result<Vec<Vault>, VaultError> {
        Ok(self.list("/vaults", &Vec::new()).await?)
    }

    async fn get_vault(&self, id: &str) -> Result<Vault, VaultError> {
        Ok(self.get(&format!("/vaults/{id}")).await?)
    }

    async fn create_vault(&self, payload: &VaultPayload) -> Result<Vault, VaultError> {
        match self.mutate::<Vault, _>(Method::POST, "/vaults", payload).await? {
            Created::Entity(vault) => Ok(vault),
            Created::Ref { id } | Created::Id(id) => self.get_vault(&id).await,
        }
    }

    async fn search_folders(&self, query: &FolderQuery) -> Result<Vec<Folder>, VaultError> {
        Ok(self.list("/folders/search", &folder_query(query)).await?)
    }

    async fn get_folder(&self, id: &str) -> Result<Folder, VaultError> {
        Ok(self.get(&format!("/folders/{id}")).await?)
    }

    async fn create_folder(&self, payload: &FolderPayload) -> Result<Folder, VaultError> {
        match self.mutate::<Folder, _>(Method::POST, "/folders", payload).await? {
            Created::Entity(folder) => Ok(folder),
            Created::Ref { id } | Created::Id(id) => self.get_folder(&id).await,
        }
    }

    async fn update_folder(&self, id: &str, payload: &FolderPayload) -> Result<Folder, VaultError> {
        // PATCH answers with an empty body on some servers
        let path = format!("/folders/{id}");
        self.send(Method::PATCH, &path, &[], Some(payload)).await?;
        self.get_folder(id).await
    }

    async fn delete_folder(&self, id: &str) -> Result<(), VaultError> {
        self.send::<()>(Method::DELETE, &format!("/folders/{id}"), &[], None)
            .await?;
        Ok(())
    }

    async fn search_secrets(&self, query: &SecretQuery) -> Result<Vec<Secret>, VaultError> {
        Ok(self.list("/items/search", &secret_query(query)).await?)
    }

    async fn get_secret(&self, id: &str) -> Result<Secret, VaultError> {
        Ok(self.get(&format!("/items/{id}")).await?)
    }

    async fn create_secret(&self, payload: &SecretPayload) -> Result<Secret, VaultError> {
        match self.mutate::<Secret, _>(Method::POST, "/items", payload).await? {
            Created::Entity(secret) => Ok(secret),
            Created::Ref { id } | Created::Id(id) => self.get_secret(&id).await,
        }
    }

    async fn update_secret(&self, id: &str, payload: &SecretPayload) -> Result<Secret, VaultError> {
        let path = format!("/items/{id}");
        self.send(Method::PATCH, &path, &[], Some(payload)).await?;
        self.get_secret(id).await
    }

    async fn delete_secret(&self, id: &str) -> Result<(), VaultError> {
        self.send::<()>(Method::DELETE, &format!("/items/{id}"), &[], None)
            .await?;
        Ok(())
    }

    async fn move_secret(&self, id: &str, payload: &MovePayload) -> Result<Secret, VaultError> {
        let path = format!("/items/{id}/move");
        self.send(Method::POST, &path, &[], Some(payload)).await?;
        self.get_secret(id).await
    }

    async fn release(&self) -> Result<(), VaultError> {
        let had_access = self.access.take().await.is_some();
        if let Some(refresh) = &self.refresh {
            refresh.take().await;
        }
        debug!(had_access, "current session tokens dropped");
        Ok(())
    }
}

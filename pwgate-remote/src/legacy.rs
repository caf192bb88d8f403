//! Legacy API generation (`/api/v4`).
//!
//! A single long-lived API token is exchanged for a session token at open.
//! Every response is wrapped as `{"status": ..., "data": ...}`. Release
//! logs the session out on the server.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::Zeroizing;

use pwgate_core::{
    ApiGeneration, ConnectionConfig, Credentials, Folder, FolderPayload, FolderQuery, MovePayload,
    RemoteApi, Secret, SecretPayload, SecretQuery, Vault, VaultError, VaultPayload,
};

use crate::error::ApiError;
use crate::http::{Auth, Created, HttpClient, TokenSlot, decode};

pub const API_PREFIX: &str = "/api/v4";
const SESSION_HEADER: &str = "Passwork-Auth";

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    api_key: &'a str,
}

#[derive(Deserialize)]
struct LoginData {
    token: String,
}

impl std::fmt::Debug for LoginData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginData")
            .field("token", &"[redacted]")
            .finish()
    }
}

pub struct LegacyApi {
    http: HttpClient,
    session: TokenSlot,
}

impl std::fmt::Debug for LegacyApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyApi")
            .field("base", &self.http.base())
            .field("session", &self.session)
            .finish()
    }
}

impl LegacyApi {
    /// Exchange the API token for a session token.
    pub async fn login(config: &ConnectionConfig) -> Result<Self, VaultError> {
        let Credentials::ApiToken(api_token) = &config.credentials else {
            return Err(VaultError::missing("token"));
        };
        let http =
            HttpClient::new(config, API_PREFIX).map_err(ApiError::into_handshake_error)?;

        let body = http
            .send(
                Method::POST,
                "/auth/login",
                Auth::None,
                &[],
                Some(&LoginRequest {
                    api_key: api_token.as_str(),
                }),
            )
            .await
            .map_err(ApiError::into_handshake_error)?;
        let login: Envelope<LoginData> =
            decode(&body).map_err(ApiError::into_handshake_error)?;

        info!(base = %http.base(), "legacy session opened");
        Ok(Self {
            http,
            session: TokenSlot::new(Zeroizing::new(login.data.token)),
        })
    }

    async fn call<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let token = self.session.get().await?;
        let text = self
            .http
            .send(method, path, Auth::Header(SESSION_HEADER, &token), &[], body)
            .await?;
        let envelope: Envelope<T> = decode(&text)?;
        Ok(envelope.data)
    }

    async fn call_unit(&self, method: Method, path: &str) -> Result<(), ApiError> {
        let token = self.session.get().await?;
        self.http
            .send::<()>(method, path, Auth::Header(SESSION_HEADER, &token), &[], None)
            .await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.call::<T, ()>(Method::GET, path, None).await
    }
}

#[async_trait::async_trait]
impl RemoteApi for LegacyApi {
    fn generation(&self) -> ApiGeneration {
        ApiGeneration::Legacy
    }

    async fn list_vaults(&self) -> Result<Vec<Vault>, VaultError> {
        Ok(self.get("/vaults/list").await?)
    }

    async fn get_vault(&self, id: &str) -> Result<Vault, VaultError> {
        Ok(self.get(&format!("/vaults/{id}")).await?)
    }

    async fn create_vault(&self, payload: &VaultPayload) -> Result<Vault, VaultError> {
        match self.call::<Created<Vault>, _>(Method::POST, "/vaults", Some(payload)).await? {
            Created::Entity(vault) => Ok(vault),
            Created::Ref { id } | Created::Id(id) => self.get_vault(&id).await,
        }
    }

    async fn search_folders(&self, query: &FolderQuery) -> Result<Vec<Folder>, VaultError> {
        Ok(self.call(Method::POST, "/folders/search", Some(query)).await?)
    }

    async fn get_folder(&self, id: &str) -> Result<Folder, VaultError> {
        Ok(self.get(&format!("/folders/{id}")).await?)
    }

    async fn create_folder(&self, payload: &FolderPayload) -> Result<Folder, VaultError> {
        match self.call::<Created<Folder>, _>(Method::POST, "/folders", Some(payload)).await? {
            Created::Entity(folder) => Ok(folder),
            Created::Ref { id } | Created::Id(id) => self.get_folder(&id).await,
        }
    }

    async fn update_folder(&self, id: &str, payload: &FolderPayload) -> Result<Folder, VaultError> {
        let path = format!("/folders/{id}");
        match self.call::<Created<Folder>, _>(Method::PUT, &path, Some(payload)).await? {
            Created::Entity(folder) => Ok(folder),
            Created::Ref { .. } | Created::Id(_) => self.get_folder(id).await,
        }
    }

    async fn delete_folder(&self, id: &str) -> Result<(), VaultError> {
        Ok(self.call_unit(Method::DELETE, &format!("/folders/{id}")).await?)
    }

    async fn search_secrets(&self, query: &SecretQuery) -> Result<Vec<Secret>, VaultError> {
        Ok(self.call(Method::POST, "/passwords/search", Some(query)).await?)
    }

    async fn get_secret(&self, id: &str) -> Result<Secret, VaultError> {
        Ok(self.get(&format!("/passwords/{id}")).await?)
    }

    async fn create_secret(&self, payload: &SecretPayload) -> Result<Secret, VaultError> {
        match self.call::<Created<Secret>, _>(Method::POST, "/passwords", Some(payload)).await? {
            Created::Entity(secret) => Ok(secret),
            Created::Ref { id } | Created::Id(id) => self.get_secret(&id).await,
        }
    }

    async fn update_secret(&self, id: &str, payload: &SecretPayload) -> Result<Secret, VaultError> {
        let path = format!("/passwords/{id}");
        match self.call::<Created<Secret>, _>(Method::PUT, &path, Some(payload)).await? {
            Created::Entity(secret) => Ok(secret),
            Created::Ref { .. } | Created::Id(_) => self.get_secret(id).await,
        }
    }

    async fn delete_secret(&self, id: &str) -> Result<(), VaultError> {
        Ok(self.call_unit(Method::DELETE, &format!("/passwords/{id}")).await?)
    }

    async fn move_secret(&self, id: &str, payload: &MovePayload) -> Result<Secret, VaultError> {
        let path = format!("/passwords/{id}/move");
        match self.call::<Created<Secret>, _>(Method::POST, &path, Some(payload)).await? {
            Created::Entity(secret) => Ok(secret),
            Created::Ref { id } | Created::Id(id) => self.get_secret(&id).await,
        }
    }

    async fn release(&self) -> Result<(), VaultError> {
        let Some(token) = self.session.take().await else {
            debug!("legacy session already released");
            return Ok(());
        };
        self.http
            .send::<()>(
                Method::POST,
                "/auth/logout",
                Auth::Header(SESSION_HEADER, &token),
                &[],
                None,
            )
            .await?;
        debug!("legacy session logged out");
        Ok(())
    }
}

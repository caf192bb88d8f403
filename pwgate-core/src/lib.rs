pub mod args;
pub mod config;
pub mod crypto;
pub mod error;
pub mod model;
pub mod path;
pub mod request;

pub use config::{ApiGeneration, ConnectionConfig, ConnectionParams, Credentials};
pub use crypto::{CryptoProvider, Key, KeyMaterial, WrappedKey};
pub use error::{CryptoError, EntityKind, VaultError};
pub use model::{
    Attachment, CustomField, Folder, KeyEncryptionMode, PlainAttachment, PlainCustomField,
    PlaintextSecret, Secret, Vault,
};
pub use path::SecretPath;
pub use request::{
    EncryptedPayload, FolderPayload, FolderQuery, MovePayload, SecretPayload, SecretQuery,
    VaultPayload,
};

/// The REST capability of an authenticated session.
///
/// One implementation per backend API generation. Every call is a single
/// request (plus a follow-up fetch where the server only returns an ID);
/// nothing is retried, and no result is cached between calls.
///
/// Calls after [`release`](Self::release) fail with [`VaultError::Session`].
#[async_trait::async_trait]
pub trait RemoteApi: Send + Sync {
    fn generation(&self) -> ApiGeneration;

    async fn list_vaults(&self) -> Result<Vec<Vault>, VaultError>;
    async fn get_vault(&self, id: &str) -> Result<Vault, VaultError>;
    async fn create_vault(&self, payload: &VaultPayload) -> Result<Vault, VaultError>;

    /// Server-side search. Results may be fuzzy; callers filter exactly.
    async fn search_folders(&self, query: &FolderQuery) -> Result<Vec<Folder>, VaultError>;
    async fn get_folder(&self, id: &str) -> Result<Folder, VaultError>;
    async fn create_folder(&self, payload: &FolderPayload) -> Result<Folder, VaultError>;
    async fn update_folder(&self, id: &str, payload: &FolderPayload) -> Result<Folder, VaultError>;
    async fn delete_folder(&self, id: &str) -> Result<(), VaultError>;

    /// Server-side search, ordered by relevance. Results may be fuzzy.
    async fn search_secrets(&self, query: &SecretQuery) -> Result<Vec<Secret>, VaultError>;
    async fn get_secret(&self, id: &str) -> Result<Secret, VaultError>;
    async fn create_secret(&self, payload: &SecretPayload) -> Result<Secret, VaultError>;
    async fn update_secret(&self, id: &str, payload: &SecretPayload) -> Result<Secret, VaultError>;
    async fn delete_secret(&self, id: &str) -> Result<(), VaultError>;
    async fn move_secret(&self, id: &str, payload: &MovePayload) -> Result<Secret, VaultError>;

    /// Invalidate server-side session state and drop token material.
    ///
    /// Idempotent: releasing an already released session is a no-op.
    async fn release(&self) -> Result<(), VaultError>;
}

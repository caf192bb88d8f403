//! Public entry point: one method per operation, one session per call.
//!
//! Arguments are validated before anything touches the network. A call
//! then opens a session through its [`Connect`]or, runs the orchestrator
//! inside [`scoped`], and releases the session whatever happens.

use futures_util::future::BoxFuture;

use pwgate_core::args::{
    FolderCreateArgs, FolderDeleteArgs, FolderGetArgs, FolderSearchArgs, FolderUpdateArgs,
    SecretCreateArgs, SecretDeleteArgs, SecretGetArgs, SecretMoveArgs, SecretPathArgs,
    SecretSearchArgs, SecretUpdateArgs, VaultCreateArgs, VaultGetArgs,
};
use pwgate_core::{
    ConnectionConfig, ConnectionParams, Folder, PlaintextSecret, Secret, Vault, VaultError,
};

use crate::orchestrator::{folder, secret, vault};
use crate::session::{Session, scoped};

/// Opens sessions. The HTTP implementation is [`HttpConnector`].
#[async_trait::async_trait]
pub trait Connect: Send + Sync {
    async fn connect(&self) -> Result<Session, VaultError>;
}

/// Connects to the configured server over HTTPS.
#[derive(Debug)]
pub struct HttpConnector {
    config: ConnectionConfig,
}

impl HttpConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl Connect for HttpConnector {
    async fn connect(&self) -> Result<Session, VaultError> {
        Session::open(&self.config).await
    }
}

pub struct Client {
    connector: Box<dyn Connect>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_connector(HttpConnector::new(config))
    }

    /// Validate raw connection parameters and build a client from them.
    pub fn from_params(params: ConnectionParams) -> Result<Self, VaultError> {
        Ok(Self::new(params.validate()?))
    }

    pub fn with_connector(connector: impl Connect + 'static) -> Self {
        Self {
            connector: Box::new(connector),
        }
    }

    async fn run<T, F>(&self, op: F) -> Result<T, VaultError>
    where
        F: for<'a> FnOnce(&'a Session) -> BoxFuture<'a, Result<T, VaultError>>,
    {
        let session = self.connector.connect().await?;
        scoped(session, op).await
    }

    // ── Vaults ──────────────────────────────────────────────────────────

    pub async fn vault_list(&self) -> Result<Vec<Vault>, VaultError> {
        self.run(|s| Box::pin(vault::list(s))).await
    }

    pub async fn vault_get(&self, args: VaultGetArgs) -> Result<Vault, VaultError> {
        let target = args.validate()?;
        self.run(move |s| Box::pin(vault::get(s, target))).await
    }

    pub async fn vault_create(&self, args: VaultCreateArgs) -> Result<Vault, VaultError> {
        let new = args.validate()?;
        self.run(move |s| Box::pin(vault::create(s, new))).await
    }

    // ── Folders ─────────────────────────────────────────────────────────

    pub async fn folder_create(&self, args: FolderCreateArgs) -> Result<Folder, VaultError> {
        let new = args.validate()?;
        self.run(move |s| Box::pin(folder::create(s, new))).await
    }

    pub async fn folder_search(&self, args: FolderSearchArgs) -> Result<Vec<Folder>, VaultError> {
        let search = args.validate()?;
        self.run(move |s| Box::pin(folder::search(s, search))).await
    }

    pub async fn folder_get(&self, args: FolderGetArgs) -> Result<Folder, VaultError> {
        let id = args.validate()?;
        self.run(move |s| Box::pin(folder::get(s, id))).await
    }

    pub async fn folder_update(&self, args: FolderUpdateArgs) -> Result<Folder, VaultError> {
        let update = args.validate()?;
        self.run(move |s| Box::pin(folder::update(s, update))).await
    }

    /// Returns the deleted folder's ID.
    pub async fn folder_delete(&self, args: FolderDeleteArgs) -> Result<String, VaultError> {
        let target = args.validate()?;
        self.run(move |s| Box::pin(folder::delete(s, target))).await
    }

    // ── Secrets ─────────────────────────────────────────────────────────

    pub async fn secret_search(&self, args: SecretSearchArgs) -> Result<Vec<Secret>, VaultError> {
        let search = args.validate()?;
        self.run(move |s| Box::pin(secret::search(s, search))).await
    }

    pub async fn secret_get(&self, args: SecretGetArgs) -> Result<PlaintextSecret, VaultError> {
        let id = args.validate()?;
        self.run(move |s| Box::pin(secret::get(s, id))).await
    }

    /// `Ok(None)` when no secret sits at the path.
    pub async fn secret_get_by_path(
        &self,
        args: SecretPathArgs,
    ) -> Result<Option<PlaintextSecret>, VaultError> {
        let path = args.validate()?;
        self.run(move |s| Box::pin(async move { secret::get_by_path(s, &path).await }))
            .await
    }

    pub async fn secret_create(&self, args: SecretCreateArgs) -> Result<Secret, VaultError> {
        let new = args.validate()?;
        self.run(move |s| Box::pin(secret::create(s, new))).await
    }

    pub async fn secret_update(&self, args: SecretUpdateArgs) -> Result<Secret, VaultError> {
        let update = args.validate()?;
        self.run(move |s| Box::pin(secret::update(s, update))).await
    }

    /// Returns the deleted secret's ID.
    pub async fn secret_delete(&self, args: SecretDeleteArgs) -> Result<String, VaultError> {
        let target = args.validate()?;
        self.run(move |s| Box::pin(secret::delete(s, target))).await
    }

    pub async fn secret_move(&self, args: SecretMoveArgs) -> Result<Secret, VaultError> {
        let request = args.validate()?;
        self.run(move |s| Box::pin(secret::move_to(s, request))).await
    }
}

//! Session Handle: one authenticated connection for one logical operation.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use pwgate_core::{ApiGeneration, ConnectionConfig, CryptoProvider, Key, RemoteApi, VaultError};

use crate::current::CurrentApi;
use crate::legacy::LegacyApi;
use crate::provider::AesCryptoProvider;

/// An open connection plus the optional master key passphrase.
///
/// Obtain one through [`Session::open`] and run work on it with [`scoped`],
/// which releases it whatever the outcome.
pub struct Session {
    api: Box<dyn RemoteApi>,
    crypto: Arc<dyn CryptoProvider>,
    master_key: Option<Zeroizing<String>>,
    released: AtomicBool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("generation", &self.api.generation())
            .field("master_key", &self.master_key.as_ref().map(|_| "[redacted]"))
            .field("released", &self.released.load(Ordering::Relaxed))
            .finish()
    }
}

impl Session {
    /// Connect with the API generation the configuration selects.
    ///
    /// Fails with [`VaultError::Connection`] if the handshake fails.
    pub async fn open(config: &ConnectionConfig) -> Result<Self, VaultError> {
        let api: Box<dyn RemoteApi> = match config.generation {
            ApiGeneration::Legacy => Box::new(LegacyApi::login(config).await?),
            ApiGeneration::Current => Box::new(CurrentApi::open(config)?),
        };
        let crypto = Arc::new(AesCryptoProvider::new(config.kdf_iterations));
        Ok(Self::new(api, crypto, config.master_key.clone()))
    }

    /// Wrap an already connected API.
    pub fn new(
        api: Box<dyn RemoteApi>,
        crypto: Arc<dyn CryptoProvider>,
        master_key: Option<Zeroizing<String>>,
    ) -> Self {
        Self {
            api,
            crypto,
            master_key: master_key.filter(|k| !k.is_empty()),
            released: AtomicBool::new(false),
        }
    }

    pub fn api(&self) -> &dyn RemoteApi {
        self.api.as_ref()
    }

    pub fn crypto(&self) -> &dyn CryptoProvider {
        self.crypto.as_ref()
    }

    pub fn generation(&self) -> ApiGeneration {
        self.api.generation()
    }

    /// `true` when secrets are encrypted client-side.
    pub fn has_master_key(&self) -> bool {
        self.master_key.is_some()
    }

    /// Derive the master key afresh. `None` in server-managed mode.
    pub fn master_key(&self) -> Result<Option<Key>, VaultError> {
        self.master_key
            .as_ref()
            .map(|passphrase| {
                self.crypto
                    .derive_master_key(passphrase)
                    .map_err(|e| VaultError::KeyDerivation(format!("master key: {e}")))
            })
            .transpose()
    }

    /// Release server-side session state. Only the first call does anything.
    pub async fn release(&self) -> Result<(), VaultError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(generation = self.generation().as_str(), "releasing session");
        self.api.release().await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.released.load(Ordering::SeqCst) {
            warn!(
                generation = self.generation().as_str(),
                "session dropped without release"
            );
        }
    }
}

/// Run `op` on `session`, then release it on every exit path: success,
/// error and panic.
///
/// A release failure after a successful operation is logged and the result
/// is still returned; after a failed operation the operation's error wins.
pub async fn scoped<T, F>(session: Session, op: F) -> Result<T, VaultError>
where
    F: for<'a> FnOnce(&'a Session) -> BoxFuture<'a, Result<T, VaultError>>,
{
    let outcome = AssertUnwindSafe(op(&session)).catch_unwind().await;
    let released = session.release().await;

    let result = match outcome {
        Ok(result) => result,
        Err(panic) => {
            if let Err(e) = released {
                warn!(error = %e, "session release failed while unwinding");
            }
            std::panic::resume_unwind(panic);
        }
    };

    match (result, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(value), Err(e)) => {
            warn!(error = %e, "session release failed after a successful operation");
            Ok(value)
        }
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_err)) => {
            warn!(error = %release_err, "session release failed");
            Err(e)
        }
    }
}

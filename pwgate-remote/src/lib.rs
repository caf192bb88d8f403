//! Remote access layer for pwgate.
//!
//! Resolves human-readable names and paths to server IDs, manages the
//! envelope-key hierarchy client-side, and drives both generations of the
//! vault REST API.
//!
//! # Architecture
//!
//! - **`legacy`** / **`current`**: the two `RemoteApi` implementations
//! - **`http`**: shared request plumbing, response envelopes, token storage
//! - **`crypto`** / **`cipher`** / **`provider`**: PBKDF2 + HKDF master keys,
//!   `2.iv|ct|mac` cipher strings, the `CryptoProvider`
//! - **`session`**: one authenticated connection, released by `scoped`
//! - **`resolver`**: exact-match lookups over fuzzy server searches
//! - **`keys`**: vault, item and write keys; secret encryption
//! - **`orchestrator`**: per-entity operations
//! - **`client`**: the public facade, one session per call
//!
//! # Usage
//!
//! ```rust,ignore
//! use pwgate_core::ConnectionParams;
//! use pwgate_core::args::SecretPathArgs;
//! use pwgate_remote::Client;
//!
//! let client = Client::from_params(params)?;
//! let secret = client
//!     .secret_get_by_path(SecretPathArgs { path: Some("Infra/DB/prod-mysql".into()) })
//!     .await?;
//! ```

pub mod cipher;
pub mod client;
pub mod crypto;
pub mod current;
pub mod error;
pub mod http;
pub mod keys;
pub mod legacy;
pub mod orchestrator;
pub mod provider;
pub mod resolver;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{Client, Connect, HttpConnector};
pub use error::ApiError;
pub use provider::AesCryptoProvider;
pub use session::{Session, scoped};

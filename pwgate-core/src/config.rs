//! Session-open configuration.
//!
//! The host hands over a flat parameter set ([`ConnectionParams`]); it is
//! validated once into a typed [`ConnectionConfig`] before anything touches
//! the network. An optional TOML profile can supply defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::VaultError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_KDF_ITERATIONS: u32 = 100_000;

/// Which backend API generation a server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiGeneration {
    /// Single API token exchanged for a session token, `/api/v4` routes.
    #[serde(alias = "v4")]
    Legacy,
    /// Externally issued access/refresh token pair, `/api/v1` routes.
    #[serde(alias = "v7")]
    Current,
}

impl ApiGeneration {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Current => "current",
        }
    }
}

/// Deserialize an `Option<String>` field directly into an `Option<Zeroizing<String>>`.
pub(crate) fn deser_opt_zeroizing_string<'de, D>(
    de: D,
) -> Result<Option<Zeroizing<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(de)?;
    Ok(opt.map(Zeroizing::new))
}

/// Raw connection parameters as supplied by the host or a profile file.
#[derive(Default, Clone, Deserialize)]
pub struct ConnectionParams {
    #[serde(default, alias = "host")]
    pub api_server: Option<String>,
    #[serde(default, alias = "api_generation")]
    pub api_version: Option<ApiGeneration>,
    /// Legacy API token.
    #[serde(default, alias = "api_key", deserialize_with = "deser_opt_zeroizing_string")]
    pub token: Option<Zeroizing<String>>,
    #[serde(default, deserialize_with = "deser_opt_zeroizing_string")]
    pub access_token: Option<Zeroizing<String>>,
    #[serde(default, deserialize_with = "deser_opt_zeroizing_string")]
    pub refresh_token: Option<Zeroizing<String>>,
    #[serde(
        default,
        alias = "master_password",
        deserialize_with = "deser_opt_zeroizing_string"
    )]
    pub master_key: Option<Zeroizing<String>>,
    #[serde(default, alias = "verify_tls")]
    pub verify_ssl: Option<bool>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub kdf_iterations: Option<u32>,
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn r<T>(opt: &Option<T>) -> &'static str {
            if opt.is_some() { "[redacted]" } else { "<none>" }
        }
        f.debug_struct("ConnectionParams")
            .field("api_server", &self.api_server)
            .field("api_version", &self.api_version)
            .field("token", &r(&self.token))
            .field("access_token", &r(&self.access_token))
            .field("refresh_token", &r(&self.refresh_token))
            .field("master_key", &r(&self.master_key))
            .field("verify_ssl", &self.verify_ssl)
            .field("timeout_secs", &self.timeout_secs)
            .field("kdf_iterations", &self.kdf_iterations)
            .finish()
    }
}

impl ConnectionParams {
    /// Load defaults from a TOML profile file.
    pub fn from_profile(path: &Path) -> Result<Self, VaultError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| VaultError::validation("profile", format!("{}: {e}", path.display())))?;
        let params: Self = toml::from_str(&text)
            .map_err(|e| VaultError::validation("profile", format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "loaded connection profile");
        Ok(params)
    }

    /// Fill every unset field from `defaults`. Values already set win.
    pub fn or_defaults(self, defaults: Self) -> Self {
        Self {
            api_server: self.api_server.or(defaults.api_server),
            api_version: self.api_version.or(defaults.api_version),
            token: self.token.or(defaults.token),
            access_token: self.access_token.or(defaults.access_token),
            refresh_token: self.refresh_token.or(defaults.refresh_token),
            master_key: self.master_key.or(defaults.master_key),
            verify_ssl: self.verify_ssl.or(defaults.verify_ssl),
            timeout_secs: self.timeout_secs.or(defaults.timeout_secs),
            kdf_iterations: self.kdf_iterations.or(defaults.kdf_iterations),
        }
    }

    /// Validate into a typed configuration.
    ///
    /// When `api_version` is not given the generation follows from the
    /// credentials supplied: a `token` means legacy, an `access_token` current.
    pub fn validate(self) -> Result<ConnectionConfig, VaultError> {
        let server = self
            .api_server
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| VaultError::missing("api_server"))?;

        let generation = match (self.api_version, &self.token, &self.access_token) {
            (Some(g), _, _) => g,
            (None, Some(_), None) => ApiGeneration::Legacy,
            (None, None, Some(_)) => ApiGeneration::Current,
            (None, Some(_), Some(_)) => {
                return Err(VaultError::validation(
                    "api_version",
                    "both token and access_token given; set api_version to choose",
                ));
            }
            (None, None, None) => {
                return Err(VaultError::missing_unless("access_token", "token"));
            }
        };

        let credentials = match generation {
            ApiGeneration::Legacy => Credentials::ApiToken(
                self.token
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| VaultError::missing("token"))?,
            ),
            ApiGeneration::Current => Credentials::TokenPair {
                access: self
                    .access_token
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| VaultError::missing("access_token"))?,
                refresh: self.refresh_token.filter(|t| !t.is_empty()),
            },
        };

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(VaultError::validation("timeout_secs", "must be positive"));
        }

        let kdf_iterations = self.kdf_iterations.unwrap_or(DEFAULT_KDF_ITERATIONS);
        if kdf_iterations == 0 {
            return Err(VaultError::validation("kdf_iterations", "must be positive"));
        }

        Ok(ConnectionConfig {
            server: server.trim_end_matches('/').to_string(),
            generation,
            credentials,
            master_key: self.master_key.filter(|m| !m.is_empty()),
            verify_tls: self.verify_ssl.unwrap_or(true),
            timeout: Duration::from_secs(timeout_secs),
            kdf_iterations,
        })
    }
}

/// Credential material for one API generation.
#[derive(Clone)]
pub enum Credentials {
    ApiToken(Zeroizing<String>),
    TokenPair {
        access: Zeroizing<String>,
        refresh: Option<Zeroizing<String>>,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiToken(_) => f.debug_tuple("ApiToken").field(&"[redacted]").finish(),
            Self::TokenPair { refresh, .. } => f
                .debug_struct("TokenPair")
                .field("access", &"[redacted]")
                .field("refresh", &refresh.as_ref().map(|_| "[redacted]"))
                .finish(),
        }
    }
}

/// Validated session-open configuration.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub server: String,
    pub generation: ApiGeneration,
    pub credentials: Credentials,
    /// Client-side master key passphrase. `None` means server-managed encryption.
    pub master_key: Option<Zeroizing<String>>,
    pub verify_tls: bool,
    pub timeout: Duration,
    pub kdf_iterations: u32,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("server", &self.server)
            .field("generation", &self.generation)
            .field("credentials", &self.credentials)
            .field("master_key", &self.master_key.as_ref().map(|_| "[redacted]"))
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .field("kdf_iterations", &self.kdf_iterations)
            .finish()
    }
}

//! `Vault/Folder/.../Secret` locators.

use crate::error::VaultError;

/// A parsed secret path: a vault name, zero or more folder names, and the
/// secret name, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretPath {
    raw: String,
    segments: Vec<String>,
}

impl SecretPath {
    /// Parse a slash-delimited path.
    ///
    /// Fails with [`VaultError::InvalidPath`] if there are fewer than two
    /// segments or any segment is empty (or only whitespace).
    pub fn parse(raw: &str) -> Result<Self, VaultError> {
        let invalid = |reason| VaultError::InvalidPath {
            path: raw.to_string(),
            reason,
        };

        let segments: Vec<String> = raw.split('/').map(str::to_string).collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("path segments must not be empty"));
        }
        if segments.len() < 2 {
            return Err(invalid(
                "path needs at least a vault and a secret name (vault/.../secret)",
            ));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn vault(&self) -> &str {
        &self.segments[0]
    }

    /// Folder names between the vault and the secret, outermost first.
    pub fn folders(&self) -> &[String] {
        &self.segments[1..self.segments.len() - 1]
    }

    pub fn secret_name(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }
}

impl std::fmt::Display for SecretPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for SecretPath {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

//! Failure taxonomy shared by every operation.

use std::fmt;

/// The kind of entity a resolution failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Vault,
    Folder,
    Secret,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vault => "vault",
            Self::Folder => "folder",
            Self::Secret => "secret",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every way an operation can fail.
///
/// Messages carry names, paths, field names and server responses, never
/// plaintext or key material.
#[derive(thiserror::Error, Debug)]
pub enum VaultError {
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("field {field:?} is required{}", unless_suffix(.alternative))]
    MissingField {
        field: &'static str,
        alternative: Option<&'static str>,
    },

    #[error("both {id_field:?} and {search_field:?} were given; supply exactly one")]
    AmbiguousAddressing {
        id_field: &'static str,
        search_field: &'static str,
    },

    #[error("validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{kind} {name:?} not found")]
    NotFound { kind: EntityKind, name: String },

    #[error("{kind} {name:?} is ambiguous, candidates: {candidates:?}")]
    AmbiguousEntity {
        kind: EntityKind,
        name: String,
        candidates: Vec<String>,
    },

    #[error("session error: {0}")]
    Session(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("remote error ({}): {body}", status_label(.status))]
    Remote { status: Option<u16>, body: String },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("decryption failed: {0}")]
    Decryption(String),
}

impl VaultError {
    /// Stable machine-readable tag for the host boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPath { .. } => "invalid_path",
            Self::MissingField { .. } => "missing_field",
            Self::AmbiguousAddressing { .. } => "ambiguous_addressing",
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::AmbiguousEntity { .. } => "ambiguous_entity",
            Self::Session(_) => "session",
            Self::Connection(_) => "connection",
            Self::Remote { .. } => "remote",
            Self::KeyDerivation(_) => "key_derivation",
            Self::Decryption(_) => "decryption",
        }
    }

    /// `true` for failures detected before any network call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::InvalidPath { .. }
                | Self::MissingField { .. }
                | Self::AmbiguousAddressing { .. }
                | Self::Validation { .. }
        )
    }

    pub fn missing(field: &'static str) -> Self {
        Self::MissingField {
            field,
            alternative: None,
        }
    }

    pub fn missing_unless(field: &'static str, alternative: &'static str) -> Self {
        Self::MissingField {
            field,
            alternative: Some(alternative),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn timeout() -> Self {
        Self::Remote {
            status: None,
            body: "request timed out".to_string(),
        }
    }
}

fn unless_suffix(alternative: &Option<&'static str>) -> String {
    alternative
        .map(|a| format!(" unless {a} is given"))
        .unwrap_or_default()
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "no response".to_string(), |s| s.to_string())
}

/// Failure reported by a [`CryptoProvider`](crate::CryptoProvider).
///
/// Callers decide whether it means a key could not be unwrapped or a field
/// could not be decrypted.
#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct CryptoError(pub String);

impl CryptoError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_mentions_alternative() {
        let err = VaultError::missing_unless("name", "folder_id");
        assert_eq!(
            err.to_string(),
            "field \"name\" is required unless folder_id is given"
        );
        assert_eq!(VaultError::missing("vault").to_string(), "field \"vault\" is required");
    }

    #[test]
    fn remote_timeout_display() {
        assert_eq!(
            VaultError::timeout().to_string(),
            "remote error (no response): request timed out"
        );
        let err = VaultError::Remote {
            status: Some(500),
            body: "{\"status\":\"error\"}".to_string(),
        };
        assert_eq!(err.to_string(), "remote error (500): {\"status\":\"error\"}");
    }

    #[test]
    fn local_errors_are_flagged() {
        assert!(VaultError::missing("x").is_local());
        assert!(
            VaultError::InvalidPath {
                path: "a".to_string(),
                reason: "too short"
            }
            .is_local()
        );
        assert!(!VaultError::Session("expired".to_string()).is_local());
        assert!(
            !VaultError::NotFound {
                kind: EntityKind::Vault,
                name: "Infra".to_string()
            }
            .is_local()
        );
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(VaultError::Decryption(String::new()).kind(), "decryption");
        assert_eq!(
            VaultError::AmbiguousEntity {
                kind: EntityKind::Folder,
                name: "DB".to_string(),
                candidates: vec![],
            }
            .kind(),
            "ambiguous_entity"
        );
    }
}

//! Outgoing request values.
//!
//! Every payload is assembled by a builder from already-resolved IDs and
//! already-encrypted material, then handed to the transport as an immutable
//! value. Nothing here mutates a caller-supplied structure.

use serde::Serialize;

use crate::model::{Attachment, CustomField, KeyEncryptionMode};

/// Folder search, scoped to a vault and optionally to a parent folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderQuery {
    pub query: String,
    pub vault_id: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "parentFolderId")]
    pub parent_id: Option<String>,
}

impl FolderQuery {
    pub fn new(query: impl Into<String>, vault_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            vault_id: vault_id.into(),
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = parent_id;
        self
    }
}

/// Secret search. Results come back ordered by relevance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretQuery {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<i64>,
    pub include_shared: bool,
    pub include_shortcuts: bool,
}

impl SecretQuery {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            query: name.into(),
            ..Self::default()
        }
    }

    pub fn in_vault(mut self, vault_id: impl Into<String>) -> Self {
        self.vault_id = Some(vault_id.into());
        self
    }
}

/// Body for creating a vault.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_key: Option<String>,
    pub key_encryption_mode: KeyEncryptionMode,
}

/// Body for creating or updating a folder. Absent fields are left alone by
/// an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vault_id: Option<String>,
    /// `Some(None)` re-parents to the vault root.
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<Option<String>>,
}

impl FolderPayload {
    pub fn create(
        name: impl Into<String>,
        vault_id: impl Into<String>,
        parent_id: Option<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            vault_id: Some(vault_id.into()),
            parent_id: Some(parent_id),
        }
    }

    pub fn update(name: Option<String>, parent_id: Option<Option<String>>) -> Self {
        Self {
            name,
            vault_id: None,
            parent_id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn vault_id(&self) -> Option<&str> {
        self.vault_id.as_deref()
    }

    pub fn parent_id(&self) -> Option<Option<&str>> {
        self.parent_id.as_ref().map(|p| p.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.vault_id.is_none() && self.parent_id.is_none()
    }
}

/// Secret-bearing fields after encryption under the effective key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crypted_password: Option<String>,
    /// Per-item key wrapped under the vault key, when the vault uses item keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crypted_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<Vec<CustomField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

impl EncryptedPayload {
    pub fn is_empty(&self) -> bool {
        self.crypted_password.is_none()
            && self.crypted_key.is_none()
            && self.custom.is_none()
            && self.attachments.is_none()
    }
}

/// Body for creating or updating a secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    vault_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    folder_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shortcut_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<String>,
    #[serde(flatten)]
    encrypted: EncryptedPayload,
}

impl SecretPayload {
    pub fn builder() -> SecretPayloadBuilder {
        SecretPayloadBuilder {
            inner: Self::default(),
        }
    }

    pub fn vault_id(&self) -> Option<&str> {
        self.vault_id.as_deref()
    }

    pub fn folder_id(&self) -> Option<Option<&str>> {
        self.folder_id.as_ref().map(|f| f.as_deref())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn encrypted(&self) -> &EncryptedPayload {
        &self.encrypted
    }
}

/// Consuming builder for [`SecretPayload`].
#[derive(Debug)]
pub struct SecretPayloadBuilder {
    inner: SecretPayload,
}

impl SecretPayloadBuilder {
    pub fn vault_id(mut self, id: impl Into<String>) -> Self {
        self.inner.vault_id = Some(id.into());
        self
    }

    /// `None` places the secret at the vault root.
    pub fn folder_id(mut self, id: Option<String>) -> Self {
        self.inner.folder_id = Some(id);
        self
    }

    pub fn name(mut self, name: Option<String>) -> Self {
        self.inner.name = name;
        self
    }

    pub fn login(mut self, login: Option<String>) -> Self {
        self.inner.login = login;
        self
    }

    pub fn url(mut self, url: Option<String>) -> Self {
        self.inner.url = url;
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.inner.description = description;
        self
    }

    pub fn tags(mut self, tags: Option<Vec<String>>) -> Self {
        self.inner.tags = tags;
        self
    }

    pub fn color(mut self, color: Option<i64>) -> Self {
        self.inner.color = color;
        self
    }

    pub fn shortcut_id(mut self, id: Option<String>) -> Self {
        self.inner.shortcut_id = id;
        self
    }

    pub fn snapshot(mut self, snapshot: Option<String>) -> Self {
        self.inner.snapshot = snapshot;
        self
    }

    pub fn encrypted(mut self, encrypted: EncryptedPayload) -> Self {
        self.inner.encrypted = encrypted;
        self
    }

    pub fn build(self) -> SecretPayload {
        self.inner
    }
}

/// Body for moving a secret to another vault and/or folder.
///
/// Carries re-encrypted material when the destination vault uses a
/// different key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    vault_id: String,
    folder_id: Option<String>,
    #[serde(flatten)]
    encrypted: EncryptedPayload,
}

impl MovePayload {
    pub fn new(vault_id: impl Into<String>, folder_id: Option<String>) -> Self {
        Self {
            vault_id: vault_id.into(),
            folder_id,
            encrypted: EncryptedPayload::default(),
        }
    }

    pub fn with_encrypted(mut self, encrypted: EncryptedPayload) -> Self {
        self.encrypted = encrypted;
        self
    }

    pub fn vault_id(&self) -> &str {
        &self.vault_id
    }

    pub fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref()
    }

    pub fn encrypted(&self) -> &EncryptedPayload {
        &self.encrypted
    }
}

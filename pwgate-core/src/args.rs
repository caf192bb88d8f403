//! Per-operation arguments.
//!
//! Each `*Args` struct is the raw, serde-friendly shape the host passes in.
//! `validate()` turns it into a typed value the orchestrators work from, so
//! every local failure (missing field, conflicting addressing, malformed
//! custom field, unreadable attachment) surfaces before the first request.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::VaultError;
use crate::path::SecretPath;

/// Distinguish "field absent" from "field explicitly null".
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Caller-supplied plaintext, scrubbed on drop and redacted in `Debug`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[redacted]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self(Zeroizing::new(String::deserialize(de)?)))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, VaultError> {
    non_empty(value).ok_or_else(|| VaultError::missing(field))
}

// ── Addressing ──────────────────────────────────────────────────────────────

/// Exactly one of a direct ID or a search-based locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing<S> {
    Id(String),
    Search(S),
}

impl<S> Addressing<S> {
    /// Both given fails with `AmbiguousAddressing`, neither with `MissingField`.
    pub fn from_parts(
        id: Option<String>,
        search: Option<S>,
        id_field: &'static str,
        search_field: &'static str,
    ) -> Result<Self, VaultError> {
        match (non_empty(id), search) {
            (Some(_), Some(_)) => Err(VaultError::AmbiguousAddressing {
                id_field,
                search_field,
            }),
            (Some(id), None) => Ok(Self::Id(id)),
            (None, Some(search)) => Ok(Self::Search(search)),
            (None, None) => Err(VaultError::missing_unless(search_field, id_field)),
        }
    }
}

/// A folder named by ID, or by name inside a named vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderAddressing {
    Id(String),
    /// `name` is a root-level folder name or a `Parent/Child` chain.
    Named { vault: String, name: String },
}

impl FolderAddressing {
    fn from_parts(
        folder_id: Option<String>,
        name: Option<String>,
        vault: Option<String>,
        name_field: &'static str,
    ) -> Result<Self, VaultError> {
        match Addressing::from_parts(folder_id, non_empty(name), "folder_id", name_field)? {
            Addressing::Id(id) => Ok(Self::Id(id)),
            Addressing::Search(name) => {
                let vault = non_empty(vault)
                    .ok_or_else(|| VaultError::missing_unless("vault", "folder_id"))?;
                Ok(Self::Named { vault, name })
            }
        }
    }
}

// ── Vaults ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VaultCreateArgs {
    pub name: Option<String>,
    /// Give every secret its own key, wrapped under the vault key.
    #[serde(alias = "use_key_encryption")]
    pub per_item_keys: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVault {
    pub name: String,
    pub per_item_keys: bool,
}

impl VaultCreateArgs {
    pub fn validate(self) -> Result<NewVault, VaultError> {
        Ok(NewVault {
            name: required(self.name, "name")?,
            per_item_keys: self.per_item_keys,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VaultGetArgs {
    pub vault_id: Option<String>,
    #[serde(alias = "vault")]
    pub name: Option<String>,
}

impl VaultGetArgs {
    pub fn validate(self) -> Result<Addressing<String>, VaultError> {
        Addressing::from_parts(self.vault_id, non_empty(self.name), "vault_id", "name")
    }
}

// ── Folders ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FolderCreateArgs {
    pub vault: Option<String>,
    pub name: Option<String>,
    /// Name of the parent folder; absent creates at the vault root.
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFolder {
    pub vault: String,
    pub name: String,
    pub parent: Option<String>,
}

impl FolderCreateArgs {
    pub fn validate(self) -> Result<NewFolder, VaultError> {
        Ok(NewFolder {
            vault: required(self.vault, "vault")?,
            name: required(self.name, "name")?,
            parent: non_empty(self.parent),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FolderSearchArgs {
    pub vault: Option<String>,
    #[serde(alias = "name")]
    pub query: Option<String>,
    /// Restrict results to children of folders with this name.
    #[serde(alias = "parent_folder")]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSearch {
    pub vault: String,
    pub query: String,
    pub parent: Option<String>,
}

impl FolderSearchArgs {
    pub fn validate(self) -> Result<FolderSearch, VaultError> {
        Ok(FolderSearch {
            vault: required(self.vault, "vault")?,
            query: required(self.query, "query")?,
            parent: non_empty(self.parent),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FolderGetArgs {
    pub folder_id: Option<String>,
}

impl FolderGetArgs {
    pub fn validate(self) -> Result<String, VaultError> {
        required(self.folder_id, "folder_id")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FolderUpdateArgs {
    pub folder_id: Option<String>,
    /// Current name or `Parent/Child` chain of the folder to update.
    pub folder: Option<String>,
    pub vault: Option<String>,
    /// New name.
    pub name: Option<String>,
    /// New parent folder name; `null` moves the folder to the vault root.
    #[serde(deserialize_with = "double_option")]
    pub parent: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderUpdate {
    pub target: FolderAddressing,
    pub name: Option<String>,
    pub parent: Option<Option<String>>,
}

impl FolderUpdateArgs {
    pub fn validate(self) -> Result<FolderUpdate, VaultError> {
        let target =
            FolderAddressing::from_parts(self.folder_id, self.folder, self.vault, "folder")?;
        let name = non_empty(self.name);
        let parent = self.parent.map(non_empty);
        if name.is_none() && parent.is_none() {
            return Err(VaultError::missing_unless("name", "parent"));
        }
        Ok(FolderUpdate {
            target,
            name,
            parent,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FolderDeleteArgs {
    pub folder_id: Option<String>,
    #[serde(alias = "folder")]
    pub name: Option<String>,
    pub vault: Option<String>,
}

impl FolderDeleteArgs {
    pub fn validate(self) -> Result<FolderAddressing, VaultError> {
        FolderAddressing::from_parts(self.folder_id, self.name, self.vault, "name")
    }
}

// ── Secret material ─────────────────────────────────────────────────────────

/// A custom field as the caller supplies it, value in plaintext.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CustomFieldInput {
    pub name: String,
    pub value: SecretString,
    #[serde(rename = "type")]
    pub field_type: String,
}

impl CustomFieldInput {
    pub fn new(name: &str, value: &str, field_type: &str) -> Self {
        Self {
            name: name.to_string(),
            value: SecretString::new(value),
            field_type: field_type.to_string(),
        }
    }

    /// `name`, `value` and `type` must all be present and non-empty.
    pub fn validate(&self, index: usize) -> Result<(), VaultError> {
        let blank = if self.name.trim().is_empty() {
            Some("name")
        } else if self.value.is_empty() {
            Some("value")
        } else if self.field_type.trim().is_empty() {
            Some("type")
        } else {
            None
        };
        match blank {
            Some(part) => Err(VaultError::validation(
                format!("custom[{index}].{part}"),
                "must be present and non-empty",
            )),
            None => Ok(()),
        }
    }
}

/// An attachment reference: a local file plus an optional display name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AttachmentArg {
    pub path: PathBuf,
    pub name: Option<String>,
}

impl AttachmentArg {
    /// Read the file. The display name defaults to the file name.
    pub fn load(&self, index: usize) -> Result<AttachmentInput, VaultError> {
        let field = || format!("attachments[{index}].path");
        if self.path.as_os_str().is_empty() {
            return Err(VaultError::validation(field(), "must be present and non-empty"));
        }
        let data = std::fs::read(&self.path)
            .map_err(|e| VaultError::validation(field(), format!("{}: {e}", self.path.display())))?;
        let name = match non_empty(self.name.clone()) {
            Some(n) => n,
            None => self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| VaultError::validation(field(), "has no file name"))?,
        };
        debug!(name = %name, bytes = data.len(), "loaded attachment");
        Ok(AttachmentInput {
            name,
            data: Zeroizing::new(data),
        })
    }
}

/// Attachment content ready for encryption.
#[derive(Clone)]
pub struct AttachmentInput {
    pub name: String,
    pub data: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for AttachmentInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentInput")
            .field("name", &self.name)
            .field("data", &format_args!("[{} bytes redacted]", self.data.len()))
            .finish()
    }
}

fn load_attachments(args: &[AttachmentArg]) -> Result<Vec<AttachmentInput>, VaultError> {
    args.iter().enumerate().map(|(i, a)| a.load(i)).collect()
}

/// Plaintext secret-bearing fields. `None` means "not supplied".
#[derive(Debug, Clone, Default)]
pub struct SecretFields {
    pub password: Option<SecretString>,
    pub custom: Option<Vec<CustomFieldInput>>,
    pub attachments: Option<Vec<AttachmentInput>>,
}

impl SecretFields {
    pub fn is_empty(&self) -> bool {
        self.password.is_none() && self.custom.is_none() && self.attachments.is_none()
    }

    pub fn validate(&self) -> Result<(), VaultError> {
        for (i, field) in self.custom.iter().flatten().enumerate() {
            field.validate(i)?;
        }
        Ok(())
    }
}

// ── Secrets ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecretSearchArgs {
    pub query: Option<String>,
    pub tags: Vec<String>,
    pub colors: Vec<i64>,
    /// Vault name; resolved to an ID before searching.
    pub vault: Option<String>,
    pub include_shared: bool,
    pub include_shortcuts: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretSearch {
    pub query: String,
    pub tags: Vec<String>,
    pub colors: Vec<i64>,
    pub vault: Option<String>,
    pub include_shared: bool,
    pub include_shortcuts: bool,
}

impl SecretSearchArgs {
    pub fn validate(self) -> Result<SecretSearch, VaultError> {
        Ok(SecretSearch {
            query: required(self.query, "query")?,
            tags: self.tags,
            colors: self.colors,
            vault: non_empty(self.vault),
            include_shared: self.include_shared,
            include_shortcuts: self.include_shortcuts,
        })
    }
}

/// Locates a single secret for update, delete and move.
pub type SecretTarget = Addressing<SecretSearch>;

fn secret_target(
    password_id: Option<String>,
    search_args: Option<SecretSearchArgs>,
) -> Result<SecretTarget, VaultError> {
    match Addressing::from_parts(password_id, search_args, "password_id", "search_args")? {
        Addressing::Id(id) => Ok(Addressing::Id(id)),
        Addressing::Search(search) => Ok(Addressing::Search(search.validate()?)),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecretGetArgs {
    pub password_id: Option<String>,
}

impl SecretGetArgs {
    pub fn validate(self) -> Result<String, VaultError> {
        required(self.password_id, "password_id")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecretPathArgs {
    pub path: Option<String>,
}

impl SecretPathArgs {
    pub fn validate(self) -> Result<SecretPath, VaultError> {
        let raw = self.path.ok_or_else(|| VaultError::missing("path"))?;
        SecretPath::parse(&raw)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecretCreateArgs {
    pub vault: Option<String>,
    /// Folder name, or a `Parent/Child` chain. Absent creates at the vault root.
    pub folder: Option<String>,
    pub name: Option<String>,
    pub login: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub password: Option<SecretString>,
    pub shortcut_id: Option<String>,
    pub tags: Vec<String>,
    pub snapshot: Option<String>,
    pub color: Option<i64>,
    pub custom: Vec<CustomFieldInput>,
    pub attachments: Vec<AttachmentArg>,
}

/// Validated input for creating a secret.
#[derive(Debug, Clone)]
pub struct NewSecret {
    pub vault: String,
    pub folder: Option<String>,
    pub name: String,
    pub login: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub shortcut_id: Option<String>,
    pub tags: Vec<String>,
    pub snapshot: Option<String>,
    pub color: Option<i64>,
    pub fields: SecretFields,
}

impl SecretCreateArgs {
    pub fn validate(self) -> Result<NewSecret, VaultError> {
        let vault = required(self.vault, "vault")?;
        let name = required(self.name, "name")?;
        let fields = SecretFields {
            password: self.password,
            custom: (!self.custom.is_empty()).then_some(self.custom),
            attachments: if self.attachments.is_empty() {
                None
            } else {
                Some(load_attachments(&self.attachments)?)
            },
        };
        fields.validate()?;
        Ok(NewSecret {
            vault,
            folder: non_empty(self.folder),
            name,
            login: self.login,
            url: self.url,
            description: self.description,
            shortcut_id: self.shortcut_id,
            tags: self.tags,
            snapshot: self.snapshot,
            color: self.color,
            fields,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecretUpdateArgs {
    pub password_id: Option<String>,
    pub search_args: Option<SecretSearchArgs>,
    pub name: Option<String>,
    pub login: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub password: Option<SecretString>,
    pub tags: Option<Vec<String>>,
    pub color: Option<i64>,
    /// New folder name within the secret's vault; `null` moves to the vault root.
    #[serde(deserialize_with = "double_option")]
    pub folder: Option<Option<String>>,
    pub custom: Option<Vec<CustomFieldInput>>,
    pub attachments: Option<Vec<AttachmentArg>>,
}

/// Fields an update changes. Every `None` is left as stored.
#[derive(Debug, Clone, Default)]
pub struct SecretChanges {
    pub name: Option<String>,
    pub login: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub color: Option<i64>,
    pub folder: Option<Option<String>>,
    pub fields: SecretFields,
}

impl SecretChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.login.is_none()
            && self.url.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.color.is_none()
            && self.folder.is_none()
            && self.fields.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SecretUpdate {
    pub target: SecretTarget,
    pub changes: SecretChanges,
}

impl SecretUpdateArgs {
    pub fn validate(self) -> Result<SecretUpdate, VaultError> {
        let target = secret_target(self.password_id, self.search_args)?;
        let attachments = self
            .attachments
            .as_deref()
            .map(load_attachments)
            .transpose()?;
        let changes = SecretChanges {
            name: non_empty(self.name),
            login: self.login,
            url: self.url,
            description: self.description,
            tags: self.tags,
            color: self.color,
            folder: self.folder.map(non_empty),
            fields: SecretFields {
                password: self.password,
                custom: self.custom,
                attachments,
            },
        };
        changes.fields.validate()?;
        if changes.is_empty() {
            return Err(VaultError::validation("update", "no fields to change"));
        }
        Ok(SecretUpdate { target, changes })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecretDeleteArgs {
    pub password_id: Option<String>,
    pub search_args: Option<SecretSearchArgs>,
}

impl SecretDeleteArgs {
    pub fn validate(self) -> Result<SecretTarget, VaultError> {
        secret_target(self.password_id, self.search_args)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecretMoveArgs {
    pub password_id: Option<String>,
    pub search_args: Option<SecretSearchArgs>,
    /// Destination vault name.
    pub vault: Option<String>,
    /// Destination folder name or chain; absent moves to the vault root.
    pub folder: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SecretMove {
    pub target: SecretTarget,
    pub vault: String,
    pub folder: Option<String>,
}

impl SecretMoveArgs {
    pub fn validate(self) -> Result<SecretMove, VaultError> {
        let target = secret_target(self.password_id, self.search_args)?;
        Ok(SecretMove {
            target,
            vault: required(self.vault, "vault")?,
            folder: non_empty(self.folder),
        })
    }
}

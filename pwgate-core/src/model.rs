//! Entities as the remote API returns them, and their decrypted forms.
//!
//! Both API generations deserialize into the same structs; field aliases
//! absorb the naming differences between them.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

/// How a vault protects the secrets stored in it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEncryptionMode {
    /// Every secret is encrypted directly with the vault key.
    #[default]
    VaultKey,
    /// Every secret gets its own random key, stored wrapped under the vault key.
    ItemKey,
}

impl<'de> Deserialize<'de> for KeyEncryptionMode {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Legacy servers send a boolean "use key encryption" flag, current
        // servers a mode string.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Mode(String),
        }

        match Raw::deserialize(de)? {
            Raw::Flag(true) => Ok(Self::ItemKey),
            Raw::Flag(false) => Ok(Self::VaultKey),
            Raw::Mode(m) => match m.as_str() {
                "vault_key" | "vault" | "shared" => Ok(Self::VaultKey),
                "item_key" | "item" | "individual" => Ok(Self::ItemKey),
                other => Err(serde::de::Error::custom(format!(
                    "unknown key encryption mode: {other}"
                ))),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: String,
    pub name: String,
    /// Vault key wrapped under the master key. Absent for server-managed vaults.
    #[serde(
        default,
        alias = "masterPass",
        alias = "vaultKey",
        skip_serializing_if = "Option::is_none"
    )]
    pub encrypted_key: Option<String>,
    #[serde(default, alias = "useKeyEncryption", alias = "keyEncryption")]
    pub key_encryption_mode: KeyEncryptionMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub vault_id: String,
    #[serde(default, alias = "parentFolderId")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub name: String,
    /// Ciphertext under the owning secret's effective key.
    pub value: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Ciphertext under the owning secret's effective key.
    #[serde(alias = "data")]
    pub encrypted_data: String,
}

/// A secret as stored on the server: metadata in the clear, secret-bearing
/// fields as ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    pub id: String,
    pub vault_id: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypted_password: Option<String>,
    /// Per-item key wrapped under the vault key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypted_key: Option<String>,
    #[serde(default, alias = "customs")]
    pub custom: Vec<CustomField>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Secret {
    /// `true` if any field needs a key to read.
    pub fn has_secret_material(&self) -> bool {
        self.crypted_password.as_deref().is_some_and(|p| !p.is_empty())
            || !self.custom.is_empty()
            || !self.attachments.is_empty()
    }
}

/// A decrypted custom field.
pub struct PlainCustomField {
    pub name: String,
    pub value: Zeroizing<String>,
    pub field_type: String,
}

impl std::fmt::Debug for PlainCustomField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlainCustomField")
            .field("name", &self.name)
            .field("value", &"[redacted]")
            .field("field_type", &self.field_type)
            .finish()
    }
}

/// A decrypted attachment.
pub struct PlainAttachment {
    pub id: Option<String>,
    pub name: String,
    pub data: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for PlainAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlainAttachment")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("data", &format_args!("[{} bytes redacted]", self.data.len()))
            .finish()
    }
}

/// A secret with every secret-bearing field decrypted.
///
/// `Clone` is not derived so plaintext is never duplicated behind the
/// caller's back. `Serialize` writes the plaintext: it exists to hand the
/// result to the caller, nothing else.
pub struct PlaintextSecret {
    pub secret: Secret,
    pub password: Option<Zeroizing<String>>,
    pub custom: Vec<PlainCustomField>,
    pub attachments: Vec<PlainAttachment>,
}

impl std::fmt::Debug for PlaintextSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaintextSecret")
            .field("id", &self.secret.id)
            .field("name", &self.secret.name)
            .field("vault_id", &self.secret.vault_id)
            .field("folder_id", &self.secret.folder_id)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("custom", &self.custom)
            .field("attachments", &self.attachments)
            .finish()
    }
}

impl Serialize for PlaintextSecret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Field<'a> {
            name: &'a str,
            value: &'a str,
            #[serde(rename = "type")]
            field_type: &'a str,
        }

        #[derive(Serialize)]
        struct File<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            id: Option<&'a str>,
            name: &'a str,
            data_base64: String,
        }

        let custom: Vec<Field<'_>> = self
            .custom
            .iter()
            .map(|c| Field {
                name: &c.name,
                value: c.value.as_str(),
                field_type: &c.field_type,
            })
            .collect();
        let attachments: Vec<File<'_>> = self
            .attachments
            .iter()
            .map(|a| File {
                id: a.id.as_deref(),
                name: &a.name,
                data_base64: B64.encode(a.data.as_slice()),
            })
            .collect();

        let mut st = serializer.serialize_struct("PlaintextSecret", 11)?;
        st.serialize_field("id", &self.secret.id)?;
        st.serialize_field("vaultId", &self.secret.vault_id)?;
        st.serialize_field("folderId", &self.secret.folder_id)?;
        st.serialize_field("name", &self.secret.name)?;
        st.serialize_field("login", &self.secret.login)?;
        st.serialize_field("url", &self.secret.url)?;
        st.serialize_field("description", &self.secret.description)?;
        st.serialize_field("tags", &self.secret.tags)?;
        st.serialize_field("password", &self.password.as_ref().map(|p| p.as_str()))?;
        st.serialize_field("custom", &custom)?;
        st.serialize_field("attachments", &attachments)?;
        st.end()
    }
}

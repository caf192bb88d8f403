//! Structured results on stdout and the process exit code.

use std::io::Write;
use std::process::ExitCode;

use serde::Serialize;

use pwgate_core::{Folder, PlaintextSecret, Secret, Vault, VaultError};

/// What a successful operation hands back to the host.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Output {
    Vaults(Vec<Vault>),
    Vault(Vault),
    Folders(Vec<Folder>),
    Folder(Folder),
    Secrets(Vec<Secret>),
    Secret(Secret),
    /// `null` when a path names no secret.
    Plaintext(Option<PlaintextSecret>),
    Deleted { id: String },
}

#[derive(Serialize)]
struct Success<'a> {
    ok: bool,
    result: &'a Output,
}

#[derive(Serialize)]
struct Failure<'a> {
    ok: bool,
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

/// 0 success, 2 local, 3 resolution, 4 crypto, 1 transport or session.
pub fn exit_code(err: &VaultError) -> u8 {
    match err {
        VaultError::InvalidPath { .. }
        | VaultError::MissingField { .. }
        | VaultError::AmbiguousAddressing { .. }
        | VaultError::Validation { .. } => 2,
        VaultError::NotFound { .. } | VaultError::AmbiguousEntity { .. } => 3,
        VaultError::KeyDerivation(_) | VaultError::Decryption(_) => 4,
        VaultError::Session(_) | VaultError::Connection(_) | VaultError::Remote { .. } => 1,
    }
}

/// Write the outcome as one JSON document and pick the exit code.
pub fn emit(
    out: &mut impl Write,
    outcome: &Result<Output, VaultError>,
) -> anyhow::Result<ExitCode> {
    let code = match outcome {
        Ok(result) => {
            serde_json::to_writer(&mut *out, &Success { ok: true, result })?;
            0
        }
        Err(err) => {
            let (status, body) = match err {
                VaultError::Remote { status, body } => (*status, Some(body.as_str())),
                _ => (None, None),
            };
            let error = ErrorBody {
                kind: err.kind(),
                message: err.to_string(),
                status,
                body,
            };
            serde_json::to_writer(&mut *out, &Failure { ok: false, error })?;
            exit_code(err)
        }
    };
    writeln!(out)?;
    out.flush()?;
    Ok(ExitCode::from(code))
}

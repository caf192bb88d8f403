//! The flat parameter document a host hands to `pwgate`.
//!
//! One JSON object carries both the connection fields and the operation's
//! arguments. Each side deserializes the keys it knows and ignores the rest.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::error::Category;
use serde_json::{Map, Value};
use tracing::debug;
use zeroize::Zeroizing;

use pwgate_core::{ConnectionParams, VaultError};

/// Connection settings given as flags or environment variables.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct ConnectionArgs {
    /// TOML profile supplying connection defaults
    #[arg(long, global = true, env = "PWGATE_PROFILE")]
    pub profile: Option<PathBuf>,

    /// Server base URL
    #[arg(long, global = true, env = "PWGATE_SERVER")]
    pub server: Option<String>,

    /// Legacy API token
    #[arg(long, global = true, env = "PWGATE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Current API access token
    #[arg(long, global = true, env = "PWGATE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    #[arg(long, global = true, env = "PWGATE_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Master key for client-side encryption
    #[arg(long, global = true, env = "PWGATE_MASTER_KEY", hide_env_values = true)]
    pub master_key: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,
}

impl ConnectionArgs {
    fn to_params(&self) -> ConnectionParams {
        ConnectionParams {
            api_server: self.server.clone(),
            token: self.token.clone().map(Zeroizing::new),
            access_token: self.access_token.clone().map(Zeroizing::new),
            refresh_token: self.refresh_token.clone().map(Zeroizing::new),
            master_key: self.master_key.clone().map(Zeroizing::new),
            verify_ssl: self.insecure.then_some(false),
            ..ConnectionParams::default()
        }
    }
}

fn invalid(e: impl std::fmt::Display) -> VaultError {
    VaultError::validation("params", e.to_string())
}

/// Phrases serde_json puts in front of a quoted copy of the rejected input.
const DATA_ERRORS: [&str; 5] = [
    "invalid type",
    "invalid value",
    "invalid length",
    "unknown variant",
    "unknown field",
];

/// A deserialization failure, reported without echoing the offending value.
fn rejected(e: serde_json::Error) -> VaultError {
    if e.classify() != Category::Data {
        return invalid(e);
    }
    let msg = e.to_string();
    if msg.starts_with("missing field") {
        return invalid(msg);
    }
    let what = DATA_ERRORS
        .into_iter()
        .find(|p| msg.starts_with(p))
        .unwrap_or("unexpected value");
    match msg.split_once(", expected ") {
        Some((_, expected)) => invalid(format!("{what}, expected {expected}")),
        None => invalid(what),
    }
}

/// Read the parameter document from a file, or stdin for `-`. No source
/// means an empty document.
pub fn load(source: Option<&Path>) -> Result<Value, VaultError> {
    let text = match source {
        None => return Ok(Value::Object(Map::new())),
        Some(p) if p == Path::new("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map_err(invalid)?;
            buf
        }
        Some(p) => std::fs::read_to_string(p)
            .map_err(|e| invalid(format!("{}: {e}", p.display())))?,
    };
    parse(&text)
}

pub fn parse(text: &str) -> Result<Value, VaultError> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let doc: Value = serde_json::from_str(text).map_err(rejected)?;
    if !doc.is_object() {
        return Err(invalid("expected a JSON object"));
    }
    Ok(doc)
}

/// Set `key` unless the document already has it.
pub fn with_default(mut doc: Value, key: &str, value: Option<String>) -> Value {
    if let (Value::Object(map), Some(value)) = (&mut doc, value) {
        map.entry(key).or_insert(Value::String(value));
    }
    doc
}

/// Connection parameters: the document first, then flags and environment,
/// then the profile.
pub fn connection(doc: &Value, args: &ConnectionArgs) -> Result<ConnectionParams, VaultError> {
    let explicit: ConnectionParams = serde_json::from_value(doc.clone()).map_err(rejected)?;
    let mut params = explicit.or_defaults(args.to_params());
    if let Some(profile) = &args.profile {
        params = params.or_defaults(ConnectionParams::from_profile(profile)?);
    }
    debug!(params = ?params, "connection parameters");
    Ok(params)
}

/// Deserialize an operation's arguments from the document.
pub fn operation<T: DeserializeOwned>(doc: &Value) -> Result<T, VaultError> {
    serde_json::from_value(doc.clone()).map_err(rejected)
}

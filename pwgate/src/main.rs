//! `pwgate`: run one vault operation from a flat JSON parameter document
//! and print a structured result.

mod output;
mod params;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use pwgate_core::args::{
    FolderCreateArgs, FolderDeleteArgs, FolderGetArgs, FolderSearchArgs, FolderUpdateArgs,
    SecretCreateArgs, SecretDeleteArgs, SecretGetArgs, SecretMoveArgs, SecretPathArgs,
    SecretSearchArgs, SecretUpdateArgs, VaultCreateArgs, VaultGetArgs,
};
use pwgate_core::VaultError;
use pwgate_remote::Client;

use output::Output;
use params::ConnectionArgs;

#[derive(Parser)]
#[command(
    name = "pwgate",
    about = "Resolve, read and change vault entries by name or path",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON parameter document; `-` reads stdin
    #[arg(short, long, global = true)]
    params: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log debug detail to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Vault operations
    Vault {
        #[command(subcommand)]
        op: VaultOp,
    },
    /// Folder operations
    Folder {
        #[command(subcommand)]
        op: FolderOp,
    },
    /// Secret operations
    Secret {
        #[command(subcommand)]
        op: SecretOp,
    },
}

#[derive(Subcommand)]
enum VaultOp {
    List,
    Get,
    Create,
}

#[derive(Subcommand)]
enum FolderOp {
    Create,
    Search,
    Get,
    Update,
    Delete,
}

#[derive(Subcommand)]
enum SecretOp {
    Search,
    Get,
    /// Read a secret by `Vault/Folder/.../Name`
    GetByPath {
        /// Used when the parameter document has no `path`
        path: Option<String>,
    },
    Create,
    Update,
    Delete,
    Move,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(client: &Client, command: Command, doc: Value) -> Result<Output, VaultError> {
    use params::operation;

    let out = match command {
        Command::Vault { op } => match op {
            VaultOp::List => Output::Vaults(client.vault_list().await?),
            VaultOp::Get => {
                Output::Vault(client.vault_get(operation::<VaultGetArgs>(&doc)?).await?)
            }
            VaultOp::Create => {
                Output::Vault(client.vault_create(operation::<VaultCreateArgs>(&doc)?).await?)
            }
        },
        Command::Folder { op } => match op {
            FolderOp::Create => {
                Output::Folder(client.folder_create(operation::<FolderCreateArgs>(&doc)?).await?)
            }
            FolderOp::Search => {
                Output::Folders(client.folder_search(operation::<FolderSearchArgs>(&doc)?).await?)
            }
            FolderOp::Get => {
                Output::Folder(client.folder_get(operation::<FolderGetArgs>(&doc)?).await?)
            }
            FolderOp::Update => {
                Output::Folder(client.folder_update(operation::<FolderUpdateArgs>(&doc)?).await?)
            }
            FolderOp::Delete => Output::Deleted {
                id: client.folder_delete(operation::<FolderDeleteArgs>(&doc)?).await?,
            },
        },
        Command::Secret { op } => match op {
            SecretOp::Search => {
                Output::Secrets(client.secret_search(operation::<SecretSearchArgs>(&doc)?).await?)
            }
            SecretOp::Get => Output::Plaintext(Some(
                client.secret_get(operation::<SecretGetArgs>(&doc)?).await?,
            )),
            SecretOp::GetByPath { path } => {
                let doc = params::with_default(doc, "path", path);
                Output::Plaintext(
                    client
                        .secret_get_by_path(operation::<SecretPathArgs>(&doc)?)
                        .await?,
                )
            }
            SecretOp::Create => {
                Output::Secret(client.secret_create(operation::<SecretCreateArgs>(&doc)?).await?)
            }
            SecretOp::Update => {
                Output::Secret(client.secret_update(operation::<SecretUpdateArgs>(&doc)?).await?)
            }
            SecretOp::Delete => Output::Deleted {
                id: client.secret_delete(operation::<SecretDeleteArgs>(&doc)?).await?,
            },
            SecretOp::Move => {
                Output::Secret(client.secret_move(operation::<SecretMoveArgs>(&doc)?).await?)
            }
        },
    };
    Ok(out)
}

async fn run(cli: Cli) -> Result<Output, VaultError> {
    let doc = params::load(cli.params.as_deref())?;
    let client = Client::from_params(params::connection(&doc, &cli.connection)?)?;
    dispatch(&client, cli.command, doc).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = run(cli).await;
    if let Err(e) = &outcome {
        tracing::debug!(kind = e.kind(), "operation failed");
    }
    let mut stdout = std::io::stdout().lock();
    output::emit(&mut stdout, &outcome).context("writing result to stdout")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nested_subcommands_and_globals() {
        let cli = Cli::try_parse_from([
            "pwgate",
            "secret",
            "get-by-path",
            "Infra/DB/prod-mysql",
            "--params",
            "-",
            "--insecure",
        ])
        .unwrap();
        assert!(cli.connection.insecure);
        assert_eq!(cli.params, Some(PathBuf::from("-")));
        match cli.command {
            Command::Secret {
                op: SecretOp::GetByPath { path },
            } => assert_eq!(path.as_deref(), Some("Infra/DB/prod-mysql")),
            _ => panic!("wrong subcommand"),
        }
    }

    #[tokio::test]
    async fn missing_connection_fails_before_any_request() {
        let cli = Cli::try_parse_from(["pwgate", "vault", "list"]).unwrap();
        let mut cli = cli;
        cli.connection = ConnectionArgs::default();
        let err = run(cli).await.unwrap_err();
        assert_eq!(err.kind(), "missing_field");
    }
}

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fleetscan_model::CredentialType;
use fleetscan_security::{secret_from_env, CredentialVault};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fleetscan", about = "fleetscan administrative CLI")]
struct Cli {
    #[arg(
        long,
        env = "FLEETSCAN_CREDENTIALS_DB",
        default_value = "data/settings/credentials.db"
    )]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Credential vault management
    Creds {
        #[command(subcommand)]
        action: CredsAction,
    },
}

#[derive(Subcommand)]
enum CredsAction {
    /// Create a new credential
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "ssh")]
        r#type: String,
        #[arg(
            long,
            help = "Provide the password directly (not recommended; use only in CI)",
            conflicts_with_all = ["password_stdin", "password_prompt"]
        )]
        password: Option<String>,
        #[arg(
            long = "password-stdin",
            default_value_t = false,
            help = "Read the password from STDIN (trailing newlines are trimmed)",
            conflicts_with = "password_prompt"
        )]
        password_stdin: bool,
        #[arg(
            long = "password-prompt",
            default_value_t = false,
            help = "Force an interactive password prompt even if STDIN is piped"
        )]
        password_prompt: bool,
        #[arg(long, help = "Expiry date, YYYY-MM-DD")]
        valid_until: Option<String>,
    },
    /// List stored credentials (metadata only; passwords are never shown)
    List,
    /// Delete a credential by id
    Delete {
        #[arg(long)]
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if let Some(parent) = cli.db.parent() {
        std::fs::create_dir_all(parent).context("creating credentials db directory")?;
    }
    let secret = secret_from_env().map_err(|err| anyhow::anyhow!("{err}"))?;
    let vault = CredentialVault::open(&cli.db, &secret).context("opening credential vault")?;

    match cli.command {
        Commands::Creds { action } => run_creds(&vault, action).await?,
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();
}

async fn run_creds(vault: &CredentialVault, action: CredsAction) -> Result<()> {
    match action {
        CredsAction::Create {
            name,
            username,
            r#type,
            password,
            password_stdin,
            password_prompt,
            valid_until,
        } => {
            let credential_type =
                CredentialType::from_str(&r#type).map_err(|err| anyhow::anyhow!("{err}"))?;
            let password_value = resolve_password(password, password_stdin, password_prompt)
                .context("password input")?;
            let valid_until = valid_until
                .map(|raw| {
                    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                        .with_context(|| format!("invalid --valid-until date '{raw}'"))
                })
                .transpose()?;

            let created = vault
                .create(&name, &username, credential_type, &password_value, valid_until)
                .await
                .map_err(|err| anyhow::anyhow!("{err}"))?;
            println!("Created credential #{} ({})", created.id, created.name);
        }
        CredsAction::List => {
            let credentials = vault.list().await.map_err(|err| anyhow::anyhow!("{err}"))?;
            for credential in credentials {
                println!(
                    "#{:<4} {:<20} user={:<16} type={:<8} status={:?}",
                    credential.id, credential.name, credential.username, credential.credential_type, credential.status
                );
            }
        }
        CredsAction::Delete { id } => {
            vault.delete(id).await.map_err(|err| anyhow::anyhow!("{err}"))?;
            println!("Deleted credential #{id}");
        }
    }
    Ok(())
}

fn resolve_password(
    password_flag: Option<String>,
    password_stdin: bool,
    password_prompt: bool,
) -> Result<String> {
    if let Some(value) = password_flag {
        eprintln!("warning: --password exposes secrets via argv; prefer --password-prompt or --password-stdin");
        return Ok(value);
    }

    if password_stdin {
        return read_password_from_stdin();
    }

    if password_prompt {
        return prompt_for_password();
    }

    if std::io::stdin().is_terminal() {
        return prompt_for_password();
    }

    bail!(
        "stdin is not a TTY; provide --password-stdin for automation or --password-prompt to force interactive entry"
    );
}

fn prompt_for_password() -> Result<String> {
    let password = rpassword::prompt_password("Credential password: ")
        .context("reading password interactively")?;
    if password.is_empty() {
        bail!("password cannot be empty");
    }
    Ok(password)
}

fn read_password_from_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("reading password from stdin")?;
    let password = buffer.trim_end_matches(|c| c == '\n' || c == '\r').to_string();
    if password.is_empty() {
        bail!("password from stdin cannot be empty");
    }
    Ok(password)
}

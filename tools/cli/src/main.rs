//! showcase-drive - operator tool for the showcase asset storage.
//!
//! `authorize` runs the one-time consent flow that mints the refresh token
//! the backend is configured with. The other commands exercise the storage
//! layer from the shell with the same configuration the backend uses.

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use url::Url;

use showcase_storage::gdrive::auth::DEFAULT_REDIRECT_URL;
use showcase_storage::gdrive::{AuthConfig, AuthManager};
use showcase_storage::{AssetStorage, Endpoints, Secret, StorageConfig, UploadRetry};

#[derive(Parser)]
#[command(name = "showcase-drive")]
#[command(about = "Showcase asset storage - Google Drive operator tool")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON storage config file. Environment variables are used when absent.
    #[arg(short, long, global = true, env = "SHOWCASE_STORAGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a long-lived refresh token through the consent screen.
    Authorize {
        /// OAuth2 client ID.
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: String,

        /// OAuth2 client secret.
        #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
        client_secret: String,

        /// Redirect URI registered for the OAuth2 client.
        #[arg(long, env = "GOOGLE_REDIRECT_URI", default_value = DEFAULT_REDIRECT_URL)]
        redirect_uri: String,

        /// Open the authorization URL in the default browser.
        #[arg(long)]
        open: bool,
    },

    /// Verify the configured credentials by listing one file.
    Check,

    /// Upload a local file and print its descriptor.
    Upload {
        /// File to upload.
        file: PathBuf,

        /// Name to store the asset under (default: the file name).
        #[arg(short, long)]
        name: Option<String>,

        /// MIME type (default: guessed from the extension).
        #[arg(short, long)]
        mime: Option<String>,

        /// Retry transient provider failures this many times.
        #[arg(short, long, default_value_t = 0)]
        retries: u32,
    },

    /// Delete an asset by ID. Already deleted assets are not an error.
    Remove {
        /// Asset ID returned by `upload`.
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    #[cfg(feature = "dotenv")]
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("Failed to load .env file: {}", err);
        }
    }

    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Authorize {
            client_id,
            client_secret,
            redirect_uri,
            open,
        } => cmd_authorize(client_id, client_secret, redirect_uri, open).await,

        Commands::Check => cmd_check(cli.config.as_deref()).await,

        Commands::Upload {
            file,
            name,
            mime,
            retries,
        } => cmd_upload(cli.config.as_deref(), &file, name, mime, retries).await,

        Commands::Remove { id } => cmd_remove(cli.config.as_deref(), &id).await,
    }
}

/// Load the storage configuration from a file, or from the environment.
fn load_config(path: Option<&Path>) -> Result<StorageConfig> {
    match path {
        Some(path) => StorageConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => StorageConfig::from_env().context("Failed to load config from environment"),
    }
}

/// Accept either the bare code or the whole redirect URL.
///
/// Returns the code and the `state` parameter when a URL was pasted.
fn extract_code(input: &str) -> Result<(String, Option<String>)> {
    let input = input.trim();
    if input.is_empty() {
        anyhow::bail!("No authorization code entered");
    }

    match Url::parse(input) {
        Ok(url) => {
            let query = |key: &str| {
                url.query_pairs()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.into_owned())
            };
            let code = query("code").context("Redirect URL has no 'code' parameter")?;
            Ok((code, query("state")))
        }
        Err(_) => Ok((input.to_string(), None)),
    }
}

/// Guess a MIME type from the file extension.
fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        "zip" => "application/zip",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// Run the consent flow and print the refresh token.
async fn cmd_authorize(
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    open: bool,
) -> Result<()> {
    let auth = AuthManager::new(
        AuthConfig {
            client_id,
            client_secret: Secret::new(client_secret),
            redirect_url: Some(redirect_uri),
        },
        &Endpoints::default(),
    )
    .context("Invalid OAuth2 client configuration")?;

    let (auth_url, csrf_token) = auth.authorization_url();

    println!("1. Visit this URL in your browser:");
    println!("{}", auth_url);
    if open {
        if let Err(err) = open::that(&auth_url) {
            warn!("Could not open browser: {}", err);
        }
    }
    println!("\n2. After consenting, copy the \"code\" parameter (or the whole URL) from the redirect.");
    println!("\nEnter the code here:");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read authorization code")?;

    let (code, state) = extract_code(&line)?;
    if let Some(state) = state {
        if state != csrf_token {
            anyhow::bail!("State parameter mismatch; restart the flow");
        }
    }

    let tokens = auth
        .exchange_code(&code)
        .await
        .context("Failed to exchange authorization code")?;
    let refresh_token = tokens
        .refresh_token
        .context("Provider did not return a refresh token")?;

    println!("\nHere is your refresh token:");
    println!("{}", refresh_token.expose());
    println!("\nSave it in your .env as GOOGLE_REFRESH_TOKEN");

    Ok(())
}

/// Verify credentials.
async fn cmd_check(config: Option<&Path>) -> Result<()> {
    let storage = AssetStorage::from_config(load_config(config)?);

    let files = storage.check().await.context("Credential check failed")?;
    println!("Authentication successful ({} file(s) visible).", files.len());

    Ok(())
}

/// Upload a local file.
async fn cmd_upload(
    config: Option<&Path>,
    file: &Path,
    name: Option<String>,
    mime: Option<String>,
    retries: u32,
) -> Result<()> {
    let storage = AssetStorage::from_config(load_config(config)?);

    let payload = Bytes::from(
        tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?,
    );
    let name = match name {
        Some(name) => name,
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("Cannot derive a name from the file path; pass --name")?,
    };
    let mime = mime.unwrap_or_else(|| guess_mime(file).to_string());

    info!("Uploading {} ({} bytes, {})", name, payload.len(), mime);

    let descriptor = UploadRetry::new(retries)
        .run(|| storage.upload(payload.clone(), &name, &mime))
        .await
        .context("Upload failed")?;

    println!("{}", serde_json::to_string_pretty(&descriptor)?);

    Ok(())
}

/// Delete an asset.
async fn cmd_remove(config: Option<&Path>, id: &str) -> Result<()> {
    let storage = AssetStorage::from_config(load_config(config)?);

    storage
        .remove(Some(id))
        .await
        .context("Failed to delete asset")?;

    println!("Deleted: {}", id);

    Ok(())
}

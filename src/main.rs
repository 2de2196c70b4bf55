//! Command-line launcher
//!
//! Usage: `solana-launchpad <manifest.json> [--dry-run]`
//!
//! The manifest names the token, its image, the wallet keypair and the
//! launchpad configuration. `--dry-run` runs the whole workflow against the
//! in-memory cluster and asset store instead of devnet.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use solana_launchpad::launchpad::{
    session::status_for_error, InMemoryUploads, LaunchNetwork, LaunchWorkflow, LaunchpadConfig,
    LocalWallet, SimulatedNetwork, UploadCoordinator, Wallet,
};
use solana_launchpad::types::{ImageFile, TokenLaunchRequest};
use solana_sdk::signature::Keypair;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Level};

#[derive(Debug, Deserialize)]
struct TokenFields {
    name: String,
    symbol: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_decimals")]
    decimals: u8,
    initial_supply: u64,
}

fn default_decimals() -> u8 {
    9
}

#[derive(Debug, Deserialize)]
struct LaunchManifest {
    #[serde(default)]
    config: LaunchpadConfig,
    /// Solana CLI keypair file of the launching wallet
    keypair_path: Option<PathBuf>,
    token: TokenFields,
    image_path: PathBuf,
    image_content_type: Option<String>,
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn load_image(manifest: &LaunchManifest) -> Result<ImageFile> {
    let path = &manifest.image_path;
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Image path {} has no file name", path.display()))?
        .to_string();
    let content_type = manifest
        .image_content_type
        .clone()
        .unwrap_or_else(|| content_type_for(path).to_string());
    Ok(ImageFile {
        file_name,
        content_type,
        bytes,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let mut manifest_path = None;
    let mut dry_run = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            _ if manifest_path.is_none() => manifest_path = Some(PathBuf::from(arg)),
            _ => bail!("Unexpected argument: {}", arg),
        }
    }
    let manifest_path =
        manifest_path.ok_or_else(|| anyhow!("Usage: solana-launchpad <manifest.json> [--dry-run]"))?;

    let raw = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("Failed to read manifest {}", manifest_path.display()))?;
    let manifest: LaunchManifest = serde_json::from_str(&raw).context("Failed to parse manifest")?;

    let request = TokenLaunchRequest {
        name: manifest.token.name.clone(),
        symbol: manifest.token.symbol.clone(),
        description: manifest.token.description.clone(),
        decimals: manifest.token.decimals,
        initial_supply: manifest.token.initial_supply,
        image: Some(load_image(&manifest)?),
    };

    let wallet: Arc<dyn Wallet> = match &manifest.keypair_path {
        Some(path) => Arc::new(LocalWallet::from_keypair_file(path)?),
        None if dry_run => Arc::new(LocalWallet::new(Keypair::new())),
        None => Arc::new(LocalWallet::disconnected()),
    };

    let network: Arc<dyn LaunchNetwork>;
    let uploads: UploadCoordinator;
    if dry_run {
        info!("Dry run: using the in-memory cluster and asset store");
        let store = Arc::new(InMemoryUploads::new("https://assets.dry-run.local"));
        network = Arc::new(SimulatedNetwork::new());
        uploads = UploadCoordinator::new(store.clone(), store);
    } else {
        let config = &manifest.config;
        let signer_url = config
            .upload_signer_url
            .clone()
            .ok_or_else(|| anyhow!("config.upload_signer_url is required for a live launch"))?;
        info!("Launching on {}", config.rpc_url);
        network = Arc::new(config.rpc_client()?);
        uploads = UploadCoordinator::over_http(config.http_client()?, signer_url);
    }

    let workflow = LaunchWorkflow::new(network.as_ref(), wallet.as_ref(), &uploads);
    match workflow.run(&request).await {
        Ok(report) => {
            info!(
                "Token launched and minted successfully! Mint address: {}",
                report.receipt.mint
            );
            info!("Associated token account: {}", report.receipt.associated_account);
            info!("Metadata: {}", report.metadata.public_url);
            for (step, signature) in report.receipt.signatures.iter().enumerate() {
                info!("Step {} signature: {}", step + 1, signature);
            }
            match report.balance {
                Some(balance) => info!("Balance: {} {}", balance.ui_amount_string(), request.symbol),
                None => info!("Balance: not yet available"),
            }
            Ok(())
        }
        Err(e) => {
            let status = status_for_error(&e);
            error!("{}", status);
            Err(anyhow!(status))
        }
    }
}

//! Process-wide configuration for the launchpad.
//!
//! Loaded once at startup; the RPC endpoint and upload signer are not
//! changeable while a session is running.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

/// Launchpad configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchpadConfig {
    /// RPC endpoint of the cluster tokens are launched on
    pub rpc_url: String,
    /// Commitment used for confirmations and account reads
    pub commitment: String,
    /// RPC timeout in seconds
    pub rpc_timeout_seconds: u64,
    /// Endpoint of the signing service that hands out pre-signed upload URLs
    pub upload_signer_url: Option<String>,
    /// Timeout for signer requests and object-store PUTs, in seconds
    pub upload_timeout_seconds: u64,
}

impl Default for LaunchpadConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEVNET_RPC_URL.to_string(),
            commitment: "confirmed".to_string(),
            rpc_timeout_seconds: 30,
            upload_signer_url: None,
            upload_timeout_seconds: 30,
        }
    }
}

impl LaunchpadConfig {
    /// Read a JSON configuration file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn commitment_config(&self) -> Result<CommitmentConfig> {
        CommitmentConfig::from_str(&self.commitment)
            .map_err(|e| anyhow!("Invalid commitment '{}': {}", self.commitment, e))
    }

    /// Build the nonblocking RPC client for the configured cluster.
    pub fn rpc_client(&self) -> Result<RpcClient> {
        Ok(RpcClient::new_with_timeout_and_commitment(
            self.rpc_url.clone(),
            Duration::from_secs(self.rpc_timeout_seconds),
            self.commitment_config()?,
        ))
    }

    /// Build the HTTP client used for the signer and the object store.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.upload_timeout_seconds))
            .build()
            .context("Failed to build HTTP client")
    }
}

/// Builder for [`LaunchpadConfig`] with devnet defaults.
pub struct LaunchpadBuilder {
    config: LaunchpadConfig,
}

impl LaunchpadBuilder {
    pub fn new() -> Self {
        Self {
            config: LaunchpadConfig::default(),
        }
    }

    /// Set the RPC endpoint.
    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.config.rpc_url = url.into();
        self
    }

    /// Set the commitment level ("processed", "confirmed", "finalized").
    pub fn with_commitment(mut self, commitment: impl Into<String>) -> Self {
        self.config.commitment = commitment.into();
        self
    }

    pub fn with_rpc_timeout(mut self, seconds: u64) -> Self {
        self.config.rpc_timeout_seconds = seconds;
        self
    }

    /// Set the signing service endpoint.
    pub fn with_upload_signer(mut self, url: impl Into<String>) -> Self {
        self.config.upload_signer_url = Some(url.into());
        self
    }

    pub fn with_upload_timeout(mut self, seconds: u64) -> Self {
        self.config.upload_timeout_seconds = seconds;
        self
    }

    pub fn build_config(self) -> LaunchpadConfig {
        self.config
    }
}

impl Default for LaunchpadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

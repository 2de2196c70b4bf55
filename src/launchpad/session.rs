//! Form session: the transient state behind one launchpad screen.
//!
//! Every failure ends up as a status string here; nothing propagates past
//! the session.

use crate::launchpad::balance::get_balance;
use crate::launchpad::error::LaunchError;
use crate::launchpad::network::LaunchNetwork;
use crate::launchpad::upload::UploadCoordinator;
use crate::launchpad::wallet::Wallet;
use crate::launchpad::workflow::LaunchWorkflow;
use crate::types::{ImageFile, TokenBalanceSnapshot, TokenLaunchRequest, UploadedAsset};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::{error, warn};

pub const STATUS_CONNECT_WALLET: &str = "Please connect your wallet first.";
pub const STATUS_UPLOAD_IMAGE: &str = "Please upload an image for your token.";
pub const STATUS_IMAGE_UPLOAD_FAILED: &str = "Failed to upload image. Please try again.";
pub const STATUS_LAUNCHING: &str = "Launching token...";

/// User-editable token fields.
#[derive(Debug, Clone)]
pub struct TokenForm {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub decimals: u8,
    pub initial_supply: u64,
}

impl Default for TokenForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            symbol: String::new(),
            description: String::new(),
            decimals: 9,
            initial_supply: 1_000_000_000,
        }
    }
}

pub struct LaunchSession {
    network: Arc<dyn LaunchNetwork>,
    wallet: Arc<dyn Wallet>,
    uploads: UploadCoordinator,
    pub form: TokenForm,
    image: Option<UploadedAsset>,
    is_uploading: bool,
    is_launching: bool,
    status: String,
    mint_address: Option<Pubkey>,
    balance: Option<TokenBalanceSnapshot>,
}

impl LaunchSession {
    pub fn new(
        network: Arc<dyn LaunchNetwork>,
        wallet: Arc<dyn Wallet>,
        uploads: UploadCoordinator,
    ) -> Self {
        Self {
            network,
            wallet,
            uploads,
            form: TokenForm::default(),
            image: None,
            is_uploading: false,
            is_launching: false,
            status: String::new(),
            mint_address: None,
            balance: None,
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image.as_ref().map(|asset| asset.public_url.as_str())
    }

    pub fn mint_address(&self) -> Option<Pubkey> {
        self.mint_address
    }

    pub fn balance(&self) -> Option<TokenBalanceSnapshot> {
        self.balance
    }

    pub fn is_uploading(&self) -> bool {
        self.is_uploading
    }

    pub fn is_launching(&self) -> bool {
        self.is_launching
    }

    /// Whether the launch control should be enabled.
    pub fn can_launch(&self) -> bool {
        !self.is_launching && self.wallet.public_key().is_some() && self.image.is_some()
    }

    /// Upload the picked image right away; the launch reuses its URL.
    pub async fn attach_image(&mut self, image: ImageFile) -> bool {
        self.is_uploading = true;
        let result = self.uploads.upload_image(&image).await;
        self.is_uploading = false;

        match result {
            Ok(asset) => {
                self.image = Some(asset);
                true
            }
            Err(e) => {
                error!("Error uploading image: {:#}", e);
                self.status = STATUS_IMAGE_UPLOAD_FAILED.to_string();
                false
            }
        }
    }

    /// Launch the token described by the form and return the resulting
    /// status line.
    ///
    /// Taking `&mut self` keeps a second launch from starting while one is
    /// in flight.
    pub async fn launch(&mut self) -> &str {
        if self.wallet.public_key().is_none() {
            self.status = STATUS_CONNECT_WALLET.to_string();
            return &self.status;
        }
        let Some(image) = self.image.clone() else {
            self.status = STATUS_UPLOAD_IMAGE.to_string();
            return &self.status;
        };

        self.is_launching = true;
        self.status = STATUS_LAUNCHING.to_string();

        let request = TokenLaunchRequest {
            name: self.form.name.clone(),
            symbol: self.form.symbol.clone(),
            description: self.form.description.clone(),
            decimals: self.form.decimals,
            initial_supply: self.form.initial_supply,
            image: None,
        };
        let result = LaunchWorkflow::new(self.network.as_ref(), self.wallet.as_ref(), &self.uploads)
            .run_with_uploaded_image(&request, image)
            .await;

        self.status = match result {
            Ok(report) => {
                self.mint_address = Some(report.receipt.mint);
                self.balance = report.balance;
                format!(
                    "Token launched and minted successfully! Mint address: {}",
                    report.receipt.mint
                )
            }
            Err(e) => {
                error!("Error launching token: {}", e);
                status_for_error(&e)
            }
        };
        self.is_launching = false;
        &self.status
    }

    /// Re-read the balance of the last launched mint.
    pub async fn refresh_balance(&mut self) -> Option<TokenBalanceSnapshot> {
        let (Some(mint), Some(owner)) = (self.mint_address, self.wallet.public_key()) else {
            warn!("Nothing to refresh: no launched mint or no wallet");
            return None;
        };
        self.balance = get_balance(self.network.as_ref(), &mint, &owner).await;
        self.balance
    }
}

/// Status line shown for a failed launch.
pub fn status_for_error(err: &LaunchError) -> String {
    match err {
        LaunchError::WalletNotConnected => STATUS_CONNECT_WALLET.to_string(),
        LaunchError::MissingAsset => STATUS_UPLOAD_IMAGE.to_string(),
        other => format!("Error launching token: {}", other),
    }
}

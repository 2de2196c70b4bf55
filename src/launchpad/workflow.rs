//! One user-initiated launch, start to finish: asset uploads, the
//! three-step sequence, then a balance read.

use crate::launchpad::balance::get_balance;
use crate::launchpad::error::LaunchError;
use crate::launchpad::network::LaunchNetwork;
use crate::launchpad::sequencer::LaunchSequencer;
use crate::launchpad::upload::UploadCoordinator;
use crate::launchpad::wallet::Wallet;
use crate::types::{
    LaunchReceipt, TokenBalanceSnapshot, TokenLaunchRequest, TokenMetadataDocument, UploadedAsset,
};
use tracing::{info, instrument};

/// Everything a successful launch produced.
#[derive(Debug, Clone)]
pub struct LaunchReport {
    pub receipt: LaunchReceipt,
    pub image: UploadedAsset,
    pub metadata: UploadedAsset,
    /// `None` if the balance could not be read right after minting
    pub balance: Option<TokenBalanceSnapshot>,
}

pub struct LaunchWorkflow<'a> {
    network: &'a dyn LaunchNetwork,
    wallet: &'a dyn Wallet,
    uploads: &'a UploadCoordinator,
}

impl<'a> LaunchWorkflow<'a> {
    pub fn new(
        network: &'a dyn LaunchNetwork,
        wallet: &'a dyn Wallet,
        uploads: &'a UploadCoordinator,
    ) -> Self {
        Self {
            network,
            wallet,
            uploads,
        }
    }

    /// Upload the request's image, then launch.
    ///
    /// Fails with `WalletNotConnected` or `MissingAsset` before any upload
    /// or RPC call is made.
    #[instrument(skip(self, request), fields(symbol = %request.symbol))]
    pub async fn run(&self, request: &TokenLaunchRequest) -> Result<LaunchReport, LaunchError> {
        if self.wallet.public_key().is_none() {
            return Err(LaunchError::WalletNotConnected);
        }
        let image = request.image.as_ref().ok_or(LaunchError::MissingAsset)?;

        let image = self
            .uploads
            .upload_image(image)
            .await
            .map_err(|e| LaunchError::Upload(format!("{:#}", e)))?;

        self.run_with_uploaded_image(request, image).await
    }

    /// Launch with an image that was uploaded earlier.
    pub async fn run_with_uploaded_image(
        &self,
        request: &TokenLaunchRequest,
        image: UploadedAsset,
    ) -> Result<LaunchReport, LaunchError> {
        let owner = self.wallet.public_key().ok_or(LaunchError::WalletNotConnected)?;

        let document = TokenMetadataDocument {
            name: request.name.clone(),
            symbol: request.symbol.clone(),
            description: request.description.clone(),
            image: image.public_url.clone(),
        };
        let metadata = self
            .uploads
            .upload_metadata(&document)
            .await
            .map_err(|e| LaunchError::Upload(format!("{:#}", e)))?;

        let receipt = LaunchSequencer::new(self.network, self.wallet)
            .launch(request, &metadata.public_url)
            .await?;
        info!(
            "Token launched and minted successfully! Mint address: {}",
            receipt.mint
        );

        let balance = get_balance(self.network, &receipt.mint, &owner).await;

        Ok(LaunchReport {
            receipt,
            image,
            metadata,
            balance,
        })
    }
}

//! solana-launchpad - token-2022 launch workflow for Solana
//!
//! This crate uploads token artwork and metadata through pre-signed URLs and
//! sequences the transactions that create a new fungible token and mint its
//! initial supply to the launching wallet.

pub mod types;
pub mod launchpad;

// Re-export main types for convenience
pub use types::{
    ImageFile, LaunchReceipt, TokenBalanceSnapshot, TokenLaunchRequest, TokenMetadataDocument,
    UploadedAsset,
};

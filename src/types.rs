//! Core types and data structures for the token launch workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature};

/// A local image selected for the token, not yet uploaded.
#[derive(Debug, Clone)]
pub struct ImageFile {
    /// File name used as the object-store key
    pub file_name: String,
    /// MIME type sent with the upload (e.g., "image/png")
    pub content_type: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
}

/// Everything a user fills in to launch one token.
///
/// Built fresh for every launch attempt and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct TokenLaunchRequest {
    pub name: String,
    pub symbol: String,
    pub description: String,
    /// Decimal precision of the mint
    pub decimals: u8,
    /// Supply in whole tokens; scaled by `10^decimals` when minted
    pub initial_supply: u64,
    pub image: Option<ImageFile>,
}

/// A write-once object in the external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    /// Publicly readable URL (the signed URL without its query string)
    pub public_url: String,
}

/// Off-chain JSON document the on-chain metadata URI points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadataDocument {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub image: String,
}

/// Balance of one owner for one mint, as last read from the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBalanceSnapshot {
    /// Amount in base units
    pub amount: u64,
    pub decimals: u8,
}

impl TokenBalanceSnapshot {
    /// Approximate amount in whole tokens, for display only.
    pub fn ui_amount(&self) -> f64 {
        self.amount as f64 / 10f64.powi(self.decimals as i32)
    }

    /// Exact amount in whole tokens rendered as a decimal string.
    pub fn ui_amount_string(&self) -> String {
        if self.decimals == 0 {
            return self.amount.to_string();
        }
        let digits = format!("{:0>width$}", self.amount, width = self.decimals as usize + 1);
        let (whole, fraction) = digits.split_at(digits.len() - self.decimals as usize);
        format!("{}.{}", whole, fraction)
    }
}

/// Terminal result of a successful launch.
#[derive(Debug, Clone)]
pub struct LaunchReceipt {
    /// Address of the newly created mint
    pub mint: Pubkey,
    /// The owner's associated token account holding the initial supply
    pub associated_account: Pubkey,
    /// Base units minted (`initial_supply * 10^decimals`)
    pub minted_amount: u64,
    /// Signatures of the create-mint, create-account and mint-to transactions
    pub signatures: [Signature; 3],
    pub launched_at: DateTime<Utc>,
}

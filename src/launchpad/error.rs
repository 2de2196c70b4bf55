//! Errors surfaced at the launch workflow boundary.

use crate::launchpad::sequencer::LaunchStage;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::fmt;

/// A transaction that reached the network and can no longer be undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedStep {
    pub stage: LaunchStage,
    pub signature: Signature,
}

/// Failure of one submission in the launch sequence.
#[derive(Debug, Clone)]
pub struct StepFailure {
    /// The step whose transaction was rejected
    pub stage: LaunchStage,
    /// Mint address, if the create-mint transaction had already committed
    pub mint: Option<Pubkey>,
    /// Steps that committed before the failure, in order
    pub committed: Vec<CommittedStep>,
    /// Underlying error text from the wallet or the network
    pub message: String,
}

/// Why a launch did not complete.
#[derive(Debug)]
pub enum LaunchError {
    /// No public key or signing capability is available
    WalletNotConnected,
    /// The launch requires an image and none was attached
    MissingAsset,
    /// The request cannot be turned into valid transactions
    InvalidRequest(String),
    /// The signing service or the object-store PUT failed
    Upload(String),
    /// One of the three submissions was rejected
    Transaction(StepFailure),
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::WalletNotConnected => write!(f, "wallet not connected"),
            LaunchError::MissingAsset => write!(f, "no token image uploaded"),
            LaunchError::InvalidRequest(msg) => write!(f, "invalid launch request: {}", msg),
            LaunchError::Upload(msg) => write!(f, "upload failed: {}", msg),
            LaunchError::Transaction(failure) => {
                write!(
                    f,
                    "step {} ({}) failed: {}",
                    failure.stage.step_number(),
                    failure.stage,
                    failure.message
                )?;
                if let Some(mint) = failure.mint {
                    write!(f, " (mint {} was already created on-chain)", mint)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for LaunchError {}

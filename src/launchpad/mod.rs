//! Launchpad module - token launch workflow
//!
//! Uploads the token image and metadata document, then creates a token-2022
//! mint with on-chain metadata, the owner's associated token account, and the
//! initial supply, each as its own transaction.

pub mod config;
pub mod error;
pub mod wallet;
pub mod network;
pub mod upload;
pub mod sequencer;
pub mod balance;
pub mod workflow;
pub mod session;
pub mod simulated;

// Re-export main types
pub use config::{LaunchpadBuilder, LaunchpadConfig};
pub use error::{CommittedStep, LaunchError, StepFailure};
pub use wallet::{LocalWallet, Wallet};
pub use network::LaunchNetwork;

// Re-export key components
pub use upload::{HttpObjectStore, HttpUploadSigner, ObjectStore, UploadCoordinator, UploadUrlSigner};
pub use sequencer::{associated_token_address, mint_amount, LaunchSequencer, LaunchStage};
pub use balance::get_balance;
pub use workflow::{LaunchReport, LaunchWorkflow};
pub use session::{LaunchSession, TokenForm};
pub use simulated::{InMemoryUploads, SimulatedNetwork};

//! Tests for the form session and its status line.

use async_trait::async_trait;
use solana_launchpad::launchpad::{
    session::{STATUS_CONNECT_WALLET, STATUS_IMAGE_UPLOAD_FAILED, STATUS_UPLOAD_IMAGE},
    InMemoryUploads, LaunchSession, LocalWallet, SimulatedNetwork, UploadCoordinator, Wallet,
};
use solana_launchpad::types::ImageFile;
use solana_sdk::{pubkey::Pubkey, signature::Keypair, transaction::Transaction};
use std::sync::Arc;

/// Wallet whose user declines every signature request.
struct DecliningWallet {
    pubkey: Pubkey,
}

#[async_trait]
impl Wallet for DecliningWallet {
    fn public_key(&self) -> Option<Pubkey> {
        Some(self.pubkey)
    }

    async fn sign_transaction(&self, _transaction: Transaction) -> anyhow::Result<Transaction> {
        Err(anyhow::anyhow!("User rejected the request."))
    }
}

fn image() -> ImageFile {
    ImageFile {
        file_name: "logo.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![1, 2, 3, 4],
    }
}

fn session_with(
    wallet: Arc<dyn Wallet>,
) -> (LaunchSession, Arc<SimulatedNetwork>, Arc<InMemoryUploads>) {
    let network = Arc::new(SimulatedNetwork::new());
    let store = Arc::new(InMemoryUploads::new("https://assets.example.com"));
    let uploads = UploadCoordinator::new(store.clone(), store.clone());
    let mut session = LaunchSession::new(network.clone(), wallet, uploads);
    session.form.name = "Test".to_string();
    session.form.symbol = "TST".to_string();
    session.form.description = "Session test token".to_string();
    session.form.decimals = 9;
    session.form.initial_supply = 1_000_000;
    (session, network, store)
}

#[tokio::test]
async fn test_successful_launch_status() {
    let (mut session, network, _store) = session_with(Arc::new(LocalWallet::new(Keypair::new())));

    assert!(!session.can_launch());
    assert!(session.attach_image(image()).await);
    assert_eq!(session.image_url(), Some("https://assets.example.com/logo.png"));
    assert!(session.can_launch());

    let status = session.launch().await.to_string();
    assert!(status.contains("successfully"));

    let mint = session.mint_address().expect("mint address recorded");
    assert!(status.ends_with(&mint.to_string()));
    assert_eq!(network.submission_count().await, 3);
    assert!(!session.is_launching());

    let balance = session.balance().expect("balance read after launch");
    assert_eq!(balance.amount, 1_000_000 * 1_000_000_000);

    let refreshed = session.refresh_balance().await.unwrap();
    assert_eq!(refreshed, balance);
}

#[tokio::test]
async fn test_disconnected_wallet_status() {
    let (mut session, network, store) = session_with(Arc::new(LocalWallet::disconnected()));

    let status = session.launch().await.to_string();
    assert_eq!(status, STATUS_CONNECT_WALLET);
    assert_eq!(status, "Please connect your wallet first.");
    assert_eq!(network.call_count().await, 0);
    assert_eq!(store.sign_request_count().await, 0);
}

#[tokio::test]
async fn test_missing_image_status() {
    let (mut session, network, _store) = session_with(Arc::new(LocalWallet::new(Keypair::new())));

    let status = session.launch().await.to_string();
    assert_eq!(status, STATUS_UPLOAD_IMAGE);
    assert_eq!(network.call_count().await, 0);
}

#[tokio::test]
async fn test_image_upload_failure_status() {
    let (mut session, _network, store) = session_with(Arc::new(LocalWallet::new(Keypair::new())));
    store.fail_signing("signer offline").await;

    assert!(!session.attach_image(image()).await);
    assert_eq!(session.status(), STATUS_IMAGE_UPLOAD_FAILED);
    assert!(session.image_url().is_none());
    assert!(!session.is_uploading());
}

#[tokio::test]
async fn test_account_step_failure_status() {
    let (mut session, network, _store) = session_with(Arc::new(LocalWallet::new(Keypair::new())));
    network.fail_submission(2, "account already in use").await;

    session.attach_image(image()).await;
    let status = session.launch().await.to_string();

    assert!(status.starts_with("Error launching token: "));
    assert!(status.contains("account already in use"));
    assert_eq!(network.submission_count().await, 2);
    assert!(session.mint_address().is_none());
}

#[tokio::test]
async fn test_declined_signature_status() {
    let wallet = Arc::new(DecliningWallet {
        pubkey: Pubkey::new_unique(),
    });
    let (mut session, network, _store) = session_with(wallet);

    session.attach_image(image()).await;
    let status = session.launch().await.to_string();

    assert!(status.starts_with("Error launching token: "));
    assert!(status.contains("User rejected the request."));
    // Rejected before reaching the network
    assert_eq!(network.submission_count().await, 0);
}

//! Signer capability handed explicitly to every operation that signs or pays.

use crate::launchpad::network::LaunchNetwork;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::path::Path;
use tracing::{debug, instrument};

/// A connected (or disconnected) wallet.
///
/// Connection lifecycle is owned by whoever constructs the wallet; the
/// workflow only asks for the public key and for signatures.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Public key of the connected account, `None` when disconnected.
    fn public_key(&self) -> Option<Pubkey>;

    /// Add the wallet's signature to `transaction`, keeping existing ones.
    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction>;

    async fn sign_all_transactions(&self, transactions: Vec<Transaction>) -> Result<Vec<Transaction>> {
        let mut signed = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            signed.push(self.sign_transaction(transaction).await?);
        }
        Ok(signed)
    }

    /// Sign and submit a transaction, stamping a fresh blockhash first when
    /// the caller left it unset.
    async fn send_transaction(
        &self,
        mut transaction: Transaction,
        network: &dyn LaunchNetwork,
    ) -> Result<Signature> {
        if transaction.message.recent_blockhash == Hash::default() {
            transaction.message.recent_blockhash = network.latest_blockhash().await?;
        }
        let signed = self.sign_transaction(transaction).await?;
        network.send_and_confirm_transaction(&signed).await
    }
}

/// Wallet backed by a keypair held in memory.
pub struct LocalWallet {
    keypair: Option<Keypair>,
}

impl LocalWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Some(keypair),
        }
    }

    /// Load a keypair from a Solana CLI JSON keypair file.
    pub fn from_keypair_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let keypair = read_keypair_file(path)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("Failed to read keypair file {}", path.display()))?;
        Ok(Self::new(keypair))
    }

    /// A wallet with nothing connected.
    pub fn disconnected() -> Self {
        Self { keypair: None }
    }

    pub fn is_connected(&self) -> bool {
        self.keypair.is_some()
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    fn public_key(&self) -> Option<Pubkey> {
        self.keypair.as_ref().map(|k| k.pubkey())
    }

    #[instrument(skip(self, transaction))]
    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
        let keypair = self
            .keypair
            .as_ref()
            .ok_or_else(|| anyhow!("Wallet not connected"))?;
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[keypair], blockhash)
            .map_err(|e| anyhow!("Wallet failed to sign transaction: {}", e))?;
        debug!("Wallet {} signed transaction", keypair.pubkey());
        Ok(transaction)
    }
}

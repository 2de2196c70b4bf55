//! Narrow view of the blockchain RPC endpoint used by the launch workflow.

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    account::Account, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};

/// RPC operations the launch workflow depends on.
#[async_trait]
pub trait LaunchNetwork: Send + Sync {
    /// Minimum lamports for an account of `data_len` bytes to be rent-exempt.
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64>;

    /// A recent blockhash to stamp transactions with.
    async fn latest_blockhash(&self) -> Result<Hash>;

    /// Submit a fully signed transaction and wait for confirmation.
    async fn send_and_confirm_transaction(&self, transaction: &Transaction) -> Result<Signature>;

    /// Fetch several accounts at once; absent accounts come back as `None`.
    async fn get_multiple_accounts(&self, pubkeys: &[Pubkey]) -> Result<Vec<Option<Account>>>;
}

#[async_trait]
impl LaunchNetwork for RpcClient {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        self.get_minimum_balance_for_rent_exemption(data_len)
            .await
            .context("Failed to query rent-exemption balance")
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        self.get_latest_blockhash()
            .await
            .context("Failed to fetch latest blockhash")
    }

    async fn send_and_confirm_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        // Keep the RPC error text; it is what the user ends up seeing.
        Ok(RpcClient::send_and_confirm_transaction(self, transaction).await?)
    }

    async fn get_multiple_accounts(&self, pubkeys: &[Pubkey]) -> Result<Vec<Option<Account>>> {
        RpcClient::get_multiple_accounts(self, pubkeys)
            .await
            .context("Failed to fetch accounts")
    }
}

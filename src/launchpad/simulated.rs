//! In-memory stand-ins for the cluster and the asset store.
//!
//! `SimulatedNetwork` keeps a tiny ledger of token-2022 mints and token
//! accounts and interprets exactly the instructions the launch sequence
//! emits. `InMemoryUploads` plays both the signing service and the object
//! store. Both back the binary's `--dry-run` mode and the tests.

use crate::launchpad::network::LaunchNetwork;
use crate::launchpad::sequencer::{associated_token_address, token_program_id};
use crate::launchpad::upload::{public_url, ObjectStore, UploadUrlSigner};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use rand::Rng;
use solana_sdk::{
    account::Account, hash::Hash, pubkey::Pubkey, rent::Rent, signature::Signature,
    system_program, transaction::Transaction,
};
use spl_token_2022::{
    instruction::TokenInstruction,
    solana_program::{program_option::COption, program_pack::Pack},
    state::{Account as TokenAccountState, AccountState, Mint as MintState},
};
use spl_token_metadata_interface::instruction::TokenMetadataInstruction;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A mint as tracked by the simulated ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedMint {
    pub decimals: u8,
    pub mint_authority: Pubkey,
    pub supply: u64,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone)]
struct SimulatedTokenAccount {
    mint: Pubkey,
    owner: Pubkey,
    amount: u64,
}

/// Account state; cloned per transaction so a failing instruction leaves
/// nothing behind.
#[derive(Debug, Clone, Default)]
struct Ledger {
    allocated: HashSet<Pubkey>,
    mints: HashMap<Pubkey, SimulatedMint>,
    token_accounts: HashMap<Pubkey, SimulatedTokenAccount>,
}

#[derive(Debug, Default)]
struct NetworkState {
    ledger: Ledger,
    blockhashes: HashSet<Hash>,
    calls: usize,
    submissions: usize,
    injected_failures: HashMap<usize, String>,
    offline: bool,
}

/// In-memory cluster implementing [`LaunchNetwork`].
#[derive(Debug, Default)]
pub struct SimulatedNetwork {
    state: Mutex<NetworkState>,
}

impl SimulatedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the `nth` submission (1-based) with `message`.
    pub async fn fail_submission(&self, nth: usize, message: impl Into<String>) {
        self.state.lock().await.injected_failures.insert(nth, message.into());
    }

    /// While offline every RPC call fails.
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// Number of RPC calls received, of any kind.
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls
    }

    /// Number of transactions submitted, accepted or not.
    pub async fn submission_count(&self) -> usize {
        self.state.lock().await.submissions
    }

    pub async fn mint(&self, mint: &Pubkey) -> Option<SimulatedMint> {
        self.state.lock().await.ledger.mints.get(mint).cloned()
    }

    /// Balance of a token account in base units.
    pub async fn token_balance(&self, account: &Pubkey) -> Option<u64> {
        self.state
            .lock()
            .await
            .ledger
            .token_accounts
            .get(account)
            .map(|a| a.amount)
    }

    async fn begin_call(&self) -> Result<tokio::sync::MutexGuard<'_, NetworkState>> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        if state.offline {
            bail!("connection refused: simulated network is offline");
        }
        Ok(state)
    }
}

#[async_trait]
impl LaunchNetwork for SimulatedNetwork {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        self.begin_call().await?;
        Ok(Rent::default().minimum_balance(data_len))
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        let mut state = self.begin_call().await?;
        let blockhash = Hash::new_unique();
        state.blockhashes.insert(blockhash);
        Ok(blockhash)
    }

    async fn send_and_confirm_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        let mut state = self.begin_call().await?;
        state.submissions += 1;
        let submission = state.submissions;

        if let Some(message) = state.injected_failures.remove(&submission) {
            warn!("Rejecting submission {}: {}", submission, message);
            bail!(message);
        }
        if !state.blockhashes.contains(&transaction.message.recent_blockhash) {
            bail!("Transaction simulation failed: Blockhash not found");
        }
        transaction
            .verify()
            .map_err(|e| anyhow!("Transaction signature verification failure: {}", e))?;

        let mut staged = state.ledger.clone();
        let keys = &transaction.message.account_keys;
        for (index, compiled) in transaction.message.instructions.iter().enumerate() {
            let program_id = *keys
                .get(compiled.program_id_index as usize)
                .context("program index out of range")?;
            let accounts = compiled
                .accounts
                .iter()
                .map(|&i| keys.get(i as usize).copied())
                .collect::<Option<Vec<Pubkey>>>()
                .context("account index out of range")?;
            staged
                .apply(&program_id, &accounts, &compiled.data)
                .with_context(|| format!("Error processing Instruction {}", index))?;
        }
        state.ledger = staged;

        let signature = transaction.signatures.first().copied().unwrap_or_default();
        debug!("Simulated transaction {} confirmed", signature);
        Ok(signature)
    }

    async fn get_multiple_accounts(&self, pubkeys: &[Pubkey]) -> Result<Vec<Option<Account>>> {
        let state = self.begin_call().await?;
        pubkeys
            .iter()
            .map(|key| state.ledger.packed_account(key))
            .collect()
    }
}

fn account_at(accounts: &[Pubkey], index: usize) -> Result<&Pubkey> {
    accounts
        .get(index)
        .ok_or_else(|| anyhow!("not enough account keys given to the instruction"))
}

impl Ledger {
    fn apply(&mut self, program_id: &Pubkey, accounts: &[Pubkey], data: &[u8]) -> Result<()> {
        if *program_id == system_program::id() {
            // Only create_account is emitted: [funder, new_account]
            let new_account = account_at(accounts, 1)?;
            if self.allocated.contains(new_account) {
                bail!("account {} already in use", new_account);
            }
            self.allocated.insert(*new_account);
            return Ok(());
        }

        if *program_id == spl_associated_token_account::id() {
            // [funder, associated_account, wallet, mint, system_program, token_program]
            let associated_account = account_at(accounts, 1)?;
            let wallet = account_at(accounts, 2)?;
            let mint = account_at(accounts, 3)?;
            if associated_token_address(mint, wallet) != *associated_account {
                bail!("Associated address does not match seed derivation");
            }
            if !self.mints.contains_key(mint) {
                bail!("invalid account data for instruction: mint {} not initialized", mint);
            }
            if self.token_accounts.contains_key(associated_account) {
                bail!("account {} already in use", associated_account);
            }
            self.token_accounts.insert(
                *associated_account,
                SimulatedTokenAccount {
                    mint: *mint,
                    owner: *wallet,
                    amount: 0,
                },
            );
            return Ok(());
        }

        if *program_id != token_program_id() {
            bail!("unsupported program {}", program_id);
        }

        if let Ok(TokenMetadataInstruction::Initialize(init)) = TokenMetadataInstruction::unpack(data) {
            // [metadata, update_authority, mint, mint_authority]
            let mint_authority = *account_at(accounts, 3)?;
            let mint = self
                .mints
                .get_mut(account_at(accounts, 2)?)
                .ok_or_else(|| anyhow!("invalid account data for instruction: mint not initialized"))?;
            if mint.mint_authority != mint_authority {
                bail!("incorrect mint authority for metadata");
            }
            mint.name = Some(init.name);
            mint.symbol = Some(init.symbol);
            mint.uri = Some(init.uri);
            return Ok(());
        }

        match TokenInstruction::unpack(data)? {
            TokenInstruction::MetadataPointerExtension => {
                let mint = account_at(accounts, 0)?;
                if !self.allocated.contains(mint) {
                    bail!("account {} is not allocated", mint);
                }
                Ok(())
            }
            TokenInstruction::InitializeMint {
                decimals,
                mint_authority,
                ..
            } => {
                let mint = account_at(accounts, 0)?;
                if !self.allocated.contains(mint) {
                    bail!("account {} is not allocated", mint);
                }
                if self.mints.contains_key(mint) {
                    bail!("mint {} already initialized", mint);
                }
                self.mints.insert(
                    *mint,
                    SimulatedMint {
                        decimals,
                        mint_authority,
                        supply: 0,
                        name: None,
                        symbol: None,
                        uri: None,
                    },
                );
                Ok(())
            }
            TokenInstruction::MintTo { amount } => {
                // [mint, destination, authority]
                let mint_key = account_at(accounts, 0)?;
                let destination = account_at(accounts, 1)?;
                let authority = account_at(accounts, 2)?;
                let mint = self
                    .mints
                    .get_mut(mint_key)
                    .ok_or_else(|| anyhow!("invalid account data for instruction"))?;
                if mint.mint_authority != *authority {
                    bail!("owner does not match");
                }
                let account = self
                    .token_accounts
                    .get_mut(destination)
                    .ok_or_else(|| anyhow!("invalid account data for instruction"))?;
                if account.mint != *mint_key {
                    bail!("account not associated with this mint");
                }
                mint.supply = mint
                    .supply
                    .checked_add(amount)
                    .ok_or_else(|| anyhow!("operation overflowed"))?;
                account.amount += amount;
                Ok(())
            }
            _ => bail!("unsupported token instruction"),
        }
    }

    fn packed_account(&self, key: &Pubkey) -> Result<Option<Account>> {
        let data = if let Some(mint) = self.mints.get(key) {
            let mut data = vec![0u8; MintState::LEN];
            MintState::pack(
                MintState {
                    mint_authority: COption::Some(mint.mint_authority),
                    supply: mint.supply,
                    decimals: mint.decimals,
                    is_initialized: true,
                    freeze_authority: COption::None,
                },
                &mut data,
            )?;
            data
        } else if let Some(account) = self.token_accounts.get(key) {
            let mut data = vec![0u8; TokenAccountState::LEN];
            TokenAccountState::pack(
                TokenAccountState {
                    mint: account.mint,
                    owner: account.owner,
                    amount: account.amount,
                    state: AccountState::Initialized,
                    ..Default::default()
                },
                &mut data,
            )?;
            data
        } else {
            return Ok(None);
        };

        Ok(Some(Account {
            lamports: Rent::default().minimum_balance(data.len()),
            data,
            owner: token_program_id(),
            executable: false,
            rent_epoch: 0,
        }))
    }
}

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct UploadState {
    objects: HashMap<String, StoredObject>,
    outstanding: HashSet<String>,
    sign_requests: usize,
    puts: usize,
    signing_failure: Option<String>,
    put_failure: Option<String>,
}

/// Signing service and object store in one, keeping objects in memory.
#[derive(Debug)]
pub struct InMemoryUploads {
    base_url: String,
    state: Mutex<UploadState>,
}

impl InMemoryUploads {
    /// Objects become readable under `base_url/<file name>`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Mutex::new(UploadState::default()),
        }
    }

    /// Make every signing request fail with `message`.
    pub async fn fail_signing(&self, message: impl Into<String>) {
        self.state.lock().await.signing_failure = Some(message.into());
    }

    /// Make every PUT fail with `message`.
    pub async fn fail_puts(&self, message: impl Into<String>) {
        self.state.lock().await.put_failure = Some(message.into());
    }

    pub async fn object(&self, public_url: &str) -> Option<StoredObject> {
        self.state.lock().await.objects.get(public_url).cloned()
    }

    pub async fn sign_request_count(&self) -> usize {
        self.state.lock().await.sign_requests
    }

    pub async fn put_count(&self) -> usize {
        self.state.lock().await.puts
    }
}

#[async_trait]
impl UploadUrlSigner for InMemoryUploads {
    async fn request_upload_url(&self, file_name: &str) -> Result<String> {
        let mut state = self.state.lock().await;
        state.sign_requests += 1;
        if let Some(message) = &state.signing_failure {
            bail!(message.clone());
        }
        let signature: u64 = rand::thread_rng().gen();
        let signed_url = format!(
            "{}/{}?X-Amz-Expires=60&X-Amz-Signature={:016x}",
            self.base_url, file_name, signature
        );
        state.outstanding.insert(signed_url.clone());
        Ok(signed_url)
    }
}

#[async_trait]
impl ObjectStore for InMemoryUploads {
    async fn put(&self, signed_url: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.puts += 1;
        if let Some(message) = &state.put_failure {
            bail!(message.clone());
        }
        // Each signed URL permits exactly one write.
        if !state.outstanding.remove(signed_url) {
            bail!("403 Forbidden: signature does not match or URL already used");
        }
        let url = public_url(signed_url).to_string();
        info!("Stored {} bytes at {}", bytes.len(), url);
        state.objects.insert(
            url,
            StoredObject {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::{Keypair, Signer};

    #[tokio::test]
    async fn test_unknown_blockhash_rejected() {
        let network = SimulatedNetwork::new();
        let payer = Keypair::new();
        let ix = solana_sdk::system_instruction::create_account(
            &payer.pubkey(),
            &Pubkey::new_unique(),
            1,
            0,
            &system_program::id(),
        );
        let mut tx = Transaction::new_with_payer(&[ix], Some(&payer.pubkey()));
        tx.message.recent_blockhash = Hash::new_unique();

        let err = network.send_and_confirm_transaction(&tx).await.unwrap_err();
        assert!(err.to_string().contains("Blockhash not found"));
    }

    #[tokio::test]
    async fn test_missing_signature_rejected() {
        let network = SimulatedNetwork::new();
        let payer = Keypair::new();
        let new_account = Keypair::new();
        let ix = solana_sdk::system_instruction::create_account(
            &payer.pubkey(),
            &new_account.pubkey(),
            1,
            0,
            &system_program::id(),
        );
        let mut tx = Transaction::new_with_payer(&[ix], Some(&payer.pubkey()));
        let blockhash = network.latest_blockhash().await.unwrap();
        tx.partial_sign(&[&payer], blockhash);

        let err = network.send_and_confirm_transaction(&tx).await.unwrap_err();
        assert!(err.to_string().contains("signature verification"));
    }

    #[tokio::test]
    async fn test_signed_url_is_write_once() {
        let uploads = InMemoryUploads::new("https://assets.example.com/");
        let url = uploads.request_upload_url("logo.png").await.unwrap();
        assert!(url.starts_with("https://assets.example.com/logo.png?"));

        uploads.put(&url, vec![1], "image/png").await.unwrap();
        assert!(uploads.put(&url, vec![2], "image/png").await.is_err());

        let stored = uploads.object("https://assets.example.com/logo.png").await.unwrap();
        assert_eq!(stored.bytes, vec![1]);
    }
}

//! Launch sequencer: creates a token-2022 mint with on-chain metadata, the
//! owner's associated token account, and mints the initial supply.
//!
//! The three transactions are submitted one after another and are NOT
//! atomic as a group. Once the create-mint transaction lands the mint exists
//! for good, whatever happens to the later steps. The sequence is driven as
//! a state machine so a failure reports exactly which step broke and which
//! steps had already committed.

use crate::launchpad::error::{CommittedStep, LaunchError, StepFailure};
use crate::launchpad::network::LaunchNetwork;
use crate::launchpad::wallet::Wallet;
use crate::types::{LaunchReceipt, TokenLaunchRequest};
use anyhow::{anyhow, Result};
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction,
    transaction::Transaction,
};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id,
    instruction::create_associated_token_account,
};
use spl_token_2022::{
    extension::{metadata_pointer, ExtensionType},
    instruction::{initialize_mint, mint_to},
    state::Mint,
};
use spl_token_metadata_interface::state::TokenMetadata;
use std::fmt;
use tracing::{error, info, instrument};

/// Program owning every mint and token account created here.
pub fn token_program_id() -> Pubkey {
    spl_token_2022::id()
}

/// Position in the launch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStage {
    /// Waiting on the create-mint transaction
    AwaitingMint,
    /// Waiting on the associated-account transaction
    AwaitingAccount,
    /// Waiting on the mint-to transaction
    AwaitingMintTo,
    Complete,
}

impl LaunchStage {
    /// One-based step number as shown to users.
    pub fn step_number(&self) -> u8 {
        match self {
            LaunchStage::AwaitingMint => 1,
            LaunchStage::AwaitingAccount => 2,
            LaunchStage::AwaitingMintTo => 3,
            LaunchStage::Complete => 4,
        }
    }
}

impl fmt::Display for LaunchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LaunchStage::AwaitingMint => "create mint",
            LaunchStage::AwaitingAccount => "create associated token account",
            LaunchStage::AwaitingMintTo => "mint initial supply",
            LaunchStage::Complete => "complete",
        };
        f.write_str(label)
    }
}

enum LaunchState {
    AwaitingMint { mint_keypair: Keypair },
    AwaitingAccount { mint: Pubkey },
    AwaitingMintTo { mint: Pubkey, associated_account: Pubkey },
    Complete(LaunchReceipt),
    Failed(StepFailure),
}

/// Base units to mint for `initial_supply` whole tokens, or `None` on overflow.
pub fn mint_amount(initial_supply: u64, decimals: u8) -> Option<u64> {
    10u64
        .checked_pow(decimals as u32)
        .and_then(|scale| initial_supply.checked_mul(scale))
}

/// Associated token account of `owner` for `mint`. Pure; no network access.
pub fn associated_token_address(mint: &Pubkey, owner: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program_id(owner, mint, &token_program_id())
}

/// Returns `(space, funded_len)`: the bytes allocated for the mint with its
/// metadata-pointer extension, and that plus the metadata record the token
/// program appends on initialization. Rent must cover `funded_len`.
pub fn mint_account_sizes(mint: &Pubkey, name: &str, symbol: &str, uri: &str) -> Result<(usize, usize)> {
    let space = ExtensionType::try_calculate_account_len::<Mint>(&[ExtensionType::MetadataPointer])?;
    let metadata = TokenMetadata {
        mint: *mint,
        name: name.to_string(),
        symbol: symbol.to_string(),
        uri: uri.to_string(),
        ..Default::default()
    };
    let metadata_len = metadata.tlv_size_of()?;
    Ok((space, space + metadata_len))
}

/// The four instructions of the create-mint transaction: allocate the
/// account, point its metadata at itself, initialize the mint, and write the
/// metadata record.
#[allow(clippy::too_many_arguments)]
pub fn create_mint_instructions(
    authority: &Pubkey,
    mint: &Pubkey,
    lamports: u64,
    space: usize,
    decimals: u8,
    name: &str,
    symbol: &str,
    uri: &str,
) -> Result<Vec<Instruction>> {
    let program_id = token_program_id();
    Ok(vec![
        system_instruction::create_account(authority, mint, lamports, space as u64, &program_id),
        metadata_pointer::instruction::initialize(&program_id, mint, Some(*authority), Some(*mint))?,
        initialize_mint(&program_id, mint, authority, None, decimals)?,
        spl_token_metadata_interface::instruction::initialize(
            &program_id,
            mint,
            authority,
            mint,
            authority,
            name.to_string(),
            symbol.to_string(),
            uri.to_string(),
        ),
    ])
}

pub fn create_account_instruction(owner: &Pubkey, mint: &Pubkey) -> Instruction {
    create_associated_token_account(owner, owner, mint, &token_program_id())
}

pub fn mint_to_instruction(
    mint: &Pubkey,
    associated_account: &Pubkey,
    authority: &Pubkey,
    amount: u64,
) -> Result<Instruction> {
    Ok(mint_to(&token_program_id(), mint, associated_account, authority, &[], amount)?)
}

/// Drives one launch against a network on behalf of a wallet.
pub struct LaunchSequencer<'a> {
    network: &'a dyn LaunchNetwork,
    wallet: &'a dyn Wallet,
}

impl<'a> LaunchSequencer<'a> {
    pub fn new(network: &'a dyn LaunchNetwork, wallet: &'a dyn Wallet) -> Self {
        Self { network, wallet }
    }

    /// Run the three-step launch. The first failure stops the sequence;
    /// nothing that already committed is rolled back.
    #[instrument(skip(self, request, metadata_url), fields(symbol = %request.symbol))]
    pub async fn launch(
        &self,
        request: &TokenLaunchRequest,
        metadata_url: &str,
    ) -> Result<LaunchReceipt, LaunchError> {
        let owner = self.wallet.public_key().ok_or(LaunchError::WalletNotConnected)?;
        if metadata_url.trim().is_empty() {
            return Err(LaunchError::InvalidRequest("metadata URL is empty".to_string()));
        }
        let amount = mint_amount(request.initial_supply, request.decimals).ok_or_else(|| {
            LaunchError::InvalidRequest(format!(
                "initial supply {} with {} decimals does not fit in u64",
                request.initial_supply, request.decimals
            ))
        })?;

        let mut committed: Vec<CommittedStep> = Vec::with_capacity(3);
        let mut state = LaunchState::AwaitingMint {
            mint_keypair: Keypair::new(),
        };

        loop {
            state = match state {
                LaunchState::AwaitingMint { mint_keypair } => {
                    let mint = mint_keypair.pubkey();
                    match self.create_mint(&owner, mint_keypair, request, metadata_url).await {
                        Ok(signature) => {
                            info!("Token mint created at {} ({})", mint, signature);
                            committed.push(CommittedStep { stage: LaunchStage::AwaitingMint, signature });
                            LaunchState::AwaitingAccount { mint }
                        }
                        Err(e) => fail(LaunchStage::AwaitingMint, None, &committed, e),
                    }
                }
                LaunchState::AwaitingAccount { mint } => {
                    let associated_account = associated_token_address(&mint, &owner);
                    info!("Creating associated token account {}", associated_account);
                    let transaction = Transaction::new_with_payer(
                        &[create_account_instruction(&owner, &mint)],
                        Some(&owner),
                    );
                    match self.wallet.send_transaction(transaction, self.network).await {
                        Ok(signature) => {
                            committed.push(CommittedStep { stage: LaunchStage::AwaitingAccount, signature });
                            LaunchState::AwaitingMintTo { mint, associated_account }
                        }
                        Err(e) => fail(LaunchStage::AwaitingAccount, Some(mint), &committed, e),
                    }
                }
                LaunchState::AwaitingMintTo { mint, associated_account } => {
                    match self.mint_supply(&owner, &mint, &associated_account, amount).await {
                        Ok(signature) => {
                            info!("Minted {} base units into {}", amount, associated_account);
                            committed.push(CommittedStep { stage: LaunchStage::AwaitingMintTo, signature });
                            LaunchState::Complete(LaunchReceipt {
                                mint,
                                associated_account,
                                minted_amount: amount,
                                signatures: [
                                    committed[0].signature,
                                    committed[1].signature,
                                    committed[2].signature,
                                ],
                                launched_at: chrono::Utc::now(),
                            })
                        }
                        Err(e) => fail(LaunchStage::AwaitingMintTo, Some(mint), &committed, e),
                    }
                }
                LaunchState::Complete(receipt) => return Ok(receipt),
                LaunchState::Failed(failure) => {
                    error!(
                        "Launch failed at step {} ({}): {}",
                        failure.stage.step_number(),
                        failure.stage,
                        failure.message
                    );
                    return Err(LaunchError::Transaction(failure));
                }
            };
        }
    }

    /// Step 1. The mint keypair co-signs here and is dropped on return.
    async fn create_mint(
        &self,
        owner: &Pubkey,
        mint_keypair: Keypair,
        request: &TokenLaunchRequest,
        metadata_url: &str,
    ) -> Result<Signature> {
        let mint = mint_keypair.pubkey();
        let (space, funded_len) =
            mint_account_sizes(&mint, &request.name, &request.symbol, metadata_url)?;
        let lamports = self.network.minimum_balance_for_rent_exemption(funded_len).await?;

        let instructions = create_mint_instructions(
            owner,
            &mint,
            lamports,
            space,
            request.decimals,
            &request.name,
            &request.symbol,
            metadata_url,
        )?;
        let mut transaction = Transaction::new_with_payer(&instructions, Some(owner));
        let blockhash = self.network.latest_blockhash().await?;
        transaction
            .try_partial_sign(&[&mint_keypair], blockhash)
            .map_err(|e| anyhow!("Failed to co-sign with mint keypair: {}", e))?;

        self.wallet.send_transaction(transaction, self.network).await
    }

    async fn mint_supply(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
        associated_account: &Pubkey,
        amount: u64,
    ) -> Result<Signature> {
        let instruction = mint_to_instruction(mint, associated_account, owner, amount)?;
        let transaction = Transaction::new_with_payer(&[instruction], Some(owner));
        self.wallet.send_transaction(transaction, self.network).await
    }
}

fn fail(
    stage: LaunchStage,
    mint: Option<Pubkey>,
    committed: &[CommittedStep],
    err: anyhow::Error,
) -> LaunchState {
    LaunchState::Failed(StepFailure {
        stage,
        mint,
        committed: committed.to_vec(),
        message: format!("{:#}", err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launchpad::simulated::SimulatedNetwork;
    use crate::launchpad::wallet::LocalWallet;

    fn request(decimals: u8, initial_supply: u64) -> TokenLaunchRequest {
        TokenLaunchRequest {
            name: "Test".to_string(),
            symbol: "TST".to_string(),
            description: "Sequencer test token".to_string(),
            decimals,
            initial_supply,
            image: None,
        }
    }

    #[test]
    fn test_mint_amount_scales_exactly() {
        for decimals in 0u8..=9 {
            for supply in [0u64, 1, 7, 999_999_999, 1_000_000, 1_000_000_000] {
                let expected: u64 = format!("{}{}", supply, "0".repeat(decimals as usize))
                    .parse()
                    .unwrap();
                assert_eq!(mint_amount(supply, decimals), Some(expected), "{} x 10^{}", supply, decimals);
            }
        }
    }

    #[test]
    fn test_mint_amount_overflow_is_none() {
        assert_eq!(mint_amount(u64::MAX, 1), None);
        assert_eq!(mint_amount(1, 20), None);
        assert_eq!(mint_amount(0, 20), None);
    }

    #[test]
    fn test_associated_address_is_deterministic() {
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();

        let first = associated_token_address(&mint, &owner);
        let second = associated_token_address(&mint, &owner);
        assert_eq!(first, second);
        assert_ne!(first, associated_token_address(&Pubkey::new_unique(), &owner));
        assert_ne!(first, associated_token_address(&mint, &Pubkey::new_unique()));
    }

    #[test]
    fn test_create_mint_instructions_layout() {
        let authority = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let uri = "https://assets.example.com/metadata.json";
        let (space, funded_len) = mint_account_sizes(&mint, "Test", "TST", uri).unwrap();
        assert!(funded_len > space);

        let instructions =
            create_mint_instructions(&authority, &mint, 5_000_000, space, 9, "Test", "TST", uri).unwrap();
        let programs: Vec<Pubkey> = instructions.iter().map(|ix| ix.program_id).collect();
        assert_eq!(
            programs,
            vec![
                solana_sdk::system_program::id(),
                token_program_id(),
                token_program_id(),
                token_program_id(),
            ]
        );
    }

    #[test]
    fn test_longer_metadata_needs_more_rent() {
        let mint = Pubkey::new_unique();
        let (_, short) = mint_account_sizes(&mint, "A", "A", "https://a").unwrap();
        let (_, long) = mint_account_sizes(&mint, "A much longer name", "LONG", "https://a/b/c").unwrap();
        assert!(long > short);
    }

    #[tokio::test]
    async fn test_launch_runs_three_submissions() {
        let network = SimulatedNetwork::new();
        let wallet = LocalWallet::new(Keypair::new());
        let owner = wallet.public_key().unwrap();
        let sequencer = LaunchSequencer::new(&network, &wallet);

        let receipt = sequencer
            .launch(&request(6, 250), "https://assets.example.com/metadata.json")
            .await
            .unwrap();

        assert_eq!(network.submission_count().await, 3);
        assert_eq!(receipt.minted_amount, 250_000_000);
        assert_eq!(receipt.associated_account, associated_token_address(&receipt.mint, &owner));

        let mint = network.mint(&receipt.mint).await.unwrap();
        assert_eq!(mint.decimals, 6);
        assert_eq!(mint.supply, 250_000_000);
        assert_eq!(mint.mint_authority, owner);
        assert_eq!(mint.uri.as_deref(), Some("https://assets.example.com/metadata.json"));
    }

    #[tokio::test]
    async fn test_failure_at_mint_to_reports_committed_steps() {
        let network = SimulatedNetwork::new();
        network.fail_submission(3, "insufficient funds for fee").await;
        let wallet = LocalWallet::new(Keypair::new());
        let sequencer = LaunchSequencer::new(&network, &wallet);

        let err = sequencer
            .launch(&request(9, 1), "https://assets.example.com/metadata.json")
            .await
            .unwrap_err();

        match err {
            LaunchError::Transaction(failure) => {
                assert_eq!(failure.stage, LaunchStage::AwaitingMintTo);
                assert_eq!(failure.committed.len(), 2);
                assert_eq!(failure.committed[0].stage, LaunchStage::AwaitingMint);
                assert_eq!(failure.committed[1].stage, LaunchStage::AwaitingAccount);
                assert!(failure.message.contains("insufficient funds for fee"));
                let mint = failure.mint.unwrap();
                assert_eq!(network.mint(&mint).await.unwrap().supply, 0);
            }
            other => panic!("Expected transaction failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_metadata_url_rejected_without_network() {
        let network = SimulatedNetwork::new();
        let wallet = LocalWallet::new(Keypair::new());
        let sequencer = LaunchSequencer::new(&network, &wallet);

        let err = sequencer.launch(&request(9, 1), "  ").await.unwrap_err();
        assert!(matches!(err, LaunchError::InvalidRequest(_)));
        assert_eq!(network.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_overflowing_supply_rejected_without_network() {
        let network = SimulatedNetwork::new();
        let wallet = LocalWallet::new(Keypair::new());
        let sequencer = LaunchSequencer::new(&network, &wallet);

        let err = sequencer
            .launch(&request(9, u64::MAX / 10), "https://assets.example.com/metadata.json")
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::InvalidRequest(_)));
        assert_eq!(network.call_count().await, 0);
    }
}

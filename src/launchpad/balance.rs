//! Balance query for an owner's associated token account.

use crate::launchpad::network::LaunchNetwork;
use crate::launchpad::sequencer::{associated_token_address, token_program_id};
use crate::types::TokenBalanceSnapshot;
use anyhow::{anyhow, Result};
use solana_sdk::pubkey::Pubkey;
use spl_token_2022::{
    extension::StateWithExtensions,
    state::{Account, Mint},
};
use tracing::{debug, instrument, warn};

/// Current balance of `owner` for `mint`.
///
/// Returns `None` both when the associated account does not exist yet and
/// when the query fails; neither is an error for the caller.
#[instrument(skip(network), fields(mint = %mint, owner = %owner))]
pub async fn get_balance(
    network: &dyn LaunchNetwork,
    mint: &Pubkey,
    owner: &Pubkey,
) -> Option<TokenBalanceSnapshot> {
    match fetch_balance(network, mint, owner).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Error fetching token balance: {:#}", e);
            None
        }
    }
}

async fn fetch_balance(
    network: &dyn LaunchNetwork,
    mint: &Pubkey,
    owner: &Pubkey,
) -> Result<Option<TokenBalanceSnapshot>> {
    let associated_account = associated_token_address(mint, owner);
    let mut accounts = network
        .get_multiple_accounts(&[*mint, associated_account])
        .await?
        .into_iter();

    let (Some(Some(mint_account)), Some(Some(token_account))) = (accounts.next(), accounts.next()) else {
        debug!("Mint or associated account {} not found", associated_account);
        return Ok(None);
    };

    let program_id = token_program_id();
    if mint_account.owner != program_id || token_account.owner != program_id {
        return Err(anyhow!("Accounts are not owned by the token-2022 program"));
    }

    let mint_state = StateWithExtensions::<Mint>::unpack(&mint_account.data)?;
    let token_state = StateWithExtensions::<Account>::unpack(&token_account.data)?;
    if token_state.base.mint != *mint {
        return Err(anyhow!(
            "Account {} holds mint {}, expected {}",
            associated_account,
            token_state.base.mint,
            mint
        ));
    }

    Ok(Some(TokenBalanceSnapshot {
        amount: token_state.base.amount,
        decimals: mint_state.base.decimals,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launchpad::simulated::SimulatedNetwork;

    #[tokio::test]
    async fn test_missing_account_is_none() {
        let network = SimulatedNetwork::new();
        let snapshot = get_balance(&network, &Pubkey::new_unique(), &Pubkey::new_unique()).await;
        assert!(snapshot.is_none());
        assert_eq!(network.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_query_failure_is_none() {
        let network = SimulatedNetwork::new();
        network.set_offline(true).await;
        let snapshot = get_balance(&network, &Pubkey::new_unique(), &Pubkey::new_unique()).await;
        assert!(snapshot.is_none());
    }
}

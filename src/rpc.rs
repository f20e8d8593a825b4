use std::time::Duration;

use solana_account_decoder_client_types::UiAccountEncoding;
use solana_client::{nonblocking::rpc_client::RpcClient, rpc_config::RpcAccountInfoConfig};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};

use crate::{
    app_state::AppState,
    layout::LayoutVariant,
    state::{decode_billboard, decode_pool, BillboardState, PoolState},
};

const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Accounts polled by [`update_data_system`].
#[derive(Debug, Clone, Copy)]
pub struct WatchTargets {
    pub pool: Pubkey,
    pub billboard: Pubkey,
    pub variant: LayoutVariant,
    pub poll_interval: Duration,
}

pub fn connect(rpc_url: &str) -> RpcClient {
    RpcClient::new_with_commitment(
        rpc_url.to_string(),
        CommitmentConfig {
            commitment: CommitmentLevel::Confirmed,
        },
    )
}

/// Raw account bytes, `None` when no account lives at `address`.
pub async fn fetch_account_data(connection: &RpcClient, address: &Pubkey) -> anyhow::Result<Option<Vec<u8>>> {
    let config = RpcAccountInfoConfig {
        encoding: Some(UiAccountEncoding::Base64),
        data_slice: None,
        commitment: Some(CommitmentConfig {
            commitment: CommitmentLevel::Confirmed,
        }),
        min_context_slot: None,
    };
    let response = connection.get_account_with_config(address, config).await?;
    Ok(response.value.map(|account| account.data))
}

pub async fn fetch_pool(
    connection: &RpcClient,
    address: &Pubkey,
    variant: LayoutVariant,
) -> anyhow::Result<Option<PoolState>> {
    let data = fetch_account_data(connection, address).await?;
    Ok(decode_pool(data.as_deref(), variant)?)
}

pub async fn fetch_billboard(
    connection: &RpcClient,
    address: &Pubkey,
    variant: LayoutVariant,
) -> anyhow::Result<Option<BillboardState>> {
    let data = fetch_account_data(connection, address).await?;
    Ok(decode_billboard(data.as_deref(), variant)?)
}

/// Signs `instruction` with `payer` plus any extra signers and waits for
/// confirmation.
pub async fn submit_instruction(
    connection: &RpcClient,
    instruction: Instruction,
    payer: &Keypair,
    signers: &[&Keypair],
) -> anyhow::Result<Signature> {
    let mut all_signers: Vec<&Keypair> = vec![payer];
    for signer in signers {
        if !all_signers.iter().any(|s| s.pubkey() == signer.pubkey()) {
            all_signers.push(*signer);
        }
    }

    let blockhash = connection.get_latest_blockhash().await?;
    let mut transaction = Transaction::new_with_payer(&[instruction], Some(&payer.pubkey()));
    transaction.try_sign(all_signers.as_slice(), blockhash)?;

    let signature = connection.send_and_confirm_transaction(&transaction).await?;
    tracing::info!("Confirmed transaction {signature}");
    Ok(signature)
}

/// Fetches both accounts once and replaces the snapshots.
pub async fn refresh(connection: &RpcClient, app_state: &AppState, targets: &WatchTargets) -> anyhow::Result<()> {
    let pool = fetch_pool(connection, &targets.pool, targets.variant).await?;
    if pool.is_none() {
        tracing::warn!("Pool account {} does not exist", targets.pool);
    }
    *app_state.pool.write().await = pool.map(Into::into);

    let billboard = fetch_billboard(connection, &targets.billboard, targets.variant).await?;
    if billboard.is_none() {
        tracing::warn!("Billboard account {} does not exist", targets.billboard);
    }
    *app_state.billboard.write().await = billboard.map(Into::into);

    Ok(())
}

pub async fn update_data_system(connection: RpcClient, app_state: AppState, targets: WatchTargets) {
    tracing::info!(
        "Starting update_data_system: pool {} billboard {} layout {}",
        targets.pool,
        targets.billboard,
        targets.variant
    );
    tokio::spawn(async move {
        loop {
            if let Err(e) = refresh(&connection, &app_state, &targets).await {
                tracing::error!("Failed to refresh lottery accounts: {e:#}");
                tokio::time::sleep(RETRY_BACKOFF).await;
                continue;
            }
            tracing::debug!("Lottery accounts refreshed");
            tokio::time::sleep(targets.poll_interval).await;
        }
    });
}

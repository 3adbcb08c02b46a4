pub mod queue;
pub mod reconciler;

use std::str::FromStr;

use anyhow::{anyhow, Result};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
    transaction::Transaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};

use crate::config::ChainConfig;
use crate::db::models::WalletRecord;
use crate::wallet::crypto::KeyVault;

/// Mint/burn access to the on-chain token ledger. Object-safe so the
/// reconciler can run against a fake in tests.
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    async fn mint(&self, address: &str, amount: u64) -> Result<String>;
    async fn burn(&self, wallet: &WalletRecord, amount: u64) -> Result<String>;
}

/// SPL token client for the soulbound reward mint. The server payer holds the
/// mint authority; token accounts are per-child ATAs and tokens are never
/// transferred, only minted and burned. Burning requires the owner's
/// signature, which is the one place wallet keys get decrypted.
pub struct SolanaTokenClient {
    rpc: RpcClient,
    payer: Keypair,
    token_mint: Pubkey,
    vault: KeyVault,
}

impl SolanaTokenClient {
    pub fn new(config: &ChainConfig, vault: KeyVault) -> Result<Self> {
        let payer = read_keypair_file(&config.payer_keypair_path)
            .map_err(|e| anyhow!("Failed to read payer keypair file: {}", e))?;

        let token_mint = Pubkey::from_str(&config.token_mint)
            .map_err(|e| anyhow!("Invalid token mint address: {}", e))?;

        tracing::info!("Chain RPC URL: {}", config.rpc_url);
        tracing::info!("Token mint: {}", token_mint);

        let rpc = RpcClient::new_with_commitment(
            config.rpc_url.clone(),
            CommitmentConfig::confirmed(),
        );

        Ok(Self {
            rpc,
            payer,
            token_mint,
            vault,
        })
    }

    pub fn payer_pubkey(&self) -> Pubkey {
        self.payer.pubkey()
    }

    async fn send(&self, tx: &Transaction) -> Result<String> {
        let signature = self.rpc.send_and_confirm_transaction(tx).await?;
        Ok(signature.to_string())
    }
}

#[async_trait::async_trait]
impl ChainClient for SolanaTokenClient {
    async fn mint(&self, address: &str, amount: u64) -> Result<String> {
        let owner = Pubkey::from_str(address).map_err(|e| anyhow!("Invalid address: {}", e))?;
        let token_account = get_associated_token_address(&owner, &self.token_mint);

        // idempotent ATA creation covers the first mint for a fresh wallet
        let instructions = vec![
            create_associated_token_account_idempotent(
                &self.payer.pubkey(),
                &owner,
                &self.token_mint,
                &spl_token::id(),
            ),
            spl_token::instruction::mint_to(
                &spl_token::id(),
                &self.token_mint,
                &token_account,
                &self.payer.pubkey(),
                &[],
                amount,
            )?,
        ];

        let recent_blockhash = self.rpc.get_latest_blockhash().await?;
        let tx = Transaction::new_signed_with_payer(
            &instructions,
            Some(&self.payer.pubkey()),
            &[&self.payer],
            recent_blockhash,
        );

        self.send(&tx).await
    }

    async fn burn(&self, wallet: &WalletRecord, amount: u64) -> Result<String> {
        let owner_keypair = self.vault.decrypt_keypair(wallet)?;
        let owner = owner_keypair.pubkey();
        let token_account = get_associated_token_address(&owner, &self.token_mint);

        let instruction = spl_token::instruction::burn(
            &spl_token::id(),
            &token_account,
            &self.token_mint,
            &owner,
            &[],
            amount,
        )?;

        let recent_blockhash = self.rpc.get_latest_blockhash().await?;
        let tx = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&self.payer.pubkey()),
            &[&self.payer, &owner_keypair],
            recent_blockhash,
        );

        self.send(&tx).await
    }
}

pub mod crypto;

use serde::Serialize;
use sqlx::PgPool;

use crate::db::models::{AccountKind, WalletRecord};
use crate::error::{Result, TokenError};
use self::crypto::KeyVault;

#[derive(Debug, Clone, Serialize)]
pub struct WalletInfo {
    pub address: String,
    pub label: String,
    pub owner_kind: AccountKind,
    pub owner_id: String,
}

/// Maps accounts to blockchain addresses. Creation is idempotent so profile
/// events can call it speculatively; only addresses ever leave this module.
pub struct WalletDirectory {
    db_pool: PgPool,
    vault: Option<KeyVault>,
}

impl WalletDirectory {
    pub fn new(db_pool: PgPool, vault: Option<KeyVault>) -> Self {
        Self { db_pool, vault }
    }

    pub fn custody_configured(&self) -> bool {
        self.vault.is_some()
    }

    /// Returns the account's wallet address, creating the wallet on first
    /// call. Safe under concurrent calls for the same account: the loser of
    /// the insert race reads back the winner's row.
    pub async fn ensure_wallet(&self, account_id: &str) -> Result<String> {
        if let Some(existing) = self.get(account_id).await? {
            return Ok(existing.address);
        }

        let vault = self.vault.as_ref().ok_or_else(|| {
            TokenError::Config("WALLET_ENCRYPTION_KEY is not configured".to_string())
        })?;

        let generated = vault.generate_wallet()?;

        let inserted = sqlx::query_as::<_, WalletRecord>(
            r#"
            INSERT INTO wallets (account_id, address, encrypted_key, encryption_nonce, encryption_tag)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (account_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(account_id)
        .bind(&generated.address)
        .bind(&generated.encrypted_key)
        .bind(&generated.encryption_nonce)
        .bind(&generated.encryption_tag)
        .fetch_optional(&self.db_pool)
        .await?;

        match inserted {
            Some(wallet) => {
                tracing::info!("Created wallet {} for account {}", wallet.address, account_id);
                Ok(wallet.address)
            }
            None => {
                // concurrent ensure_wallet won the insert
                let existing = self.get(account_id).await?.ok_or_else(|| {
                    TokenError::Internal(format!(
                        "wallet insert for {} conflicted but no row exists",
                        account_id
                    ))
                })?;
                Ok(existing.address)
            }
        }
    }

    pub async fn get(&self, account_id: &str) -> Result<Option<WalletRecord>> {
        let wallet =
            sqlx::query_as::<_, WalletRecord>(r#"SELECT * FROM wallets WHERE account_id = $1"#)
                .bind(account_id)
                .fetch_optional(&self.db_pool)
                .await?;

        Ok(wallet)
    }

    /// Family wallet plus each child wallet, labeled with display names.
    /// Address and label only - custody material never leaves the row.
    pub async fn list_family_wallets(&self, family_id: &str) -> Result<Vec<WalletInfo>> {
        let rows = sqlx::query_as::<_, (String, String, AccountKind, String)>(
            r#"
            SELECT w.address, a.display_name, a.kind, a.id
            FROM wallets w
            JOIN accounts a ON a.id = w.account_id
            WHERE a.id = $1 OR a.family_id = $1
            ORDER BY a.kind, a.created_at ASC
            "#,
        )
        .bind(family_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(address, label, owner_kind, owner_id)| WalletInfo {
                address,
                label,
                owner_kind,
                owner_id,
            })
            .collect())
    }

    /// Operational backfill: create wallets for every account that lacks one.
    /// Invoked explicitly through the internal API, never on the live path.
    pub async fn backfill(&self) -> Result<u64> {
        let missing: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT a.id FROM accounts a
            LEFT JOIN wallets w ON w.account_id = a.id
            WHERE w.id IS NULL
            ORDER BY a.created_at ASC
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        let mut created = 0u64;
        for account_id in missing {
            let address = self.ensure_wallet(&account_id).await?;
            tracing::info!("Backfilled wallet {} for account {}", address, account_id);
            created += 1;
        }

        Ok(created)
    }
}

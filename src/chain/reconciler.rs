use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;

use crate::chain::ChainClient;
use crate::db::models::{LedgerEntry, SyncStatus, WalletRecord};
use crate::error::Result;

// after this many failed attempts an entry stays FAILED until an operator steps in
pub const MAX_RETRIES: i32 = 5;

const SYNC_BATCH_SIZE: i64 = 50;

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct SyncReport {
    pub synced: u32,
    pub failed: u32,
}

/// Mirrors ledger entries onto the on-chain token ledger, off the request
/// path. The off-chain ledger is authoritative; a chain failure never rolls
/// anything back, it only lands in the entry's sync state for a later retry.
pub struct ChainReconciler {
    db_pool: PgPool,
    chain: Arc<dyn ChainClient>,
}

impl ChainReconciler {
    pub fn new(db_pool: PgPool, chain: Arc<dyn ChainClient>) -> Self {
        Self { db_pool, chain }
    }

    /// Push one entry on-chain. Skips (without error) entries that are gone,
    /// unsynced by configuration, already confirmed, or whose account has no
    /// wallet. Chain failures are recorded on the entry, never returned; the
    /// Err path is reserved for the store itself failing.
    pub async fn sync_entry(&self, entry_id: i64) -> Result<()> {
        let entry = sqlx::query_as::<_, LedgerEntry>(
            r#"SELECT * FROM ledger_entries WHERE id = $1"#,
        )
        .bind(entry_id)
        .fetch_optional(&self.db_pool)
        .await?;

        let Some(entry) = entry else {
            tracing::debug!("Ledger entry {} no longer exists, skipping sync", entry_id);
            return Ok(());
        };

        match entry.sync_status {
            None => return Ok(()),
            Some(SyncStatus::Confirmed) => {
                // overlapping batch invocations land here; the first confirmation wins
                tracing::debug!("Entry {} already confirmed, skipping", entry_id);
                return Ok(());
            }
            _ => {}
        }

        let wallet = sqlx::query_as::<_, WalletRecord>(
            r#"SELECT * FROM wallets WHERE account_id = $1"#,
        )
        .bind(&entry.account_id)
        .fetch_optional(&self.db_pool)
        .await?;

        let Some(wallet) = wallet else {
            tracing::warn!(
                "No wallet for account {}, skipping chain sync of entry {}",
                entry.account_id,
                entry_id
            );
            return Ok(());
        };

        sqlx::query(r#"UPDATE ledger_entries SET sync_status = 'submitted' WHERE id = $1"#)
            .bind(entry_id)
            .execute(&self.db_pool)
            .await?;

        let amount = entry.amount.unsigned_abs();
        let result = if entry.amount > 0 {
            self.chain.mint(&wallet.address, amount).await
        } else {
            self.chain.burn(&wallet, amount).await
        };

        match result {
            Ok(tx_hash) => {
                tracing::info!(
                    "Entry {} confirmed on-chain for {} ({} tokens): {}",
                    entry_id,
                    wallet.address,
                    entry.amount,
                    tx_hash
                );
                sqlx::query(
                    r#"
                    UPDATE ledger_entries
                    SET sync_status = 'confirmed',
                        tx_hash = $2,
                        sync_error = NULL,
                        synced_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(entry_id)
                .bind(tx_hash)
                .execute(&self.db_pool)
                .await?;
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("Chain sync of entry {} failed: {}", entry_id, message);
                sqlx::query(
                    r#"
                    UPDATE ledger_entries
                    SET sync_status = 'failed',
                        sync_error = $2,
                        retry_count = retry_count + 1
                    WHERE id = $1
                    "#,
                )
                .bind(entry_id)
                .bind(message)
                .execute(&self.db_pool)
                .await?;
            }
        }

        Ok(())
    }

    /// Retry backlog: pending and retryable failed entries, oldest first,
    /// bounded batch. Returns aggregate counts for the scheduler to log on -
    /// individual failures never escape this method.
    pub async fn process_pending_batch(&self) -> Result<SyncReport> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM ledger_entries
            WHERE sync_status IN ('pending', 'failed') AND retry_count < $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2
            "#,
        )
        .bind(MAX_RETRIES)
        .bind(SYNC_BATCH_SIZE)
        .fetch_all(&self.db_pool)
        .await?;

        let mut report = SyncReport::default();

        for id in ids {
            if let Err(e) = self.sync_entry(id).await {
                tracing::error!("Sync of entry {} aborted on store error: {}", id, e);
                report.failed += 1;
                continue;
            }

            let status: Option<SyncStatus> = sqlx::query_scalar(
                r#"SELECT sync_status FROM ledger_entries WHERE id = $1"#,
            )
            .bind(id)
            .fetch_one(&self.db_pool)
            .await?;

            if status == Some(SyncStatus::Confirmed) {
                report.synced += 1;
            } else {
                report.failed += 1;
            }
        }

        Ok(report)
    }
}

pub mod reward;

use chrono::Local;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::{Account, LedgerEntry, LedgerEntryType, SyncStatus};
use crate::error::{Result, TokenError};

// bounded internal retries for serialization failures before surfacing a conflict
const MAX_TX_RETRIES: u32 = 3;

const DEFAULT_HISTORY_PAGE: i64 = 50;
const MAX_HISTORY_PAGE: i64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct TokenBalance {
    pub balance: i64,
    pub daily_earned: i64,
    pub daily_cap: i64,
}

/// Append-only transaction log plus the materialized account balance. The
/// single writer for `accounts.token_balance` and the daily counters: every
/// mutation goes through one transaction that locks the account row, inserts
/// the entry with its `balance_after` snapshot, and updates the balance.
pub struct LedgerStore {
    db_pool: PgPool,
    chain_enabled: bool,
}

impl LedgerStore {
    pub fn new(db_pool: PgPool, chain_enabled: bool) -> Self {
        Self {
            db_pool,
            chain_enabled,
        }
    }

    /// Apply a positive delta. Daily-capped sources route through the reward
    /// calculator; `admin_adjustment` applies the raw amount. Returns `None`
    /// when the cap clamps the award to zero - the triggering event is still
    /// valid, it just yields no tokens and no entry.
    pub async fn apply_earn(
        &self,
        account_id: &str,
        entry_type: LedgerEntryType,
        raw_amount: i64,
        description: &str,
        reference_id: Option<&str>,
    ) -> Result<Option<LedgerEntry>> {
        if raw_amount < 0 {
            return Err(TokenError::InvalidAmount(format!(
                "earn amount must not be negative, got {}",
                raw_amount
            )));
        }
        if entry_type.is_spend() {
            return Err(TokenError::InvalidAmount(
                "spend entry types cannot be applied as earns".to_string(),
            ));
        }

        let mut attempt = 0;
        loop {
            match self
                .try_apply_earn(account_id, entry_type, raw_amount, description, reference_id)
                .await
            {
                Err(TokenError::Database(msg)) if is_serialization_failure(&msg) => {
                    attempt += 1;
                    if attempt >= MAX_TX_RETRIES {
                        return Err(TokenError::Conflict(msg));
                    }
                    tracing::debug!(
                        "Earn apply for {} hit a write conflict (attempt {}), retrying",
                        account_id,
                        attempt
                    );
                }
                other => return other,
            }
        }
    }

    async fn try_apply_earn(
        &self,
        account_id: &str,
        entry_type: LedgerEntryType,
        raw_amount: i64,
        description: &str,
        reference_id: Option<&str>,
    ) -> Result<Option<LedgerEntry>> {
        let mut tx = self.db_pool.begin().await?;

        let account = lock_account(&mut tx, account_id).await?;

        let today = Local::now().date_naive();
        let rolled_over = reward::is_new_day(account.last_token_reset_date, today);
        let daily_earned = if rolled_over {
            0
        } else {
            account.daily_tokens_earned
        };

        let award = if entry_type.is_capped_earn() {
            reward::compute_award(raw_amount, daily_earned, reward::TOKEN_DAILY_CAP)
        } else {
            raw_amount
        };

        if award == 0 {
            // nothing to record, but a stale reset date still advances so the
            // counter reads correctly tomorrow
            if rolled_over {
                sqlx::query(
                    r#"
                    UPDATE accounts
                    SET daily_tokens_earned = 0, last_token_reset_date = $2, updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(account_id)
                .bind(today)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            return Ok(None);
        }

        let new_balance = account.token_balance + award;
        let entry = insert_entry(
            &mut tx,
            account_id,
            entry_type,
            award,
            new_balance,
            description,
            reference_id,
            self.chain_enabled,
        )
        .await?;

        let new_daily = if entry_type.is_capped_earn() {
            daily_earned + award
        } else {
            daily_earned
        };

        sqlx::query(
            r#"
            UPDATE accounts
            SET token_balance = $2,
                daily_tokens_earned = $3,
                last_token_reset_date = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(new_balance)
        .bind(new_daily)
        .bind(today)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(entry))
    }

    /// Apply a negative delta. Fails with InsufficientBalance before touching
    /// anything if the account cannot cover the amount.
    pub async fn apply_spend(
        &self,
        account_id: &str,
        amount: i64,
        entry_type: LedgerEntryType,
        description: &str,
        reference_id: Option<&str>,
    ) -> Result<LedgerEntry> {
        if amount <= 0 {
            return Err(TokenError::InvalidAmount(format!(
                "spend amount must be positive, got {}",
                amount
            )));
        }
        if !entry_type.is_spend() {
            return Err(TokenError::InvalidAmount(
                "earn entry types cannot be applied as spends".to_string(),
            ));
        }

        let mut attempt = 0;
        loop {
            match self
                .try_apply_spend(account_id, amount, entry_type, description, reference_id)
                .await
            {
                Err(TokenError::Database(msg)) if is_serialization_failure(&msg) => {
                    attempt += 1;
                    if attempt >= MAX_TX_RETRIES {
                        return Err(TokenError::Conflict(msg));
                    }
                    tracing::debug!(
                        "Spend apply for {} hit a write conflict (attempt {}), retrying",
                        account_id,
                        attempt
                    );
                }
                other => return other,
            }
        }
    }

    async fn try_apply_spend(
        &self,
        account_id: &str,
        amount: i64,
        entry_type: LedgerEntryType,
        description: &str,
        reference_id: Option<&str>,
    ) -> Result<LedgerEntry> {
        let mut tx = self.db_pool.begin().await?;

        let account = lock_account(&mut tx, account_id).await?;
        let entry = spend_within(
            &mut tx,
            &account,
            amount,
            entry_type,
            description,
            reference_id,
            self.chain_enabled,
        )
        .await?;

        tx.commit().await?;
        Ok(entry)
    }

    pub async fn balance(&self, account_id: &str) -> Result<TokenBalance> {
        let account = sqlx::query_as::<_, Account>(r#"SELECT * FROM accounts WHERE id = $1"#)
            .bind(account_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| TokenError::AccountNotFound(account_id.to_string()))?;

        // read path computes the effective counter without mutating; the reset
        // date only advances inside an earn transaction
        let today = Local::now().date_naive();
        let daily_earned = if reward::is_new_day(account.last_token_reset_date, today) {
            0
        } else {
            account.daily_tokens_earned
        };

        Ok(TokenBalance {
            balance: account.token_balance,
            daily_earned,
            daily_cap: reward::TOKEN_DAILY_CAP,
        })
    }

    pub async fn history(&self, account_id: &str, limit: Option<i64>) -> Result<Vec<LedgerEntry>> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_PAGE)
            .clamp(1, MAX_HISTORY_PAGE);

        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT * FROM ledger_entries
            WHERE account_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(entries)
    }

    pub async fn recent_for_family(&self, family_id: &str, limit: i64) -> Result<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT le.* FROM ledger_entries le
            JOIN accounts a ON a.id = le.account_id
            WHERE a.family_id = $1
            ORDER BY le.created_at DESC, le.id DESC
            LIMIT $2
            "#,
        )
        .bind(family_id)
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(entries)
    }
}

pub(crate) async fn lock_account(
    tx: &mut Transaction<'_, Postgres>,
    account_id: &str,
) -> Result<Account> {
    sqlx::query_as::<_, Account>(r#"SELECT * FROM accounts WHERE id = $1 FOR UPDATE"#)
        .bind(account_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| TokenError::AccountNotFound(account_id.to_string()))
}

/// Deduct `amount` from an already-locked account: inserts the negative entry
/// and updates the balance within the caller's transaction. Used by both
/// `apply_spend` and the spend mediator's approval path, which needs the
/// request status flip in the same transaction.
pub(crate) async fn spend_within(
    tx: &mut Transaction<'_, Postgres>,
    account: &Account,
    amount: i64,
    entry_type: LedgerEntryType,
    description: &str,
    reference_id: Option<&str>,
    chain_enabled: bool,
) -> Result<LedgerEntry> {
    if amount > account.token_balance {
        return Err(TokenError::InsufficientBalance(
            account.token_balance,
            amount,
        ));
    }

    let new_balance = account.token_balance - amount;
    let entry = insert_entry(
        tx,
        &account.id,
        entry_type,
        -amount,
        new_balance,
        description,
        reference_id,
        chain_enabled,
    )
    .await?;

    sqlx::query(
        r#"UPDATE accounts SET token_balance = $2, updated_at = NOW() WHERE id = $1"#,
    )
    .bind(&account.id)
    .bind(new_balance)
    .execute(&mut **tx)
    .await?;

    Ok(entry)
}

#[allow(clippy::too_many_arguments)]
async fn insert_entry(
    tx: &mut Transaction<'_, Postgres>,
    account_id: &str,
    entry_type: LedgerEntryType,
    amount: i64,
    balance_after: i64,
    description: &str,
    reference_id: Option<&str>,
    chain_enabled: bool,
) -> Result<LedgerEntry> {
    let sync_status = if chain_enabled {
        Some(SyncStatus::Pending)
    } else {
        None
    };

    let entry = sqlx::query_as::<_, LedgerEntry>(
        r#"
        INSERT INTO ledger_entries (
            account_id, entry_type, amount, balance_after,
            description, reference_id, sync_status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(account_id)
    .bind(entry_type)
    .bind(amount)
    .bind(balance_after)
    .bind(description)
    .bind(reference_id)
    .bind(sync_status)
    .fetch_one(&mut **tx)
    .await?;

    Ok(entry)
}

// Postgres serialization_failure / deadlock_detected; sqlx surfaces the SQLSTATE
// in the error message, which is all we have after stringly conversion
fn is_serialization_failure(message: &str) -> bool {
    message.contains("40001") || message.contains("40P01") || message.contains("deadlock")
}

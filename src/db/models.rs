use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "account_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Family,
    Child,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub kind: AccountKind,
    pub family_id: Option<String>,
    pub display_name: String,
    // balances stored as i64 to match Postgres BIGINT; mutated only by the ledger store
    pub token_balance: i64,
    pub daily_tokens_earned: i64,
    pub last_token_reset_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "ledger_entry_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryType {
    EarnLessonComplete,
    EarnChallengeComplete,
    EarnStreakBonus,
    SpendUnlockLesson,
    SpendUnlockContent,
    SpendJoinChallenge,
    AdminAdjustment,
}

impl LedgerEntryType {
    // earn sources subject to the daily cap; admin adjustments bypass it
    pub fn is_capped_earn(self) -> bool {
        matches!(
            self,
            LedgerEntryType::EarnLessonComplete
                | LedgerEntryType::EarnChallengeComplete
                | LedgerEntryType::EarnStreakBonus
        )
    }

    pub fn is_spend(self) -> bool {
        matches!(
            self,
            LedgerEntryType::SpendUnlockLesson
                | LedgerEntryType::SpendUnlockContent
                | LedgerEntryType::SpendJoinChallenge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "sync_status", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub id: i64,
    pub account_id: String,
    pub entry_type: LedgerEntryType,
    pub amount: i64,
    pub balance_after: i64,
    pub description: String,
    pub reference_id: Option<String>,
    // None means chain mirroring was disabled when the entry was created
    pub sync_status: Option<SyncStatus>,
    pub tx_hash: Option<String>,
    pub sync_error: Option<String>,
    pub retry_count: i32,
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "spend_request_status", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpendRequestStatus {
    Pending,
    Approved,
    Denied,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SpendRequest {
    pub id: i64,
    pub account_id: String,
    pub amount: i64,
    pub reason: String,
    pub reference_id: Option<String>,
    pub status: SpendRequestStatus,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// key material stays server-side: the serialized form carries the address only
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WalletRecord {
    pub id: i64,
    pub account_id: String,
    pub address: String,
    pub encrypted_key: String,
    pub encryption_nonce: String,
    pub encryption_tag: String,
    pub created_at: DateTime<Utc>,
}

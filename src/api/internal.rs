//! Operational endpoints for collaborator services: the profile service
//! provisions accounts, lesson/challenge services report completion earns,
//! and the scheduler triggers the chain sync batch. All guarded by the
//! shared internal secret.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::auth::InternalAuth;
use crate::chain::reconciler::SyncReport;
use crate::db::models::{Account, AccountKind, LedgerEntry, LedgerEntryType};
use crate::error::Result;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub id: String,
    pub kind: AccountKind,
    pub family_id: Option<String>,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateAccountResponse {
    pub account: Account,
    pub wallet_address: Option<String>,
}

pub async fn create_account(
    State(state): State<Arc<AppState>>,
    _auth: InternalAuth,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Json<CreateAccountResponse>> {
    let account = state
        .accounts
        .create(
            &body.id,
            body.kind,
            body.family_id.as_deref(),
            &body.display_name,
        )
        .await?;

    // speculative wallet creation: idempotent, and a failure here must not
    // fail profile provisioning - the backfill endpoint covers the gap
    let wallet_address = if state.wallets.custody_configured() {
        match state.wallets.ensure_wallet(&account.id).await {
            Ok(address) => Some(address),
            Err(e) => {
                tracing::warn!("Wallet creation for account {} failed: {}", account.id, e);
                None
            }
        }
    } else {
        None
    };

    Ok(Json(CreateAccountResponse {
        account,
        wallet_address,
    }))
}

pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    _auth: InternalAuth,
    Path(account_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state.accounts.delete(&account_id).await?;

    Ok(Json(serde_json::json!({ "deleted": account_id })))
}

#[derive(Debug, Deserialize)]
pub struct EarnRequest {
    pub account_id: String,
    pub entry_type: LedgerEntryType,
    pub amount: i64,
    pub description: String,
    pub reference_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EarnResponse {
    pub tokens_awarded: i64,
    pub new_balance: i64,
    pub entry: Option<LedgerEntry>,
}

/// Earn hand-off from the lesson/challenge services. The caller guarantees
/// at-most-once completion per (account, lesson); this endpoint only applies
/// the delta and reports what the daily cap allowed.
pub async fn earn(
    State(state): State<Arc<AppState>>,
    _auth: InternalAuth,
    Json(body): Json<EarnRequest>,
) -> Result<Json<EarnResponse>> {
    let entry = state
        .ledger
        .apply_earn(
            &body.account_id,
            body.entry_type,
            body.amount,
            &body.description,
            body.reference_id.as_deref(),
        )
        .await?;

    let (tokens_awarded, new_balance) = match &entry {
        Some(entry) => {
            state.enqueue_sync(entry);
            (entry.amount, entry.balance_after)
        }
        None => {
            // capped out: no entry written, report the unchanged balance
            let balance = state.ledger.balance(&body.account_id).await?;
            (0, balance.balance)
        }
    };

    Ok(Json(EarnResponse {
        tokens_awarded,
        new_balance,
        entry,
    }))
}

pub async fn blockchain_sync(
    State(state): State<Arc<AppState>>,
    _auth: InternalAuth,
) -> Result<Json<SyncReport>> {
    let Some(reconciler) = &state.reconciler else {
        tracing::info!("Blockchain sync triggered but chain mirroring is not configured");
        return Ok(Json(SyncReport::default()));
    };

    let report = reconciler.process_pending_batch().await?;
    tracing::info!(
        "Blockchain sync batch finished: {} synced, {} failed",
        report.synced,
        report.failed
    );

    Ok(Json(report))
}

#[derive(Debug, Serialize)]
pub struct BackfillResponse {
    pub created: u64,
}

pub async fn backfill_wallets(
    State(state): State<Arc<AppState>>,
    _auth: InternalAuth,
) -> Result<Json<BackfillResponse>> {
    let created = state.wallets.backfill().await?;
    tracing::info!("Wallet backfill created {} wallets", created);

    Ok(Json(BackfillResponse { created }))
}

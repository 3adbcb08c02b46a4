use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::auth::FamilyId;
use crate::db::models::{AccountKind, LedgerEntry, SpendRequest};
use crate::error::Result;
use crate::spend::{ReviewOutcome, SpendDecision};
use crate::wallet::WalletInfo;
use crate::AppState;

const SUMMARY_RECENT_LIMIT: i64 = 20;

#[derive(Debug, Serialize)]
pub struct ChildSummary {
    pub id: String,
    pub display_name: String,
    pub token_balance: i64,
    pub daily_tokens_earned: i64,
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FamilyTokenSummary {
    pub children: Vec<ChildSummary>,
    pub pending_requests: Vec<SpendRequest>,
    pub recent_transactions: Vec<LedgerEntry>,
}

pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    FamilyId(family_id): FamilyId,
) -> Result<Json<FamilyTokenSummary>> {
    let children = state.accounts.children_of(&family_id).await?;
    let wallets = state.wallets.list_family_wallets(&family_id).await?;
    let pending_requests = state.spend.pending_for_family(&family_id).await?;
    let recent_transactions = state
        .ledger
        .recent_for_family(&family_id, SUMMARY_RECENT_LIMIT)
        .await?;

    let addresses: HashMap<String, String> = wallets
        .into_iter()
        .map(|w| (w.owner_id, w.address))
        .collect();

    let children = children
        .into_iter()
        .map(|c| ChildSummary {
            wallet_address: addresses.get(&c.id).cloned(),
            id: c.id,
            display_name: c.display_name,
            token_balance: c.token_balance,
            daily_tokens_earned: c.daily_tokens_earned,
        })
        .collect();

    Ok(Json(FamilyTokenSummary {
        children,
        pending_requests,
        recent_transactions,
    }))
}

#[derive(Debug, Serialize)]
pub struct PendingRequestsResponse {
    pub requests: Vec<SpendRequest>,
}

pub async fn pending_requests(
    State(state): State<Arc<AppState>>,
    FamilyId(family_id): FamilyId,
) -> Result<Json<PendingRequestsResponse>> {
    let requests = state.spend.pending_for_family(&family_id).await?;

    Ok(Json(PendingRequestsResponse { requests }))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequestBody {
    pub status: SpendDecision,
}

pub async fn review_request(
    State(state): State<Arc<AppState>>,
    FamilyId(family_id): FamilyId,
    Path(request_id): Path<i64>,
    Json(body): Json<ReviewRequestBody>,
) -> Result<Json<ReviewOutcome>> {
    let outcome = state
        .spend
        .review(request_id, &family_id, body.status)
        .await?;

    // the approval's ledger entry goes to the chain worker; the parent's
    // response never waits on the chain
    if let Some(entry) = &outcome.entry {
        state.enqueue_sync(entry);
    }

    Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
pub struct WalletListResponse {
    pub enabled: bool,
    pub family_wallet: Option<WalletInfo>,
    pub child_wallets: Vec<WalletInfo>,
    pub token_mint: Option<String>,
    pub explorer_base_url: Option<String>,
}

pub async fn list_wallets(
    State(state): State<Arc<AppState>>,
    FamilyId(family_id): FamilyId,
) -> Result<Json<WalletListResponse>> {
    let wallets = state.wallets.list_family_wallets(&family_id).await?;

    let (family, children): (Vec<WalletInfo>, Vec<WalletInfo>) = wallets
        .into_iter()
        .partition(|w| w.owner_kind == AccountKind::Family);

    let chain = state.chain_config.as_ref();

    Ok(Json(WalletListResponse {
        enabled: chain.is_some(),
        family_wallet: family.into_iter().next(),
        child_wallets: children,
        token_mint: chain.map(|c| c.token_mint.clone()),
        explorer_base_url: chain.map(|c| c.explorer_base_url.clone()),
    }))
}

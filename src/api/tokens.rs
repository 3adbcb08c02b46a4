use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::auth::ChildId;
use crate::db::models::{LedgerEntry, SpendRequest};
use crate::error::Result;
use crate::ledger::TokenBalance;
use crate::AppState;

pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    ChildId(child_id): ChildId,
) -> Result<Json<TokenBalance>> {
    let balance = state.ledger.balance(&child_id).await?;

    Ok(Json(balance))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub transactions: Vec<LedgerEntry>,
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    ChildId(child_id): ChildId,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>> {
    let transactions = state.ledger.history(&child_id, query.limit).await?;

    Ok(Json(HistoryResponse { transactions }))
}

#[derive(Debug, Serialize)]
pub struct SpendRequestsResponse {
    pub requests: Vec<SpendRequest>,
}

pub async fn list_spend_requests(
    State(state): State<Arc<AppState>>,
    ChildId(child_id): ChildId,
) -> Result<Json<SpendRequestsResponse>> {
    let requests = state.spend.requests_for_child(&child_id).await?;

    Ok(Json(SpendRequestsResponse { requests }))
}

#[derive(Debug, Deserialize)]
pub struct CreateSpendRequestBody {
    pub amount: i64,
    pub reason: String,
    pub reference_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSpendRequestResponse {
    pub request: SpendRequest,
}

pub async fn create_spend_request(
    State(state): State<Arc<AppState>>,
    ChildId(child_id): ChildId,
    Json(body): Json<CreateSpendRequestBody>,
) -> Result<Json<CreateSpendRequestResponse>> {
    let request = state
        .spend
        .create(
            &child_id,
            body.amount,
            &body.reason,
            body.reference_id.as_deref(),
        )
        .await?;

    Ok(Json(CreateSpendRequestResponse { request }))
}

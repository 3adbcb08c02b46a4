use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::ledger::reward::TOKEN_DAILY_CAP;
use crate::AppState;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "FamilyVine Token Ledger",
        "version": "0.1.0"
    }))
}

#[derive(Debug, Serialize)]
pub struct PublicConfigResponse {
    pub chain_enabled: bool,
    pub token_mint: Option<String>,
    pub explorer_base_url: Option<String>,
    pub daily_cap: i64,
}

// mint address and explorer URL are public on-chain facts; exposing them here
// saves the frontend a separate env var
pub async fn public_config(State(state): State<Arc<AppState>>) -> Json<PublicConfigResponse> {
    let chain = state.chain_config.as_ref();

    Json(PublicConfigResponse {
        chain_enabled: chain.is_some(),
        token_mint: chain.map(|c| c.token_mint.clone()),
        explorer_base_url: chain.map(|c| c.explorer_base_url.clone()),
        daily_cap: TOKEN_DAILY_CAP,
    })
}

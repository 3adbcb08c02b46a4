pub mod auth;
pub mod family;
pub mod health;
pub mod internal;
pub mod tokens;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/config/public", get(health::public_config))
        // child-facing (x-child-id from the auth gateway)
        .route("/tokens/balance", get(tokens::get_balance))
        .route("/tokens/history", get(tokens::get_history))
        .route("/tokens/requests", get(tokens::list_spend_requests))
        .route("/tokens/spend", post(tokens::create_spend_request))
        // parent-facing (x-family-id from the auth gateway)
        .route("/family/tokens/summary", get(family::get_summary))
        .route("/family/tokens/requests", get(family::pending_requests))
        .route(
            "/family/tokens/requests/:request_id/review",
            post(family::review_request),
        )
        .route("/family/wallets", get(family::list_wallets))
        // collaborator contracts, guarded by the shared internal secret
        .route("/internal/accounts", post(internal::create_account))
        .route("/internal/accounts/:account_id", delete(internal::delete_account))
        .route("/internal/earn", post(internal::earn))
        .route("/internal/blockchain-sync", post(internal::blockchain_sync))
        .route("/internal/wallets/backfill", post(internal::backfill_wallets))
        .with_state(state)
}

pub mod api;
pub mod chain;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod spend;
pub mod wallet;

use std::sync::Arc;

use chain::queue::SyncQueue;
use chain::reconciler::ChainReconciler;
use config::ChainConfig;
use db::accounts::AccountService;
use db::models::{LedgerEntry, SyncStatus};
use ledger::LedgerStore;
use spend::SpendMediator;
use wallet::WalletDirectory;

pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub accounts: AccountService,
    pub ledger: LedgerStore,
    pub spend: SpendMediator,
    pub wallets: WalletDirectory,
    pub reconciler: Option<Arc<ChainReconciler>>,
    pub sync_queue: Option<SyncQueue>,
    pub chain_config: Option<ChainConfig>,
    pub internal_api_secret: String,
}

impl AppState {
    /// Hand a freshly written entry to the sync worker. Enqueue only, never
    /// await - the response to the user must not ride on chain latency.
    pub fn enqueue_sync(&self, entry: &LedgerEntry) {
        if entry.sync_status != Some(SyncStatus::Pending) {
            return;
        }
        if let Some(queue) = &self.sync_queue {
            queue.enqueue(entry.id);
        }
    }
}

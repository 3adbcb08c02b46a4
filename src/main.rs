use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use familyvine_backend::chain::queue::{self, SyncQueue};
use familyvine_backend::chain::reconciler::ChainReconciler;
use familyvine_backend::chain::SolanaTokenClient;
use familyvine_backend::config::Config;
use familyvine_backend::db::accounts::AccountService;
use familyvine_backend::ledger::LedgerStore;
use familyvine_backend::spend::SpendMediator;
use familyvine_backend::wallet::crypto::KeyVault;
use familyvine_backend::wallet::WalletDirectory;
use familyvine_backend::{api, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,familyvine_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting FamilyVine token ledger service");

    let config = Config::from_env().context("error with configuration")?;
    tracing::info!(
        "Configuration loaded (chain mirroring {})",
        if config.chain_enabled() { "enabled" } else { "disabled" }
    );

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database connected and migrated");

    let vault = config.wallet_encryption_key.map(KeyVault::new);

    // the same config object feeds every component; nothing reads the
    // environment after this point
    let accounts = AccountService::new(db_pool.clone());
    let ledger = LedgerStore::new(db_pool.clone(), config.chain_enabled());
    let spend = SpendMediator::new(db_pool.clone(), config.chain_enabled());
    let wallets = WalletDirectory::new(db_pool.clone(), vault.clone());

    let (reconciler, sync_queue) = match (&config.chain, vault) {
        (Some(chain_config), Some(vault)) => {
            let client = SolanaTokenClient::new(chain_config, vault)
                .context("Failed to initialize chain client")?;
            tracing::info!("Chain client initialized, payer {}", client.payer_pubkey());

            let reconciler = Arc::new(ChainReconciler::new(db_pool.clone(), Arc::new(client)));

            let (sync_queue, rx) = SyncQueue::new();
            queue::spawn_worker(rx, reconciler.clone());

            (Some(reconciler), Some(sync_queue))
        }
        (Some(_), None) => {
            anyhow::bail!("chain mirroring requires WALLET_ENCRYPTION_KEY for burn signing");
        }
        (None, _) => {
            tracing::info!("Chain mirroring disabled, ledger entries stay off-chain");
            (None, None)
        }
    };

    let app_state = Arc::new(AppState {
        db_pool,
        accounts,
        ledger,
        spend,
        wallets,
        reconciler,
        sync_queue,
        chain_config: config.chain.clone(),
        internal_api_secret: config.internal_api_secret.clone(),
    });

    let app = api::router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // in case the configured port is taken, try a few more before giving up
    let mut port = config.port;
    let mut listener = None;

    for _ in 0..10u16 {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(l) => {
                listener = Some((addr, l));
                break;
            }
            Err(e) => {
                tracing::warn!("Failed to bind to {}: {} (trying next port)", addr, e);
                port = port.saturating_add(1);
            }
        }
    }

    let (addr, listener) = listener.ok_or_else(|| {
        anyhow::anyhow!(
            "Failed to bind to any port in range {}..{}",
            config.port,
            config.port.saturating_add(9)
        )
    })?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

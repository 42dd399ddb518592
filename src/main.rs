//! ledger-console server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use ledger_console::api;
use ledger_console::app_state::AppState;
use ledger_console::config::ConsoleConfig;
use ledger_console::domain::EventBus;
use ledger_console::notify::{LogEmailSender, NotificationDispatcher};
use ledger_console::service::{ApprovalService, LedgerService, load_snapshot};
use ledger_console::store::RecordStore;
use ledger_console::store::memory::MemoryStore;
use ledger_console::store::postgres::PgRecordStore;
use ledger_console::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ConsoleConfig::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    tracing::info!(addr = %config.listen_addr, "starting ledger-console");

    // Pick the record store
    let store: Arc<dyn RecordStore> = if config.persistence_enabled {
        let pg = PgRecordStore::connect(&config).await?;
        tracing::info!("connected to PostgreSQL record store");
        Arc::new(pg)
    } else {
        tracing::warn!("persistence disabled; using in-memory record store");
        Arc::new(MemoryStore::new())
    };

    // Warm-up read: a slow or broken store must not hang startup.
    let snapshot = load_snapshot(store.as_ref(), config.init_timeout()).await;
    tracing::info!(
        investments = snapshot.investments.len(),
        deposits = snapshot.deposits.len(),
        withdrawals = snapshot.withdrawals.len(),
        loans = snapshot.loans.len(),
        kyc = snapshot.kyc.len(),
        users = snapshot.users.len(),
        "initial snapshot loaded"
    );

    // Build domain + service layer
    let event_bus = EventBus::new(config.event_bus_capacity);
    let dispatcher = NotificationDispatcher::new(
        Arc::new(LogEmailSender),
        Arc::clone(&store),
        event_bus.clone(),
    );
    let ledger = LedgerService::new(
        Arc::clone(&store),
        event_bus.clone(),
        dispatcher.clone(),
        config.fetch_timeout(),
    );
    let approvals = ApprovalService::new(
        Arc::clone(&store),
        ledger.clone(),
        dispatcher,
        event_bus.clone(),
        config.fetch_timeout(),
    );

    // Build application state
    let listen_addr = config.listen_addr;
    let app_state = AppState {
        approvals,
        ledger,
        store,
        event_bus,
        config: Arc::new(config),
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

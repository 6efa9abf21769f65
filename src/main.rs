//! captable - Gateway entry point
//!
//! Usage:
//!   captable [--env dev] [--port 8080]

use std::sync::Arc;

use anyhow::Context;

use captable::config::{AppConfig, StoreBackend};
use captable::db::{Database, init_schema};
use captable::gateway::{self, state::AppState};
use captable::ledger::{Ledger, LedgerApi};
use captable::logging;
use captable::store::{MemoryLedgerStore, PgLedgerStore};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

async fn build_ledger(config: &AppConfig) -> anyhow::Result<Arc<dyn LedgerApi>> {
    match config.store.backend {
        StoreBackend::Postgres => {
            let db = Database::connect(&config.store)
                .await
                .context("Failed to connect to PostgreSQL")?;
            init_schema(db.pool()).await?;
            let store = PgLedgerStore::new(db.into_pool(), config.store.lock_timeout());
            Ok(Arc::new(Ledger::new(store)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory ledger store: data is lost on restart");
            let store = MemoryLedgerStore::with_lock_timeout(config.store.lock_timeout());
            Ok(Arc::new(Ledger::new(store)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        config.gateway.port = port;
    }

    let _guard = logging::init_logging(&config);
    tracing::info!(
        env = %env,
        backend = ?config.store.backend,
        version = env!("GIT_HASH"),
        "Starting cap table ledger"
    );

    let ledger = build_ledger(&config).await?;
    let state = Arc::new(AppState::new(ledger));

    gateway::run_server(&config.gateway, state).await
}

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::context::Context;
use common::{logging, signal};
use sqlx::postgres::PgConnectOptions;
use sqlx::ConnectOptions;
use tokio::select;
use tokio::signal::unix::SignalKind;
use tokio::time;

use crate::database::{Ulid, User, UserKind};
use crate::store::{MemoryStore, PostgresStore, SessionStore, UserStore};

mod api;
mod config;
mod database;
mod global;
mod session;
mod store;


#[tokio::main]
async fn main() -> Result<()> {
    let config = config::AppConfig::parse()?;
    logging::init(&config.logging.level, config.logging.json)?;

    if let Some(file) = &config.config_file {
        tracing::info!(file = file.as_str(), "loaded config from file");
    }

    tracing::debug!("config: {:#?}", config);

    let (ctx, handler) = Context::new();

    let (session_store, user_store): (Arc<dyn SessionStore>, Arc<dyn UserStore>) =
        if config.database.uri == "memory" {
            tracing::warn!(
                "running on the in-memory store with seeded dev users, sessions will not survive a restart"
            );
            let store = Arc::new(seeded_memory_store()?);
            (store.clone(), store)
        } else {
            let options =
                PgConnectOptions::from_str(&config.database.uri)?.disable_statement_logging();
            let db = Arc::new(sqlx::PgPool::connect_with(options).await?);
            let store = Arc::new(PostgresStore::new(db));
            (store.clone(), store)
        };

    let global = Arc::new(global::GlobalState::new(
        config,
        ctx,
        session_store,
        user_store,
    ));

    tracing::info!("starting");

    let api_future = tokio::spawn(api::run(global.clone()));

    // Listen on both sigint and sigterm and cancel the context when either is received
    let mut signal_handler = signal::SignalHandler::new()
        .with_signal(SignalKind::interrupt())
        .with_signal(SignalKind::terminate());

    select! {
        r = api_future => tracing::error!("api stopped unexpectedly: {:?}", r),
        _ = signal_handler.recv() => tracing::info!("shutting down"),
    }

    // We cannot have a context in scope when we cancel the handler, otherwise it will deadlock.
    drop(global);

    tracing::info!("waiting for tasks to finish");

    select! {
        _ = time::sleep(Duration::from_secs(60)) => tracing::warn!("force shutting down"),
        _ = signal_handler.recv() => tracing::warn!("force shutting down"),
        _ = handler.cancel() => tracing::info!("shutting down"),
    }

    Ok(())
}

/// Development users for the in-memory store: admin/admin and staff/staff.
fn seeded_memory_store() -> Result<MemoryStore> {
    let store = MemoryStore::new();

    for (username, display_name, password, kind) in [
        ("admin", "Admin", "admin", UserKind::Admin),
        ("staff", "Staff", "staff", UserKind::Staff),
    ] {
        store.add_user(User {
            id: Ulid::new(),
            username: username.to_string(),
            display_name: display_name.to_string(),
            password_hash: User::hash_password(password),
            kind,
            created_at: chrono::Utc::now(),
        })?;
    }

    Ok(store)
}

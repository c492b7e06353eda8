use clap::Parser;
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

use crate::{
    auth::{db::AuthDatabase, Auth},
    config::{Config, StartArgs},
    item::db::ItemDb,
    state::AppState,
    storage::FsBlobStore,
};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

pub mod auth;
pub mod backend;
pub mod config;
pub mod db;
pub mod drive;
pub mod error;
pub mod item;
pub mod router;
pub mod state;
pub mod storage;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let StartArgs {
        config_path,
        address: host,
        port,
        log_level: level,
    } = StartArgs::parse();

    tracing_subscriber::fmt().with_max_level(level).init();

    let Config {
        title,
        storage_dir,
        upload_limit,
        auth,
    } = Config::read(config_path).expect("invalid config file");

    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
    let db_pool = db::create_pool(&db_url).await;

    db::migrate(&db_pool).await;

    let auth = Auth::new(AuthDatabase::new(db_pool.clone()), auth).expect("invalid auth config");
    let items = ItemDb::new(db_pool);
    let blobs = FsBlobStore::new(storage_dir)
        .await
        .expect("unable to create blob storage");

    let state = AppState::new(
        title,
        auth,
        Arc::new(items),
        Arc::new(blobs),
        upload_limit,
    );

    let purge_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = purge_state.purge_expired().await {
                error!("Error purging sessions: {e}");
            }
        }
    });

    let addr = format!("{host}:{port}");

    info!("Now listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("error while starting TCP listener");

    axum::serve(listener, router::router(state))
        .await
        .expect("error while starting server");
}

// src/main.rs
mod codinfo;
mod config;
mod handlers;
mod models;
mod storage;

use actix_web::{ web, App, HttpServer };
use env_logger::Env;
use std::sync::Arc;
use storage::memory::SnapshotStore;
use storage::refresh::{ self, Refresher };
use crate::config::Config;
use log::{ info, warn };

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger only once at the start
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    // Load configuration
    let config = Config::from_env();
    let bind = config.bind();

    let store = Arc::new(SnapshotStore::new());
    let refresher = Arc::new(Refresher::new(Arc::clone(&store), config.snapshot_dir.clone()));

    // Serve nothing until the first load has been attempted
    info!("Loading snapshots from {}", config.snapshot_dir.display());
    if let Err(e) = refresher.refresh_with_timeout(config.refresh_timeout()).await {
        warn!("Initial snapshot load failed, starting empty: {}", e);
    }
    info!("Serving {} servers", store.current().len());

    let refresh_task = refresh::spawn(refresher, config.refresh_interval(), config.refresh_timeout());

    let storage = web::Data::from(store);

    info!("Starting server on {}", bind);
    let result = HttpServer::new(move || {
        App::new()
            .app_data(storage.clone())
            .configure(handlers::servers::configure)
    })
        .bind(&bind)?
        .run().await;

    refresh_task.abort();
    result
}

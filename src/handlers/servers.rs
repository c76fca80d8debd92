// src/handlers/servers.rs
use actix_web::{web, HttpResponse};
use log::debug;
use crate::storage::memory::SnapshotStore;

pub async fn get_servers(storage: web::Data<SnapshotStore>) -> HttpResponse {
    let servers = storage.query(None);
    debug!("Serving {} servers", servers.len());

    HttpResponse::Ok().json(servers)
}

pub async fn get_servers_for_game(
    storage: web::Data<SnapshotStore>,
    game: web::Path<String>,
) -> HttpResponse {
    let game = game.into_inner();
    let servers = storage.query(Some(&game));
    debug!("Serving {} servers for game {}", servers.len(), game);

    HttpResponse::Ok().json(servers)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/servers", web::get().to(get_servers))
        .route("/api/servers/", web::get().to(get_servers))
        .route("/api/servers/{game}", web::get().to(get_servers_for_game));
}

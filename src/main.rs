mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod store;
mod validation;

use config::{AppConfig, StoreKind};
use db::Db;
use ntex::web;
use ntex_cors::Cors;
use services::leaderboard::Leaderboard;
use services::media::MediaProxy;
use std::sync::Arc;
use store::{FileStore, MemoryStore, SqliteSlotStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

const LEADERBOARD_SLOT: &str = "leaderboard";

fn open_leaderboard(config: &AppConfig) -> std::io::Result<Leaderboard> {
    Ok(match config.store {
        StoreKind::Sqlite => {
            let db = Db::open(&config.database_path)
                .map_err(|e| std::io::Error::other(format!("Failed to open database: {}", e)))?;
            Leaderboard::new(SqliteSlotStore::new(Arc::new(db), LEADERBOARD_SLOT))
        }
        StoreKind::File => Leaderboard::new(FileStore::new(&config.leaderboard_file)),
        StoreKind::Memory => Leaderboard::new(MemoryStore::new()),
    })
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/media/{path}*", web::get().to(handlers::media::stream_media))
        .route("/leaderboard", web::get().to(handlers::leaderboard::get_leaderboard))
        .route("/leaderboard", web::post().to(handlers::leaderboard::submit_score));
}

#[ntex::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let leaderboard = Arc::new(open_leaderboard(&config)?);
    let proxy = Arc::new(MediaProxy::from_config(&config).map_err(std::io::Error::other)?);

    info!(
        host = %config.host,
        port = config.port,
        upstream = %config.media_server_url,
        token_configured = proxy.token_configured(),
        store = ?config.store,
        "Clip quiz server starting"
    );

    web::HttpServer::new(move || {
        web::App::new()
            .state(leaderboard.clone())
            .state(proxy.clone())
            .wrap(
                Cors::new()
                    .allowed_origin("*")
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec!["Content-Type", "Range"])
                    .expose_headers(vec!["Content-Range", "Content-Length", "Accept-Ranges"])
                    .max_age(3600)
                    .finish(),
            )
            .configure(configure)
    })
    .bind(format!("{}:{}", config.host, config.port))?
    .run()
    .await
}

async fn health(proxy: web::types::State<Arc<MediaProxy>>) -> web::HttpResponse {
    web::HttpResponse::Ok().json(&serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "upstreamConfigured": proxy.token_configured(),
    }))
}

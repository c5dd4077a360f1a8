use actix_web::{web, App, HttpServer};
use farmstore::{Store, StoreConfig};
use std::path::Path;

mod handlers;

/// Shared application state
pub struct AppState {
    pub store: Store,
}

fn load_config() -> farmstore::Result<StoreConfig> {
    let config = match std::env::var("FARMSTORE_CONFIG") {
        Ok(path) => StoreConfig::load(Path::new(&path))?,
        Err(_) if Path::new("farmstore.yaml").exists() => {
            StoreConfig::load(Path::new("farmstore.yaml"))?
        }
        Err(_) => StoreConfig::default(),
    };
    config.with_env()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    log::info!("Starting FarmStore server");

    let host = std::env::var("FARMSTORE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("FARMSTORE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);

    let store = load_config()
        .and_then(|config| {
            log::info!(
                "Opening {:?} store at: {}",
                config.backend,
                config.data_path.display()
            );
            Store::open(config)
        })
        .map_err(|e| {
            log::error!("Failed to open store: {e}");
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?;

    let state = web::Data::new(AppState { store });

    log::info!("Listening on {host}:{port}");
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}

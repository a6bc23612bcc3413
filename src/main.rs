use crate::config::AppConfig;
use crate::db::connection::{init_db, Database};
use crate::responses::error_to_response;
use crate::router::{handle, App};
use astra::Server;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod domain;
mod errors;
mod ids;
mod market;
mod responses;
mod router;
mod templates;


fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mandi_watch=info")),
        )
        .init();

    let cfg = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let db = Database::new(&cfg.db_path)
        .with_busy_timeout(Duration::from_millis(cfg.busy_timeout_ms));

    if let Err(e) = init_db(&db, &cfg.schema_path) {
        error!("database initialization failed: {e}");
        std::process::exit(1);
    }

    info!(
        addr = %cfg.bind_addr,
        workers = cfg.max_workers,
        retract_on_reset = cfg.reports.retract_sample_on_reset,
        utc_offset_minutes = cfg.reports.utc_offset_minutes,
        "starting server"
    );

    let server = Server::bind(&cfg.bind_addr).max_workers(cfg.max_workers);
    let app = App::new(db, &cfg);

    let result = server.serve(move |req, _info| match handle(req, &app) {
        Ok(resp) => resp,
        Err(err) => {
            if err.status() >= 500 {
                error!("request failed: {err}");
            } else {
                warn!("request rejected: {err}");
            }
            error_to_response(err)
        }
    });

    if let Err(e) = result {
        error!("server ended with error: {e}");
    }

    info!("server shut down cleanly");
}

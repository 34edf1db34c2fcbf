mod calendar;
mod config;
mod data;
mod edit;
mod error;
mod grid;
mod occupancy;
mod relaxed;
mod requirements;
mod rooms;
mod search;
mod server;
mod solver;
mod store;

use config::ServerConfig;
use data::DomainSnapshot;
use log::error;
use store::Store;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };

    let store = match &config.snapshot_path {
        Some(path) => match Store::load(path, config.limits) {
            Ok(store) => store,
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        },
        None => Store::new(DomainSnapshot::default(), config.limits),
    };

    if let Err(e) = server::run_server(config, store).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}

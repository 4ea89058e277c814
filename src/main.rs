use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod render;
mod server;
mod store;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load()?;

    logger::init(&cfg)?;

    // Build the Tokio runtime, sizing the worker pool from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let store = store::Store::open(&cfg.database.path)?;
    store.init_schema()?;

    // Seed data is only ever applied to an empty database
    if let Some(ref seed_path) = cfg.database.seed_file {
        match store.seed_from_file(seed_path) {
            Ok(true) => logger::log_seed_applied(seed_path),
            Ok(false) => {}
            Err(e) => {
                logger::log_error(&format!("Failed to seed database from {seed_path}: {e}"));
            }
        }
    }

    let listener = server::create_reusable_listener(addr)?;
    let state = Arc::new(config::AppState::new(cfg, store));
    let connections = Arc::new(AtomicUsize::new(0));

    logger::log_server_start(&addr, &state.config);

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::run(listener, state, connections))
        .await
}

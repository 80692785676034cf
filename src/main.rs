use std::sync::Arc;
use tokio::sync::Notify;

mod config;
mod handler;
mod http;
mod logger;
mod proxy;
mod server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine; the real environment may carry everything
    if let Err(e) = dotenv::dotenv() {
        if !e.not_found() {
            eprintln!("[WARN] Failed to load .env: {e}");
        }
    }

    let cfg = config::Config::load()?;
    logger::init(&cfg)?;

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
    let listener = server::create_listener(addr)?;

    if !cfg.upstream.has_api_key() {
        logger::log_warning("COHERE_API_KEY is not set; upstream calls will be rejected");
    }
    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(config::AppState::new(cfg)?);
    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown));

    server::run(listener, state, shutdown).await;
    Ok(())
}

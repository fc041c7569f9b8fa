use std::sync::Arc;

mod config;
mod handler;
mod http;
mod logger;
mod reload;
mod render;
mod server;

use config::Mode;
use render::SsrRuntime;

fn main() -> Result<(), Box<dyn std::error::Error>> {
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
    let listener = server::create_reusable_listener(addr)?;
    let state = Arc::new(config::AppState::new(cfg));

    match state.config.mode {
        // Production loads the build artifacts once; missing artifacts are fatal
        Mode::Production => {
            let runtime = SsrRuntime::load(&state.config.assets)
                .await
                .map_err(|e| e as Box<dyn std::error::Error>)?;
            state.install_runtime(runtime).await;
        }
        // Development starts warming up and installs artifacts as they appear
        Mode::Development => reload::spawn(Arc::clone(&state)),
    }

    logger::log_server_start(&addr, &state.config);
    server::run(listener, state).await
}

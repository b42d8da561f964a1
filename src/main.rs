use actix_web::{web, App, HttpServer};
use bank_auth_server::{routes, AppError, AppState, Settings};
use dotenv::dotenv;
use std::net::TcpListener;
use std::time::Duration;
use tracing::{info, debug};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[actix_web::main]
async fn main() -> bank_auth_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging, `RUST_LOG` overrides the default level
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!("Configuration loaded successfully ({} environment)", config.environment);

    info!("Starting server at {}:{}", config.server.host, config.server.port);

    // Initialize application state
    let state = AppState::new(config.clone()).await?;
    let state = web::Data::new(state);

    // Sweep expired sessions and stale login throttles
    let sweeper_state = state.clone();
    let sweep_interval = Duration::from_secs(config.session.cleanup_interval_secs.max(1));
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(sweep_interval).await;
            let removed = sweeper_state.auth_service.sweep().await;
            if removed > 0 {
                debug!("Removed {} expired sessions", removed);
            }
        }
    });

    // Create and bind TCP listener
    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;

    info!("Auth server ready at http://{}:{}/login", config.server.host, config.server.port);

    let server_state = state.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(server_state.clone())
            .configure(routes)
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    info!("Server stopped, closing user store");
    state.shutdown().await
}

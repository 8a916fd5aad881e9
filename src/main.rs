use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use datavault_consent_server::platform::HttpPlatformClient;
use datavault_consent_server::routes::{
    begin_fetch, exchange_token, file_list, health_check, home, preparing, push_receipt, results,
    return_callback, send_receipt, show_error,
};
use datavault_consent_server::store::JsonFileStore;
use datavault_consent_server::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "datavault_consent_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting consent example server...");

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "Environment: {}, Server: {}",
        config.environment,
        config.server_address()
    );

    // Wire up the collaborators: flat-file user store, HTTP platform client
    let store = Arc::new(JsonFileStore::new(&config.users_file_path));
    let platform = Arc::new(HttpPlatformClient::new(&config.platform_base_url));
    let state = AppState::new(store, platform, config.clone());

    // Build router
    let app = Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .route("/error", get(show_error))
        .route("/fetch", get(begin_fetch))
        .route("/return", get(return_callback))
        .route("/file-list", post(file_list))
        .route("/preparing", get(preparing))
        .route("/results", get(results))
        .route("/send-receipt", get(send_receipt))
        .route("/exchange-token", get(exchange_token))
        .route("/push", get(push_receipt))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use pdf_generator::{
    config::Config,
    api::routes::create_router,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let server_addr = config.server_addr;
    info!(
        "Starting server on {} (browser mode {:?}, deployment marker {})",
        server_addr,
        config.browser.mode,
        if config.browser.deploy_marker_present { "present" } else { "absent" }
    );

    // Create application state
    let app_state = AppState::from_config(&config);

    // Build the router with routes
    let app = create_router(app_state);

    // Create the listener
    let listener = TcpListener::bind(server_addr).await?;

    // Start the server
    info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

use std::net::TcpListener;
use tokenkeeper::configuration::get_configuration;
use tokenkeeper::startup::{build_sessions, run};
use tokenkeeper::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Structured logging
    init_telemetry();

    tracing::info!("Starting application");

    // Load settings
    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!(
                storage = ?config.application.storage,
                access_ttl = config.jwt.access_token_expiry,
                refresh_ttl = config.jwt.refresh_token_expiry,
                "Configuration loaded successfully"
            );
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    // Storage and session controller
    let sessions = build_sessions(&configuration).await.map_err(|e| {
        tracing::error!("Failed to initialise storage: {}", e);
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Storage error")
    })?;

    // Bind address
    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    // Serve
    run(listener, sessions)?.await
}

use std::sync::Arc;

use anyhow::Context;

use turnstile::service::TicketingService;
use turnstile::transport::{ServerConfig, serve};
use turnstile::{ActivityLog, EventCategory, SimulationConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("TURNSTILE_CONFIG").unwrap_or_else(|_| "config.json".to_string());
    let activity_path =
        std::env::var("TURNSTILE_ACTIVITY_LOG").unwrap_or_else(|_| "activity.log".to_string());

    let config = SimulationConfig::load_or_create(&config_path)
        .with_context(|| format!("loading configuration from {config_path}"))?;
    tracing::info!(path = %config_path, "Configuration loaded");

    let activity = ActivityLog::to_file(&activity_path);
    activity.record(EventCategory::System, None, "System initiated.");

    let service = Arc::new(TicketingService::new(config, activity));

    let server = ServerConfig {
        host: std::env::var("TURNSTILE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        port: std::env::var("TURNSTILE_PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(5000),
    };

    serve(server, service).await
}

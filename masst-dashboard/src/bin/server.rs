//! microbiomeMASST dashboard server binary

use anyhow::{Context, Result};
use masst::api::{create_router, ApiState};
use masst::{DashboardConfig, Dispatcher, ResultResolver};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting microbiomeMASST dashboard v{}", env!("CARGO_PKG_VERSION"));

    // Load config from file
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = if Path::new(&config_path).exists() {
        DashboardConfig::from_path(Path::new(&config_path))
            .with_context(|| format!("Failed to load config file: {}", config_path))?
    } else {
        warn!(config_path, "Config file not found, using defaults");
        DashboardConfig::default()
    };

    info!(
        config_path = config_path,
        output_root = %config.output_root.display(),
        client_dir = %config.client.working_dir.display(),
        max_concurrent_searches = config.client.max_concurrent_searches,
        "Loaded configuration"
    );

    std::fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "Failed to create output root: {}",
            config.output_root.display()
        )
    })?;

    let mut resolver = ResultResolver::new(&config.output_root);
    if let Some(dir) = &config.static_dir {
        resolver = resolver.with_static_dir(dir);
    }

    // Create API state
    let state = Arc::new(ApiState {
        dispatcher: Dispatcher::new(config.client.clone(), &config.output_root),
        resolver,
    });

    // Create router
    let app = create_router(state);

    // Start server
    let ip = config
        .bind_address
        .parse::<std::net::IpAddr>()
        .with_context(|| format!("Invalid bind address: {}", config.bind_address))?;
    let addr = SocketAddr::new(ip, config.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

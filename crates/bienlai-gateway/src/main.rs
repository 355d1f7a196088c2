use std::sync::Arc;

use bienlai_core::GatewayConfig;
use bienlai_gateway::{routes, server, state::AppState, telemetry};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let config = GatewayConfig::from_env()?;
    let state = Arc::new(AppState::from_config(&config).await?);
    let router = routes::build_router(state, &config.cors_origins);

    server::start_server(config.server_port, router, config.max_upload_bytes).await
}

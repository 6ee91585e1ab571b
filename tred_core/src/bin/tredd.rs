use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use tred_core::TredCore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let core = TredCore::start().await?;
    info!(
        node_id = %core.server.endpoint.id(),
        "serving tred RPC, press Ctrl+C to stop"
    );

    tokio::signal::ctrl_c().await?;

    core.shutdown().await
}

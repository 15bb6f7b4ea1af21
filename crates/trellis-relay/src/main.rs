use trellis_relay::{RelayResult, RelayServer, ServerConfig};

#[tokio::main]
async fn main() -> RelayResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut config = ServerConfig::default();
    if let Ok(addr) = std::env::var("TRELLIS_RELAY_ADDR") {
        match addr.parse() {
            Ok(parsed) => config.bind_addr = parsed,
            Err(e) => tracing::warn!(%addr, error = %e, "ignoring invalid TRELLIS_RELAY_ADDR"),
        }
    }

    RelayServer::new(config).serve().await
}

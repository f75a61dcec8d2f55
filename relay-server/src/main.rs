use anyhow::Result;
use relay_server::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env()?;
    let ax = relay_server::build(&config).await?;

    let addr = config.addr();
    tracing::info!(chunk_size = config.relay.chunk_rules.chunk_size, "listening on http://{addr}");

    ax.listen(addr).await?;

    Ok(())
}

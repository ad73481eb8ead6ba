use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = config::load_and_apply("maestro", None) {
        tracing::warn!("config::load_and_apply: {}", e);
    }

    let addr = std::env::var("MAESTRO_HTTP_ADDR").ok();
    maestro_server::run_server(addr.as_deref()).await
}

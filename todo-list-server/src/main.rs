use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let config = todo_list_server::config::Config::from_env()?;
    tracing::info!(
        port = config.port,
        run_mode = %config.run_mode,
        "Configuration loaded"
    );
    todo_list_server::web::start_web_server(config).await
}

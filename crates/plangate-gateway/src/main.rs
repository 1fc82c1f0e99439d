use plangate_gateway::config::Config;
use plangate_gateway::{AppState, create_app};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("info,plangate_gateway=debug")
        .init();

    // Configuration errors surface here, never at request time.
    plangate_core::validate_feature_catalog()?;

    let config = Config::from_env()?;
    let addr = config.addr;
    let app = create_app(AppState::new(config));

    info!("Plangate gateway listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! IRIS server
//!
//! Run with: cargo run -p iris-web --bin iris

use tracing::info;
use tracing_subscriber::EnvFilter;

use iris_web::config::Config;
use iris_web::router::build_router;
use iris_web::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("iris=debug,info")),
        )
        .init();

    info!("Starting IRIS...");

    let config = Config::load()?;
    info!(
        mock_llm = config.llm.mock,
        request_timeout_secs = config.engine.jobs.request_timeout_secs,
        "Configuration loaded"
    );

    let state = AppState::from_config(&config);
    info!(llm_model = %state.llm_model, "Synthesis engine ready");

    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};

use store_review::config::Config;
use store_review::host;
use store_review::platform::{AppContext, Binding, Surface};
use store_review::server::ReviewServer;
use store_review::session::ReviewSession;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    dotenvy::dotenv().ok();

    tracing::info!("store-review starting");

    let config = Config::load();

    let binding = Arc::new(Binding::new());
    if config.package_id.is_empty() {
        tracing::warn!("package_id not set, application context stays detached until the host attaches it");
    } else {
        binding.on_attached_to_engine(AppContext {
            package_id: config.package_id.clone(),
        });
    }
    if !config.surface_id.is_empty() {
        binding.on_attached_to_surface(Surface::new(config.surface_id.clone()));
    }

    let session = Arc::new(ReviewSession::new(
        binding,
        host::collaborators(&config),
        config.session_options(),
    ));
    let server = ReviewServer::new(Arc::clone(&session));

    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("serving error: {e:?}"))?;

    service.waiting().await?;

    session.on_detached_from_engine();
    tracing::info!("store-review shutting down");
    Ok(())
}

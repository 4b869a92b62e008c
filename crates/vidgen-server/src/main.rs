//! vidgen-server - 動画生成 backend の HTTP proxy

mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vidgen_core::impls::HttpVideoService;

use crate::config::Config;
use crate::routes::{AppState, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vidgen=info,tower_http=info")),
        )
        .init();

    let config = Config::parse();

    let service = HttpVideoService::new(config.backend_url.clone());
    let app = router(AppState {
        service: Arc::new(service),
    });

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        backend = %config.backend_url,
        "vidgen proxy listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            // signal handler を登録できなければ kill されるまで動く
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}

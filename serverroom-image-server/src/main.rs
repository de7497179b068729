/**
 * SERVEUR D'IMAGES - Point d'entrée
 *
 * Variables : IMAGE_SERVER_ADDR (défaut 0.0.0.0:8000), CAPTURE_DIR (défaut ~/captures)
 */

use anyhow::Context;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let addr = std::env::var("IMAGE_SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let dir = match std::env::var("CAPTURE_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => dirs::home_dir()
            .context("no home directory, set CAPTURE_DIR")?
            .join("captures"),
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!(%addr, dir = %dir.display(), "image server listening");

    axum::serve(listener, serverroom_image_server::router(dir))
        .await
        .context("image server stopped")
}

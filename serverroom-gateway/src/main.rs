/**
 * SERVERROOM GATEWAY - Point d'entrée
 *
 * RÔLE : charge .env + configuration, initialise les logs, lance la passerelle.
 */

use anyhow::Context;
use serverroom_gateway::{app, config::GatewayConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = GatewayConfig::load().context("invalid configuration")?;
    app::run(cfg).await
}

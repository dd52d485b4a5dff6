//! Hashes the passwords of seeded accounts without starting the HTTP server.

use eduflows_auth::{auth::password::migrate_legacy_passwords, config::AppConfig, telemetry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let config = AppConfig::from_env()?;
    let state = AppState::init(config).await?;

    tracing::info!("hashing legacy passwords");
    let migrated = migrate_legacy_passwords(state.store.as_ref(), &state.config.legacy).await?;
    tracing::info!(migrated, "legacy passwords hashed");

    Ok(())
}

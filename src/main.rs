use eduflows_auth::{build_app, config::AppConfig, serve, telemetry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let config = AppConfig::from_env()?;
    if config.legacy.login_enabled {
        tracing::warn!(
            accounts = config.legacy.accounts.len(),
            "legacy demo passwords accepted for unmigrated accounts"
        );
    }

    let state = AppState::init(config).await?;
    let config = state.config.clone();
    let app = build_app(state);

    serve(app, &config).await
}

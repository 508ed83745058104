use anyhow::Context;
use trivia_api::config::Settings;
use trivia_api::db;
use trivia_api::server::app::run_server;
use trivia_api::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = Settings::load().context("Failed to load settings")?;
    let pool = db::establish_connection(&settings.db_path)
        .await
        .with_context(|| format!("Cannot open database {}", settings.db_path))?;

    tracing::info!("Running db migrations...");
    db::run_migrations(&pool).await?;

    run_server(pool, &settings).await
}

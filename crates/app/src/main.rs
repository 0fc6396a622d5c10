use std::{net::SocketAddr, sync::Arc, time::Duration};

use ingest::{ExpenseParser, HttpBlobStore, Ingestor, OpenAiClient, ReceiptUploader, SystemClock};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "budgetwise={level},server={level},engine={level},ingest={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.server.database).await?;
    let engine = engine::Engine::builder().database(db).build().await?;

    let http = reqwest::Client::new();
    if settings.openai.api_key.is_none() {
        tracing::warn!("no OpenAI API key configured, AI parsing will fail");
    }
    let model = OpenAiClient::builder()
        .http(http.clone())
        .base_url(&settings.openai.base_url)
        .api_key(settings.openai.api_key.clone())
        .model(&settings.openai.model)
        .build();
    let parser = ExpenseParser::new(Arc::new(model))
        .with_timeout(Duration::from_secs(settings.openai.timeout_secs));

    let store = HttpBlobStore::new(
        http,
        settings.storage.base_url.clone(),
        settings.storage.bucket.clone(),
        settings.storage.api_key.clone(),
    );
    let uploader = ReceiptUploader::new(Arc::new(store))
        .with_timeout(Duration::from_secs(settings.storage.timeout_secs));

    let ingestor = Ingestor::new(parser, uploader, Arc::new(SystemClock));

    let bind = settings
        .server
        .bind
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{}:{}", bind, settings.server.port).parse()?;
    server::run(server::ServerState::new(engine, ingestor), addr).await;

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

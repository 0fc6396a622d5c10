//! Standalone schema tool: `migration [up|down|fresh|status]`.
//!
//! The database is taken from `DATABASE_URL` and defaults to the local
//! SQLite file used by the `budgetwise` binary.

use sea_orm::Database;
use sea_orm_migration::prelude::*;

const DEFAULT_DATABASE_URL: &str = "sqlite:./budgetwise.db?mode=rwc";

enum Command {
    Up,
    Down,
    Fresh,
    Status,
}

impl Command {
    fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.unwrap_or("up") {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "fresh" => Some(Self::Fresh),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let arg = std::env::args().nth(1);
    let Some(command) = Command::parse(arg.as_deref()) else {
        eprintln!("Usage: migration [up|down|fresh|status]");
        std::process::exit(2);
    };

    let db_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db = Database::connect(&db_url).await?;

    match command {
        Command::Up => migration::Migrator::up(&db, None).await?,
        Command::Down => migration::Migrator::down(&db, None).await?,
        Command::Fresh => migration::Migrator::fresh(&db).await?,
        Command::Status => migration::Migrator::status(&db).await?,
    }

    Ok(())
}

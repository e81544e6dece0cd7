use migration::{Migrator, MigratorTrait};
use sea_orm::Database;

const USAGE: &str = "Usage: cargo run -p migration -- [up|down|fresh|status]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let db_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:./fintrack.db?mode=rwc".to_string());
    let db = Database::connect(&db_url).await?;

    match std::env::args().nth(1).as_deref() {
        None | Some("up") => Migrator::up(&db, None).await?,
        Some("down") => Migrator::down(&db, None).await?,
        Some("fresh") => Migrator::fresh(&db).await?,
        Some("status") => Migrator::status(&db).await?,
        Some(_) => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}

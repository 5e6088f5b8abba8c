use dotenvy::dotenv;
use envconfig::Envconfig;

use pharmaflow::db;
use pharmaflow::handlers::{self, AppState};

type Error = Box<dyn std::error::Error + Send + Sync>;

#[derive(Envconfig)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL")]
    database_url: String,

    #[envconfig(from = "BIND_ADDR", default = "0.0.0.0:8080")]
    bind_addr: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize the logger with default settings or "info" level if not specified
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting the pharmacy service...");

    // Load environment variables from a .env file if present
    dotenv().ok();

    let config = Config::init_from_env()?;

    let pool = db::init_db(&config.database_url).await?;

    let app = handlers::router(AppState { pool });
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    log::info!("Listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    log::info!("Shutting down gracefully");
    Ok(())
}

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use linkboard::{AppState, Config, Database, WebServer};

#[tokio::main]
async fn main() -> ExitCode {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = match Config::load_with_env(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = linkboard::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        linkboard::logging::init_console_only(&config.logging.level);
    }

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> linkboard::Result<()> {
    config.validate()?;

    info!("linkboard - {}", config.site.slogan);
    if config.site.debug {
        info!("Debug mode: templates reload on every request");
    }

    let db = Database::open(&config.database.path, config.database.max_connections).await?;
    info!(path = %config.database.path, "Database ready");

    let server = WebServer::new(&config.server, Arc::new(AppState::new(db, config.clone())?))?;
    info!("Server configured on {}", server.addr());
    server.run().await
}

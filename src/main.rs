use std::sync::Arc;

use tracing::{error, info};

use fileshelf::storage::open_store;
use fileshelf::web::WebServer;
use fileshelf::{Config, Database, FileService, QuotaPolicy, UrlSigner};

#[tokio::main]
async fn main() {
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = fileshelf::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        fileshelf::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> fileshelf::Result<()> {
    config.validate()?;

    info!("fileshelf - multi-tenant file storage");
    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );

    let db = Database::open(&config.database.url).await?;

    let signer = UrlSigner::new(&config.web.jwt_secret, &config.storage.public_base_url);
    let store = open_store(&config.storage, signer.clone()).await?;
    let files = Arc::new(FileService::new(
        store,
        QuotaPolicy::new(config.quota.clone()),
    ));

    let server = WebServer::new(&config, db, files, signer)?;
    server.run().await?;
    Ok(())
}

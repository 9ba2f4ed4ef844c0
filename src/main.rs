use std::sync::Arc;

use tracing::{error, info};

use apuntes::{Config, DriveService, ResilientStore, S3Store, SharedStore, WebServer};

/// Environment variable naming the configuration file.
const CONFIG_PATH_ENV: &str = "APUNTES_CONFIG";

fn status(value: &Option<String>) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => "[LOADED]",
        _ => "[MISSING]",
    }
}

#[tokio::main]
async fn main() {
    let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());

    // Load configuration
    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = apuntes::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        apuntes::logging::init_console_only(&config.logging.level);
    }

    info!("apuntes - study notes drive");
    info!("Environment: {}", config.web.environment);
    info!("R2_ACCESS_KEY_ID: {}", status(&config.store.access_key_id));
    info!("R2_SECRET_ACCESS_KEY: {}", status(&config.store.secret_access_key));
    info!("R2_ENDPOINT: {}", status(&config.store.endpoint));
    info!("R2_BUCKET_NAME: {}", config.store.bucket);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let s3 = match S3Store::connect(&config.store).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to create store client: {}", e);
            std::process::exit(1);
        }
    };
    let store: SharedStore = Arc::new(ResilientStore::new(
        Arc::new(s3),
        config.browse.request_timeout(),
        config.browse.retry_config(),
    ));

    let drive = match DriveService::from_config(store, &config) {
        Ok(drive) => Arc::new(drive),
        Err(e) => {
            error!("Failed to create drive: {}", e);
            std::process::exit(1);
        }
    };

    let server = match WebServer::new(&config.web, drive) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to create web server: {}", e);
            std::process::exit(1);
        }
    };

    info!("Server configured on {}", server.addr());
    if let Err(e) = server.run().await {
        error!("Web server error: {}", e);
        std::process::exit(1);
    }
}

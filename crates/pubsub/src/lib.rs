//! # PubSub Host - Main Entry Point
//!
//! Small host process around [`pubsub_event_system`]: it wires subscriptions
//! from a TOML file, publishes a startup event, and publishes the reserved
//! shutdown event when the process is asked to stop.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration (writes pubsub.toml if missing)
//! pubsub
//!
//! # Specify custom configuration
//! pubsub --config production.toml
//!
//! # Publish startup and shutdown, then exit
//! pubsub --no-wait --log-level debug
//!
//! # JSON logging
//! pubsub --json-logs
//! ```
//!
//! ## Signal Handling
//!
//! The host shuts down on SIGINT (Ctrl+C) and SIGTERM (Unix systems).

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Runs the host: parse arguments, set up logging, then run the application.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging comes first, so a broken config file only costs the defaults here
    let config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();

    let mut logging = config.logging.clone();
    if let Some(level) = &args.log_level {
        logging.level = level.clone();
    }
    if let Err(e) = logging::setup_logging(&logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::{DispatcherSettings, LoggingSettings, SubscriptionAction, SubscriptionSettings};

//! Main application logic and lifecycle management.
//!
//! The `Application` owns the dispatcher, wires the configured subscriptions,
//! publishes the startup event and, once a termination signal arrives, the
//! shutdown event.

use crate::{
    cli::CliArgs,
    config::{AppConfig, SubscriptionAction},
    logging::display_banner,
    signals::wait_for_shutdown_signal,
};
use pubsub_event_system::{callback, Callback, Event, EventValues, Manager, EVENT_SHUTDOWN};
use serde_json::json;
use tracing::{info, warn};

/// The host process: configuration plus the dispatcher it drives.
///
/// The dispatcher is single-threaded, so the application runs on a
/// current-thread runtime and never moves the manager across tasks.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// The dispatcher every configured subscription lives in
    manager: Manager,
    /// Skip waiting for a signal
    no_wait: bool,
}

impl Application {
    /// Creates a new application from command-line arguments.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Wire the configured subscriptions
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();
        Self::from_config(config, args.no_wait)
    }

    /// Builds the application from an already validated configuration.
    pub fn from_config(config: AppConfig, no_wait: bool) -> Result<Self, Box<dyn std::error::Error>> {
        let manager = Manager::new();

        for (index, subscription) in config.subscriptions.iter().enumerate() {
            let action = subscription.action()?;
            manager.subscribe(
                &subscription.event,
                configured_callback(index, action),
                subscription.priority,
                subscription.only_once,
            )?;
        }
        info!("📝 Wired {} configured subscriptions", config.subscriptions.len());

        Ok(Self {
            config,
            manager,
            no_wait,
        })
    }

    /// The dispatcher, for embedding code that wants to add its own subscribers.
    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// Runs the application until a termination signal (or immediately with `--no-wait`).
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting pubsub host");
        self.log_configuration_summary();

        self.publish_startup()?;

        if self.no_wait {
            info!("⏭️ --no-wait given, shutting down right away");
        } else {
            info!("🛑 Press Ctrl+C to shut down");
            wait_for_shutdown_signal().await?;
        }

        self.shutdown()?;
        self.log_final_statistics();
        info!("✅ pubsub host shutdown complete");
        Ok(())
    }

    /// Publishes the configured startup event carrying the process id and version.
    pub fn publish_startup(&self) -> Result<Event, Box<dyn std::error::Error>> {
        let mut values = EventValues::new();
        values.insert("pid".to_string(), json!(std::process::id()));
        values.insert("version".to_string(), json!(env!("CARGO_PKG_VERSION")));

        let event = self
            .manager
            .publish_with(&self.config.dispatcher.startup_event, None, values)?;
        info!("🚀 Published '{}'", self.config.dispatcher.startup_event);
        Ok(event)
    }

    /// Publishes the shutdown event once.
    ///
    /// The reserved shutdown event always goes out; a differently named
    /// configured shutdown event is published right after it. Later calls do
    /// nothing and return `false`.
    pub fn shutdown(&self) -> Result<bool, Box<dyn std::error::Error>> {
        if self.manager.publish_shutdown()?.is_none() {
            warn!("Shutdown already published");
            return Ok(false);
        }

        let configured = &self.config.dispatcher.shutdown_event;
        if configured != EVENT_SHUTDOWN {
            self.manager.publish(configured)?;
            info!("🛑 Published '{}'", configured);
        }
        Ok(true)
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🚀 Startup event: {}", self.config.dispatcher.startup_event);
        info!("  🛑 Shutdown event: {}", self.config.dispatcher.shutdown_event);
        info!("  📝 Subscriptions: {}", self.config.subscriptions.len());
    }

    fn log_final_statistics(&self) {
        let stats = self.manager.stats();
        info!("📊 Final Statistics:");
        info!("  - Events published: {}", stats.events_published);
        info!("  - Deliveries: {}", stats.deliveries);
        info!("  - Lazy subscribers resolved: {}", stats.factories_resolved);
        info!("  - Stopped passes: {}", stats.propagation_stops);
        info!("  - Remaining subscriptions: {}", stats.total_subscriptions);
    }
}

/// Subscriber for one `[[subscriptions]]` entry.
fn configured_callback(index: usize, action: SubscriptionAction) -> Callback {
    callback(move |event, event_name, _manager| {
        info!(
            subscription = index,
            "📨 '{}' delivered ({} values)",
            event_name,
            event.values().len()
        );
        if action == SubscriptionAction::Stop {
            event.stop_propagation();
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubscriptionSettings;
    use pubsub_event_system::Target;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn subscription(event: &str, action: &str, priority: i32, only_once: bool) -> SubscriptionSettings {
        SubscriptionSettings {
            event: event.to_string(),
            action: action.to_string(),
            priority,
            only_once,
        }
    }

    fn config_with(subscriptions: Vec<SubscriptionSettings>) -> AppConfig {
        AppConfig {
            subscriptions,
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_from_config_wires_subscriptions() {
        let app = Application::from_config(AppConfig::default(), true).unwrap();
        assert!(app.manager().has_subscribers("app.start"));
        assert!(app.manager().has_subscribers(EVENT_SHUTDOWN));
        assert_eq!(app.manager().stats().total_subscriptions, 2);
    }

    #[test]
    fn test_stop_action_ends_the_pass() {
        let app = Application::from_config(
            config_with(vec![subscription("app.start", "stop", 10, false)]),
            true,
        )
        .unwrap();

        let reached = Rc::new(Cell::new(false));
        let flag = reached.clone();
        app.manager()
            .subscribe(
                "app.start",
                Target::callback(move |_, _, _| {
                    flag.set(true);
                    Ok(())
                }),
                0,
                false,
            )
            .unwrap();

        let event = app.publish_startup().unwrap();
        assert!(event.is_propagation_stopped());
        assert!(event.has_value("pid"));
        assert!(!reached.get());
    }

    #[test]
    fn test_only_once_startup_subscription_is_removed() {
        let app = Application::from_config(AppConfig::default(), true).unwrap();
        app.publish_startup().unwrap();
        assert!(!app.manager().has_subscribers("app.start"));
    }

    #[test]
    fn test_shutdown_publishes_once() {
        let app = Application::from_config(AppConfig::default(), true).unwrap();
        assert!(app.shutdown().unwrap());
        assert!(!app.shutdown().unwrap());
        assert!(app.manager().is_shutdown_published());
        assert_eq!(app.manager().stats().deliveries, 1);
    }

    #[test]
    fn test_custom_shutdown_event_follows_reserved_one() {
        let mut config = config_with(vec![
            subscription(EVENT_SHUTDOWN, "log", 0, false),
            subscription("halt", "log", 0, false),
        ]);
        config.dispatcher.shutdown_event = "halt".to_string();
        let app = Application::from_config(config, true).unwrap();

        app.shutdown().unwrap();
        let stats = app.manager().stats();
        assert_eq!(stats.events_published, 2);
        assert_eq!(stats.deliveries, 2);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result = Application::from_config(config_with(vec![subscription("x", "explode", 0, false)]), true);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_run_without_waiting() {
        let dir = TempDir::new().unwrap();
        let args = CliArgs {
            config_path: dir.path().join("pubsub.toml"),
            log_level: Some("debug".to_string()),
            json_logs: false,
            no_wait: true,
        };

        let app = Application::new(args.clone()).await.unwrap();
        assert!(args.config_path.exists());
        app.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_cli_log_level_fails_validation() {
        let dir = TempDir::new().unwrap();
        let args = CliArgs {
            config_path: dir.path().join("pubsub.toml"),
            log_level: Some("loud".to_string()),
            json_logs: true,
            no_wait: true,
        };

        let err = Application::new(args).await.err().unwrap();
        assert!(err.to_string().contains("Invalid log level"));
    }
}

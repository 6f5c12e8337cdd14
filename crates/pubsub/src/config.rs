//! Configuration management for the pubsub host.
//!
//! This module handles loading and validation of the host configuration from
//! TOML files.

use pubsub_event_system::{DEFAULT_PRIORITY, EVENT_SHUTDOWN};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

fn default_startup_event() -> String {
    "app.start".to_string()
}

fn default_shutdown_event() -> String {
    EVENT_SHUTDOWN.to_string()
}

fn default_action() -> String {
    "log".to_string()
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Dispatcher lifecycle settings
    #[serde(default)]
    pub dispatcher: DispatcherSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Subscriptions wired before the startup event is published
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionSettings>,
}

/// Which events the host publishes around its own lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherSettings {
    /// Published once after all configured subscriptions are wired
    #[serde(default = "default_startup_event")]
    pub startup_event: String,
    /// Published once when the host shuts down
    #[serde(default = "default_shutdown_event")]
    pub shutdown_event: String,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

/// One configured subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSettings {
    /// Event name to subscribe to
    pub event: String,
    /// What the subscriber does: `log` or `stop`
    #[serde(default = "default_action")]
    pub action: String,
    /// Higher runs first
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Remove after the first delivery
    #[serde(default)]
    pub only_once: bool,
}

/// Behaviour of a configured subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionAction {
    /// Log the delivery and let the event continue
    Log,
    /// Log the delivery and stop propagation
    Stop,
}

impl SubscriptionSettings {
    /// Parses the configured action name.
    pub fn action(&self) -> Result<SubscriptionAction, String> {
        match self.action.as_str() {
            "log" => Ok(SubscriptionAction::Log),
            "stop" => Ok(SubscriptionAction::Stop),
            other => Err(format!(
                "Invalid action '{other}' for subscription to '{}'. Must be one of: [\"log\", \"stop\"]",
                self.event
            )),
        }
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            startup_event: default_startup_event(),
            shutdown_event: default_shutdown_event(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherSettings::default(),
            logging: LoggingSettings::default(),
            subscriptions: vec![
                SubscriptionSettings {
                    event: default_startup_event(),
                    action: default_action(),
                    priority: DEFAULT_PRIORITY,
                    only_once: true,
                },
                SubscriptionSettings {
                    event: default_shutdown_event(),
                    action: default_action(),
                    priority: DEFAULT_PRIORITY,
                    only_once: false,
                },
            ],
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validates the configuration.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.dispatcher.startup_event.is_empty() {
            return Err("dispatcher.startup_event cannot be empty".to_string());
        }
        if self.dispatcher.shutdown_event.is_empty() {
            return Err("dispatcher.shutdown_event cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        for (index, subscription) in self.subscriptions.iter().enumerate() {
            if subscription.event.is_empty() {
                return Err(format!("subscriptions[{index}].event cannot be empty"));
            }
            subscription.action()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};
    use tokio::fs;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.dispatcher.startup_event, "app.start");
        assert_eq!(config.dispatcher.shutdown_event, "process.shutdown");
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert_eq!(config.subscriptions.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pubsub.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.dispatcher.startup_event, "app.start");

        // The default file was written and reads back the same
        assert!(path.exists());
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.subscriptions, config.subscriptions);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[dispatcher]
startup_event = "boot"
shutdown_event = "halt"

[logging]
level = "debug"
json_format = true

[[subscriptions]]
event = "boot"
action = "stop"
priority = 10
only_once = true

[[subscriptions]]
event = "boot"
"#;

        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(&temp_file.path().to_path_buf())
            .await
            .unwrap();

        assert_eq!(config.dispatcher.startup_event, "boot");
        assert_eq!(config.dispatcher.shutdown_event, "halt");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);

        assert_eq!(config.subscriptions.len(), 2);
        assert_eq!(config.subscriptions[0].action().unwrap(), SubscriptionAction::Stop);
        assert_eq!(config.subscriptions[0].priority, 10);
        assert!(config.subscriptions[0].only_once);

        // Omitted fields fall back to their defaults
        assert_eq!(config.subscriptions[1].action, "log");
        assert_eq!(config.subscriptions[1].priority, 0);
        assert!(!config.subscriptions[1].only_once);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.dispatcher.shutdown_event, EVENT_SHUTDOWN);
        assert_eq!(config.logging.level, "info");
        assert!(config.subscriptions.is_empty());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "invalid_level".to_string();

        let result = config.validate();
        assert!(result.unwrap_err().contains("Invalid log level"));
    }

    #[test]
    fn test_validation_valid_log_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let mut config = AppConfig::default();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Level '{}' should be valid", level);
        }
    }

    #[test]
    fn test_validation_empty_event_names() {
        let mut config = AppConfig::default();
        config.subscriptions[1].event.clear();
        assert!(config.validate().unwrap_err().contains("subscriptions[1].event"));

        let mut config = AppConfig::default();
        config.dispatcher.startup_event.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_unknown_action() {
        let mut config = AppConfig::default();
        config.subscriptions[0].action = "explode".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.contains("explode"));
        assert!(err.contains("app.start"));
    }
}

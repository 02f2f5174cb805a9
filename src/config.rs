//! # Application Configuration
//!
//! Static startup configuration loaded from a TOML file. Nothing here changes
//! while the program runs.
//!
//! The file lives at `~/.topicview/config.toml` unless a path is given as the
//! first command line argument. A missing file is created with defaults so
//! the user has something to edit.

use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::mqtt::config::BrokerConfig;
use crate::relay::QueuePolicy;

const CONFIG_DIR: &str = ".topicview";
const CONFIG_FILE: &str = "config.toml";

/// Where dispatched messages end up.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// One tab per topic in a desktop window
    #[default]
    Window,
    /// One log line per message, no window
    Headless,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: f32,
    pub height: f32,
    /// Removed from the front of a topic to form its tab label
    pub strip_prefix: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "MQTT BMS Data Viewer".to_string(),
            width: 1000.0,
            height: 700.0,
            strip_prefix: "bms/data/".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    /// Topics to subscribe to and display, in tab order
    pub topics: Vec<String>,
    pub dispatch_period_ms: u64,
    pub display: DisplayMode,
    /// Bound for the relay queue. Unset keeps it unbounded.
    pub queue_capacity: Option<usize>,
    pub broker: BrokerConfig,
    pub window: WindowConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            topics: vec!["rj1".to_string()],
            dispatch_period_ms: 100,
            display: DisplayMode::default(),
            queue_capacity: None,
            broker: BrokerConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn dispatch_period(&self) -> Duration {
        Duration::from_millis(self.dispatch_period_ms)
    }

    pub fn queue_policy(&self) -> QueuePolicy {
        QueuePolicy::from_capacity(self.queue_capacity)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ViewerConfig =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.topics.is_empty() {
            return Err(eyre!("At least one topic must be configured"));
        }
        if let Some(topic) = self.topics.iter().find(|t| t.is_empty()) {
            return Err(eyre!("Invalid empty topic in topic list: {:?}", topic));
        }
        if self.dispatch_period_ms == 0 {
            return Err(eyre!("dispatch_period_ms must be greater than zero"));
        }
        if self.broker.qos().is_none() {
            return Err(eyre!("Invalid QoS {}, expected 0, 1 or 2", self.broker.qos));
        }
        if self.broker.keepalive_secs < 5 {
            // rumqttc panics on keepalive below 5 seconds
            return Err(eyre!(
                "keepalive_secs must be at least 5, got {}",
                self.broker.keepalive_secs
            ));
        }
        if self.queue_capacity == Some(0) {
            return Err(eyre!("queue_capacity must be greater than zero"));
        }
        Ok(())
    }

    /// Loads the config at `path`, writing the defaults there first if the
    /// file does not exist yet.
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            info!("No config at {}, writing defaults", path.display());
            let config = ViewerConfig::default();
            config.save(path).await?;
            return Ok(config);
        }

        debug!("Reading config from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        Self::from_toml_str(&content)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file: {}", e))?;
        Ok(())
    }
}

/// Config path from the command line, or the default location.
pub fn config_path(arg: Option<String>) -> PathBuf {
    match arg {
        Some(path) => PathBuf::from(path),
        None => {
            let mut path = get_home_dir();
            path.push(CONFIG_DIR);
            path.push(CONFIG_FILE);
            path
        }
    }
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

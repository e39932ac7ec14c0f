use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::enrich::{AnnotatorConfig, RecorderConfig};

pub const CONFIG_FILENAME: &str = "dns2enrich.toml";

/// Deployment configuration: cache endpoint, TTL, and the field-path
/// conventions both stages use. Every field has a default, so an empty
/// file is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fields: FieldConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// host:port of the shared memcached instance.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Per-round-trip deadline in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Entry lifetime in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(default = "default_resolved_ip")]
    pub resolved_ip: String,
    #[serde(default = "default_queried_name")]
    pub queried_name: String,
    #[serde(default = "default_destination_ip")]
    pub destination_ip: String,
    #[serde(default = "default_destination_dns")]
    pub destination_dns: String,
    #[serde(default = "default_enriched_tag")]
    pub enriched_tag: String,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            resolved_ip: default_resolved_ip(),
            queried_name: default_queried_name(),
            destination_ip: default_destination_ip(),
            destination_dns: default_destination_dns(),
            enriched_tag: default_enriched_tag(),
        }
    }
}

fn default_endpoint() -> String {
    "memcached:11211".to_string()
}

fn default_timeout_ms() -> u64 {
    500
}

fn default_ttl_secs() -> u64 {
    60
}

fn default_resolved_ip() -> String {
    "dns.resolved".to_string()
}

fn default_queried_name() -> String {
    "dns.query".to_string()
}

fn default_destination_ip() -> String {
    "destination.ip".to_string()
}

fn default_destination_dns() -> String {
    "destination.dns".to_string()
}

fn default_enriched_tag() -> String {
    "enriched".to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        load_config_from_path(CONFIG_FILENAME)
    }

    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(CONFIG_FILENAME, content)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.cache.timeout_ms)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Recorder-side view of the configuration.
    pub fn recorder(&self) -> RecorderConfig {
        RecorderConfig {
            resolved_ip: self.fields.resolved_ip.clone(),
            queried_name: self.fields.queried_name.clone(),
            ttl: self.ttl(),
        }
    }

    /// Annotator-side view of the configuration.
    pub fn annotator(&self) -> AnnotatorConfig {
        AnnotatorConfig {
            destination_ip: self.fields.destination_ip.clone(),
            destination_dns: self.fields.destination_dns.clone(),
            enriched_tag: self.fields.enriched_tag.clone(),
        }
    }
}

pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

pub fn try_load_config() -> Option<Config> {
    Config::load().ok()
}

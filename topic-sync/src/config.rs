//! Configuration module for environment variable parsing.

use std::env;
use tracing::warn;

use crate::sync::SyncConfig;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Shared secret Discourse signs webhook bodies with
    pub webhook_secret: Option<String>,

    /// Whether inbound Discourse webhooks are accepted at all
    pub webhook_enabled: bool,

    /// Link records that predate topic id tracking by their permalink
    pub match_old_topics: bool,

    /// Optional JSON file of records to seed the in-memory store with
    pub records_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            webhook_secret: None,
            webhook_enabled: false,
            match_old_topics: false,
            records_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            port: parse_number("PORT", defaults.port),

            webhook_secret: env::var("DISCOURSE_WEBHOOK_SECRET").ok(),

            webhook_enabled: parse_bool("USE_DISCOURSE_WEBHOOK", defaults.webhook_enabled),

            match_old_topics: parse_bool(
                "DISCOURSE_WEBHOOK_MATCH_OLD_TOPICS",
                defaults.match_old_topics,
            ),

            records_path: env::var("RECORDS_PATH").ok().filter(|p| !p.trim().is_empty()),
        }
    }

    /// The subset of settings the sync component reads per request.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            webhook_secret: self.webhook_secret.clone(),
            webhook_enabled: self.webhook_enabled,
            match_old_topics: self.match_old_topics,
        }
    }
}

/// Parse a numeric setting, warning when the value is malformed.
fn parse_number<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid number, using default");
            default
        }
    }
}

/// Parse a boolean flag, accepting `1/0`, `true/false`, `yes/no`, `on/off`.
fn parse_bool(name: &str, default: bool) -> bool {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" | "" => false,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid boolean, using default");
            default
        }
    }
}

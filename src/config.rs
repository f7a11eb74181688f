use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;

fn default_threshold() -> u32 {
    3
}

fn default_queue_capacity() -> usize {
    10
}

fn default_journal_unit() -> String {
    "ssh".to_string()
}

fn default_set_name() -> String {
    "badips".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Failed attempts from one address before it is blocked
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// Bound on addresses queued for blocking
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// systemd unit whose journal is followed
    #[serde(default = "default_journal_unit")]
    pub journal_unit: String,

    /// Name of the ipset holding blocked addresses
    #[serde(default = "default_set_name")]
    pub set_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            queue_capacity: default_queue_capacity(),
            journal_unit: default_journal_unit(),
            set_name: default_set_name(),
        }
    }
}

impl Config {
    /// Loads configuration from an explicit path, falling back to the
    /// well-known locations and finally to environment variables and
    /// defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = if let Some(path) = path {
            Self::load_from_file(path)?
        } else {
            let candidates = ["bruteguard.json", "/etc/bruteguard/config.json"];
            match candidates.iter().find(|p| Path::new(p).exists()) {
                Some(found) => Self::load_from_file(Path::new(found))?,
                None => Self::from_environment_and_defaults(),
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let mut file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn from_environment_and_defaults() -> Self {
        Config {
            threshold: std::env::var("BRUTEGUARD_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_threshold),
            queue_capacity: std::env::var("BRUTEGUARD_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_queue_capacity),
            journal_unit: std::env::var("BRUTEGUARD_JOURNAL_UNIT")
                .unwrap_or_else(|_| default_journal_unit()),
            set_name: std::env::var("BRUTEGUARD_SET_NAME")
                .unwrap_or_else(|_| default_set_name()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.threshold == 0 {
            errors.push("threshold must be at least 1".to_string());
        }

        if self.queue_capacity == 0 {
            errors.push("queue_capacity must be at least 1".to_string());
        }

        if self.journal_unit.is_empty() {
            errors.push("journal_unit cannot be empty".to_string());
        }

        if self.set_name.is_empty() {
            errors.push("set_name cannot be empty".to_string());
        } else if self.set_name.contains(char::is_whitespace) {
            errors.push(format!("invalid set_name: '{}'", self.set_name));
        }

        if self.threshold == 1 {
            warn!("threshold is 1; every failed attempt blocks immediately");
        }

        if !errors.is_empty() {
            return Err(anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                errors.join("\n")
            ));
        }

        Ok(())
    }
}

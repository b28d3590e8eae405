//! Process configuration read from the environment.

use crate::error::ConfigError;
use crate::models::Agent;
use crate::rules::{load_rules_from_file, CommissionRules};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    /// JSON file with [`CommissionRules`]; built-in defaults otherwise.
    pub rules_path: Option<PathBuf>,
    /// JSON array of agents preloaded into the in-memory store.
    pub agents_path: Option<PathBuf>,
    pub log_json: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_map(&env::vars().collect())
    }

    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: get(vars, "COMMISSION_BIND_ADDR", "127.0.0.1:3000"),
            rules_path: optional(vars, "COMMISSION_RULES_PATH").map(PathBuf::from),
            agents_path: optional(vars, "COMMISSION_AGENTS_PATH").map(PathBuf::from),
            log_json: flag(vars, "COMMISSION_LOG_JSON")?,
        })
    }

    pub fn load_rules(&self) -> Result<CommissionRules, ConfigError> {
        match &self.rules_path {
            Some(path) => load_rules_from_file(path),
            None => Ok(CommissionRules::default()),
        }
    }

    pub fn load_agents(&self) -> Result<Vec<Agent>, ConfigError> {
        match &self.agents_path {
            Some(path) => load_agents_from_file(path),
            None => Ok(Vec::new()),
        }
    }
}

pub fn load_agents_from_file(path: &Path) -> Result<Vec<Agent>, ConfigError> {
    let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn get(vars: &HashMap<String, String>, key: &str, default: &str) -> String {
    optional(vars, key).unwrap_or_else(|| default.to_string())
}

fn optional(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn flag(vars: &HashMap<String, String>, key: &str) -> Result<bool, ConfigError> {
    match optional(vars, key).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes") => Ok(true),
        Some("0" | "false" | "no") => Ok(false),
        Some(other) => Err(ConfigError::InvalidVar {
            key: key.to_string(),
            value: other.to_string(),
        }),
    }
}

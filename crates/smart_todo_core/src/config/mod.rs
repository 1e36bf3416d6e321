use crate::error::AppError;
use crate::history::HISTORY_DISPLAY_LIMIT;
use crate::model::Priority;
use crate::storage::store_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "SMART_TODO_CONFIG_PATH";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub default_priority: Option<Priority>,
    #[serde(default)]
    pub due_today_by_default: bool,
    #[serde(default)]
    pub history_limit: Option<usize>,
}

impl Config {
    pub fn priority(&self) -> Priority {
        self.default_priority.unwrap_or_default()
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit.unwrap_or(HISTORY_DISPLAY_LIMIT)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub default_priority: Option<Priority>,
    pub due_today_by_default: Option<bool>,
    pub history_limit: Option<usize>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(store_dir()?.join(CONFIG_FILE_NAME))
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

pub fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    if config.history_limit == Some(0) {
        return Err(AppError::invalid_data(format!(
            "history_limit in {} must be at least 1",
            path.display()
        )));
    }
    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(priority) = overrides.default_priority {
        merged.default_priority = Some(priority);
    }
    if let Some(due_today) = overrides.due_today_by_default {
        merged.due_today_by_default = due_today;
    }
    if let Some(limit) = overrides.history_limit {
        merged.history_limit = Some(limit);
    }
    merged
}

/// Lower-cases a key and folds any run of separators into one underscore.
pub fn canonical_key(raw: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

use clap::{Parser, Subcommand};
use smart_todo_core::config::{ConfigOverrides, canonical_key};
use smart_todo_core::error::AppError;
use smart_todo_core::model::Priority;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "smart_todo",
    author,
    version,
    about = "Track tasks, a rolling history of completed work and daily progress",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log state transitions to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: smart_todo add "Buy milk" --priority high --due 2025-03-09
    Add {
        text: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
        /// low, medium or high
        #[arg(long)]
        priority: Option<String>,
    },
    /// Mark a task as completed and move it to history
    ///
    /// Example: smart_todo done 1741435200000
    Done { id: String },
    /// Complete every active task
    DoneAll,
    /// Edit the text of an active task
    ///
    /// Example: smart_todo edit 1741435200000 "Buy oat milk"
    Edit { id: String, text: String },
    /// Delete an active task
    ///
    /// Example: smart_todo delete 1741435200000 --yes
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Move a completed task back to the active list
    Restore { id: String },
    /// Remove every entry from the completed history
    ClearHistory {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// List active tasks
    List,
    /// Show completed tasks, most recent first
    ///
    /// Example: smart_todo history week --limit 5
    History {
        /// all, today or week
        filter: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show counts and progress
    Stats,
    /// Write a JSON backup of both lists
    ///
    /// Example: smart_todo export --output backup.json
    Export {
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    DefaultPriority,
    DueTodayByDefault,
    HistoryLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let key = canonical_key(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;
    let target = match key.as_str() {
        "default_priority" | "priority" => ConfigOverrideTarget::DefaultPriority,
        "due_today_by_default" | "due_today" => ConfigOverrideTarget::DueTodayByDefault,
        "history_limit" => ConfigOverrideTarget::HistoryLimit,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride {
        target,
        value: value_raw.trim().to_string(),
    })
}

pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();

    for entry in raw {
        let parsed = parse_config_override(entry).map_err(AppError::validation)?;
        match parsed.target {
            ConfigOverrideTarget::DefaultPriority => {
                overrides.default_priority = Some(parsed.value.parse::<Priority>()?);
            }
            ConfigOverrideTarget::DueTodayByDefault => {
                overrides.due_today_by_default = Some(parse_flag(&parsed.value)?);
            }
            ConfigOverrideTarget::HistoryLimit => {
                let limit = parsed
                    .value
                    .parse::<usize>()
                    .ok()
                    .filter(|limit| *limit > 0)
                    .ok_or_else(|| AppError::validation("history_limit must be a positive number"))?;
                overrides.history_limit = Some(limit);
            }
        }
    }

    Ok(overrides)
}

fn parse_flag(raw: &str) -> Result<bool, AppError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(AppError::validation(format!("expected true or false (got '{other}')"))),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigOverrideTarget, collect_overrides, parse_config_override};
    use smart_todo_core::model::Priority;

    #[test]
    fn parse_config_override_canonicalizes_field_names() {
        let parsed = parse_config_override(" Default-Priority = High ").unwrap();

        assert_eq!(parsed.target, ConfigOverrideTarget::DefaultPriority);
        assert_eq!(parsed.value, "High");
    }

    #[test]
    fn parse_config_override_rejects_unknown_fields() {
        let err = parse_config_override("theme=noir").unwrap_err();
        assert!(err.contains("unknown config field"));
    }

    #[test]
    fn parse_config_override_rejects_missing_equals() {
        let err = parse_config_override("history_limit").unwrap_err();
        assert!(err.contains("KEY=VALUE"));
    }

    #[test]
    fn collect_overrides_parses_values() {
        let raw = vec![
            "priority=low".to_string(),
            "due-today=yes".to_string(),
            "history_limit=3".to_string(),
        ];

        let overrides = collect_overrides(&raw).unwrap();

        assert_eq!(overrides.default_priority, Some(Priority::Low));
        assert_eq!(overrides.due_today_by_default, Some(true));
        assert_eq!(overrides.history_limit, Some(3));
    }

    #[test]
    fn collect_overrides_rejects_bad_values() {
        let zero = collect_overrides(&["history_limit=0".to_string()]).unwrap_err();
        assert_eq!(zero.code(), "validation_error");

        let flag = collect_overrides(&["due_today=maybe".to_string()]).unwrap_err();
        assert_eq!(flag.code(), "validation_error");
    }
}
